use glam::{Vec2, vec2};

pub struct Camera {
    pub pos: Vec2,   // (x, y) position in world space
    pub dir: Vec2,   // unit view direction
    pub plane: Vec2, // camera plane, perpendicular to dir; its length sets the FOV
}

impl Camera {
    pub fn new(pos: Vec2, dir: Vec2, plane_len: f32) -> Self {
        let dir = dir.normalize_or(Vec2::NEG_X);
        Self {
            pos,
            dir,
            // Right-hand perpendicular, same handedness as (-1, 0) -> (0, 0.66)
            plane: vec2(-dir.y, dir.x) * -plane_len,
        }
    }

    /// Ray direction for screen column `x` of `width`, sweeping `dir - plane`
    /// on the left edge to `dir + plane` on the right.
    #[inline]
    pub fn ray_dir(&self, x: usize, width: usize) -> Vec2 {
        let camera_x = 2.0 * x as f32 / width as f32 - 1.0;
        self.dir + self.plane * camera_x
    }

    /// Rotate view and plane together by `angle` radians (counter-clockwise).
    pub fn rotate(&mut self, angle: f32) {
        let rot = Vec2::from_angle(angle);
        self.dir = rot.rotate(self.dir);
        self.plane = rot.rotate(self.plane);
    }

    /// Horizontal field of view in degrees for the current plane length.
    pub fn fov_deg(&self) -> f32 {
        (2.0 * (self.plane.length() / self.dir.length()).atan()).to_degrees()
    }

    pub fn set_fov(&mut self, fov_x_deg: f32) {
        let half = 0.5 * fov_x_deg.to_radians();
        self.plane = self.plane.normalize_or_zero() * half.tan();
    }

    /// Unit vector pointing to the camera's right, for strafing.
    #[inline]
    pub fn right(&self) -> Vec2 {
        self.plane.normalize_or_zero()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pos: vec2(2.0, 2.0),
            dir: Vec2::NEG_X,
            plane: vec2(0.0, 0.66),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_matches_default_handedness() {
        let cam = Camera::new(vec2(2.0, 2.0), Vec2::NEG_X, 0.66);
        let def = Camera::default();
        assert!((cam.plane - def.plane).length() < 1e-6);
    }

    #[test]
    fn edge_columns_span_the_plane() {
        let cam = Camera::default();
        assert!((cam.ray_dir(0, 100) - (cam.dir - cam.plane)).length() < 1e-6);
        assert!((cam.ray_dir(50, 100) - cam.dir).length() < 1e-6);
    }

    #[test]
    fn rotation_keeps_plane_perpendicular() {
        let mut cam = Camera::default();
        cam.rotate(0.7);
        assert!(cam.dir.dot(cam.plane).abs() < 1e-5);
        assert!((cam.dir.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn fov_round_trip() {
        let mut cam = Camera::default();
        cam.set_fov(90.0);
        assert!((cam.fov_deg() - 90.0).abs() < 1e-3);
        assert!((cam.plane.length() - 1.0).abs() < 1e-5);
    }
}

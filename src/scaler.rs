use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// Precomputed nearest source column/row for every destination pixel
pub struct ScaleLut {
    xs: Vec<usize>,
    ys: Vec<usize>,
    sx: f32,
    sy: f32,
}

impl ScaleLut {
    pub fn empty() -> Self {
        Self {
            xs: Vec::new(),
            ys: Vec::new(),
            sx: 1.0,
            sy: 1.0,
        }
    }

    /// Destination (window) pixel to source (framebuffer) pixel.
    #[inline]
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.sx, y * self.sy)
    }
}

pub fn build_scale_lut(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> ScaleLut {
    let sx = src_w as f32 / dst_w.max(1) as f32;
    let sy = src_h as f32 / dst_h.max(1) as f32;

    let xs = (0..dst_w)
        .map(|x| ((x as f32 * sx) as usize).min(src_w.saturating_sub(1)))
        .collect();
    let ys = (0..dst_h)
        .map(|y| ((y as f32 * sy) as usize).min(src_h.saturating_sub(1)))
        .collect();

    ScaleLut { xs, ys, sx, sy }
}

/// Parallel nearest-neighbour stretch, one destination row per task.
/// Hard pixel edges keep the internal resolution visible.
pub fn blit_nearest_stretch(dst: &mut [u32], dw: usize, src: &[u32], sw: usize, lut: &ScaleLut) {
    dst.par_chunks_mut(dw).enumerate().for_each(|(y, dst_row)| {
        let Some(&sy) = lut.ys.get(y) else {
            return;
        };
        let src_row = &src[sy * sw..(sy + 1) * sw];
        for (out, &sx) in dst_row.iter_mut().zip(&lut.xs) {
            *out = src_row[sx];
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_repeats_pixels() {
        let src = vec![1, 2, 3, 4]; // 2x2
        let lut = build_scale_lut(4, 4, 2, 2);
        let mut dst = vec![0u32; 16];
        blit_nearest_stretch(&mut dst, 4, &src, 2, &lut);
        assert_eq!(&dst[0..4], &[1, 1, 2, 2]);
        assert_eq!(&dst[12..16], &[3, 3, 4, 4]);
    }

    #[test]
    fn mouse_maps_back_to_source() {
        let lut = build_scale_lut(1280, 960, 640, 480);
        assert_eq!(lut.to_source(200.0, 100.0), (100.0, 50.0));
    }
}

use glam::Vec2;

use crate::world::Wall;

/// Cross products below this magnitude are treated as collinear.
pub const COLLINEAR_EPSILON: f32 = 0.1;
/// Ray/segment determinants below this are treated as parallel.
pub const PARALLEL_EPSILON: f32 = 1e-6;
/// Endpoint tolerance when two segments are compared for equality.
pub const MATCH_EPSILON: f32 = 1e-3;

/// Result of a ray hitting a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub t: f32, // distance along the ray, in units of the ray direction
    pub u: f32, // position along the segment, 0 at `a`, 1 at `b`
}

/// Distance from `p` to the closest point of segment `v`-`w`.
pub fn distance_to_segment(p: Vec2, v: Vec2, w: Vec2) -> f32 {
    let vw = w - v;
    let l2 = vw.length_squared();
    if l2 == 0.0 {
        return p.distance(v);
    }

    let t = ((p - v).dot(vw) / l2).clamp(0.0, 1.0);
    p.distance(v + vw * t)
}

/// Signed cross product `(b - a) x (c - a)`, positive for a left turn.
#[inline]
pub fn orientation(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Collinear-and-touching test for `p1`-`q1` against `p2`-`q2`.
///
/// Collinearity is checked against the first segment's line, then the
/// bounding boxes must intersect on both axes. For diagonal segments the box
/// test is looser than a true 1D range test; callers that need exact bounds
/// must check the resulting overlap themselves.
pub fn segments_overlap(p1: Vec2, q1: Vec2, p2: Vec2, q2: Vec2) -> bool {
    if orientation(p1, q1, p2).abs() > COLLINEAR_EPSILON {
        return false;
    }
    if orientation(p1, q1, q2).abs() > COLLINEAR_EPSILON {
        return false;
    }

    let (min1, max1) = (p1.min(q1), p1.max(q1));
    let (min2, max2) = (p2.min(q2), p2.max(q2));

    let x_overlap = !(max1.x < min2.x || min1.x > max2.x);
    let y_overlap = !(max1.y < min2.y || min1.y > max2.y);
    x_overlap && y_overlap
}

/// Intersect the ray `origin + t * dir` with segment `a`-`b`.
///
/// Only hits strictly ahead of the origin (`t > 0`) that land on the segment
/// (`0 <= u <= 1`) are reported.
pub fn intersect_ray_segment(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<RayHit> {
    let seg = b - a;
    let denom = dir.perp_dot(seg);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let d = a - origin;
    let t = d.perp_dot(seg) / denom;
    let u = d.perp_dot(dir) / denom;

    if t > 0.0 && (0.0..=1.0).contains(&u) {
        Some(RayHit { t, u })
    } else {
        None
    }
}

/// Even-odd crossing test, one polygon edge per wall.
pub fn point_in_polygon(p: Vec2, walls: &[Wall]) -> bool {
    let mut crossings = 0;
    for wall in walls {
        let (a, b) = (wall.start, wall.end);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (b.x - a.x) * (p.y - a.y) / (b.y - a.y);
            if p.x < x_cross {
                crossings += 1;
            }
        }
    }
    crossings % 2 == 1
}

/// Round each axis to the nearest multiple of `step`.
#[inline]
pub fn snap_to_grid(p: Vec2, step: f32) -> Vec2 {
    if step <= 0.0 {
        return p;
    }
    (p / step).round() * step
}

/// Order-independent segment equality within `eps` per component.
pub fn segments_match(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2, eps: f32) -> bool {
    let close = |p: Vec2, q: Vec2| (p - q).abs().max_element() < eps;
    (close(a1, b1) && close(a2, b2)) || (close(a1, b2) && close(a2, b1))
}

/// Lexicographic order on (x, y), the canonical endpoint order for overlaps.
#[inline]
pub fn lex_le(a: Vec2, b: Vec2) -> bool {
    a.x < b.x || (a.x == b.x && a.y <= b.y)
}

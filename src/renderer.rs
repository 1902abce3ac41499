use glam::Vec2;

use crate::camera::Camera;
use crate::geometry::intersect_ray_segment;
use crate::world::{SectorId, Wall, WallRef, World};

/// Portal hops per column before the ray gives up.
pub const MAX_PORTAL_DEPTH: usize = 10;
/// Eye height above the floor of the player's sector.
pub const EYE_HEIGHT: f32 = 1.0;
/// How far past a portal the next hop starts, in ray-parameter units.
pub const PORTAL_STEP: f32 = 0.01;

#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    // BGRA8 in little-endian memory
    (b as u32) | ((g as u32) << 8) | ((r as u32) << 16)
    // Alpha at 0
}

const BACKGROUND: u32 = 0;
const CEILING: u32 = 0x64_64FF; // (100, 100, 255)
const FLOOR: u32 = 0x64_FF64; // (100, 255, 100)
const SOLID_WALL: u32 = 0xFF_69B4; // (255, 105, 180)
const PORTAL_WALL: u32 = 0x00_69B4; // (0, 105, 180)

/// Why a column stopped marching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Nothing ahead of the ray.
    NoHit,
    SolidWall,
    /// The hop budget ran out while still crossing portals.
    MaxDepth,
    /// A portal named a sector that does not exist.
    BadPortal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum March {
    Marching,
    Terminated(Termination),
}

/// Screen rows for one hop of one column. All ranges are half-open and
/// inside `0..height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spans {
    pub ceiling_end: usize,
    pub wall_start: usize,
    pub wall_end: usize,
    pub floor_start: usize,
}

/// One wall hit along a column's ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hop {
    pub wall: WallRef,
    pub is_portal: bool,
    /// Sector the ray was marching through when it hit the wall.
    pub current_sector: SectorId,
    pub total_dist: f32,
    pub spans: Spans,
}

/// Ceiling/wall/floor rows for a wall at `total_dist` in a sector with the
/// given heights.
pub fn project_spans(
    total_dist: f32,
    floor_z: f32,
    ceiling_z: f32,
    eye_z: f32,
    height: usize,
) -> Spans {
    let h = height as f32;
    let mid = 0.5 * h;
    let scale = h / total_dist;
    let rows = height as i32;

    let ceiling_y = ((mid - (ceiling_z - eye_z) * scale) as i32).clamp(0, rows);
    let floor_y = ((mid + (eye_z - floor_z) * scale) as i32).clamp(0, rows - 1);

    let (mut wall_start, mut wall_end) = (ceiling_y, floor_y);
    if wall_end < wall_start {
        // Inverted after clamping: fall back to a centred band
        let line_h = scale as i32;
        wall_start = (rows / 2 - line_h / 2).max(0);
        wall_end = (wall_start + line_h).min(rows - 1);
    }

    Spans {
        ceiling_end: ceiling_y as usize,
        wall_start: wall_start as usize,
        wall_end: wall_end.max(wall_start) as usize,
        floor_start: floor_y as usize,
    }
}

/// Nearest wall ahead of the ray across the whole world. Ties keep the
/// first wall in iteration order.
fn nearest_hit(world: &World, origin: Vec2, dir: Vec2) -> Option<(WallRef, Wall, f32)> {
    let mut best: Option<(WallRef, Wall, f32)> = None;
    for (r, wall) in world.walls() {
        if let Some(hit) = intersect_ray_segment(origin, dir, wall.start, wall.end) {
            if best.is_none_or(|(_, _, t)| hit.t < t) {
                best = Some((r, *wall, hit.t));
            }
        }
    }
    best
}

/// March one ray from `origin` through the portal graph, appending a hop
/// per wall hit to `hops`.
pub fn trace_ray(
    world: &World,
    origin: Vec2,
    dir: Vec2,
    start_sector: SectorId,
    eye_z: f32,
    height: usize,
    hops: &mut Vec<Hop>,
) -> Termination {
    hops.clear();

    let mut origin = origin;
    let mut current = start_sector;
    let mut total_dist = 0.0;
    let mut state = March::Marching;

    while state == March::Marching {
        if hops.len() >= MAX_PORTAL_DEPTH {
            state = March::Terminated(Termination::MaxDepth);
            continue;
        }

        let Some((wall_ref, wall, dist)) = nearest_hit(world, origin, dir) else {
            state = March::Terminated(Termination::NoHit);
            continue;
        };

        total_dist += dist;
        let Some(sector) = world.sector(wall_ref.sector) else {
            state = March::Terminated(Termination::BadPortal);
            continue;
        };

        hops.push(Hop {
            wall: wall_ref,
            is_portal: wall.is_portal,
            current_sector: current,
            total_dist,
            spans: project_spans(total_dist, sector.floor_z, sector.ceiling_z, eye_z, height),
        });

        if !wall.is_portal {
            state = March::Terminated(Termination::SolidWall);
            continue;
        }

        origin += dir * (dist + PORTAL_STEP);
        match wall.adjoining {
            Some(next) if next < world.sectors.len() => current = next,
            _ => state = March::Terminated(Termination::BadPortal),
        }
    }

    match state {
        March::Terminated(reason) => reason,
        March::Marching => Termination::NoHit,
    }
}

/// Trace screen column `x` for the camera. `None` if the camera is outside
/// every sector.
pub fn trace_column(
    world: &World,
    camera: &Camera,
    x: usize,
    width: usize,
    height: usize,
    hops: &mut Vec<Hop>,
) -> Option<Termination> {
    let player_sector = world.sector_at(camera.pos)?;
    let eye_z = world.sectors[player_sector].floor_z + EYE_HEIGHT;
    let dir = camera.ray_dir(x, width);
    Some(trace_ray(world, camera.pos, dir, player_sector, eye_z, height, hops))
}

#[inline]
fn draw_vertical(buf: &mut [u32], width: usize, x: usize, start: usize, end: usize, color: u32) {
    let mut idx = start * width + x;
    for _y in start..end {
        buf[idx] = color;
        idx += width;
    }
}

pub fn render_frame(buf: &mut [u32], width: usize, height: usize, world: &World, camera: &Camera) {
    buf.fill(BACKGROUND);

    let mut hops = Vec::with_capacity(MAX_PORTAL_DEPTH);
    for x in 0..width {
        // Camera outside the map: nothing to draw
        if trace_column(world, camera, x, width, height, &mut hops).is_none() {
            return;
        }

        // Each hop repaints the whole column, so the farthest one wins
        for hop in &hops {
            let s = hop.spans;
            let wall_color = if hop.is_portal { PORTAL_WALL } else { SOLID_WALL };
            draw_vertical(buf, width, x, 0, s.ceiling_end, CEILING);
            draw_vertical(buf, width, x, s.wall_start, s.wall_end, wall_color);
            draw_vertical(buf, width, x, s.floor_start, height, FLOOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::link_wall;
    use crate::world::tests::rect;
    use glam::vec2;

    fn linked_rooms(count: usize) -> World {
        let mut world = World::new();
        for i in 0..count {
            let x = i as f32 * 4.0;
            world.create_sector_from_polygon(&rect(x, 0.0, x + 4.0, 4.0));
        }
        for i in 0..count - 1 {
            let right = world.sectors[i].walls[1];
            world.sectors[i].walls[1] = Wall::portal(right.start, right.end, i + 1);
            let left = world.sectors[i + 1].walls[3];
            world.sectors[i + 1].walls[3] = Wall::portal(left.start, left.end, i);
        }
        world
    }

    #[test]
    fn colors_match_packing() {
        assert_eq!(CEILING, pack_rgb(100, 100, 255));
        assert_eq!(FLOOR, pack_rgb(100, 255, 100));
        assert_eq!(SOLID_WALL, pack_rgb(255, 105, 180));
        assert_eq!(PORTAL_WALL, pack_rgb(0, 105, 180));
    }

    #[test]
    fn ray_crosses_portal_into_next_sector() {
        let world = linked_rooms(2);
        let mut hops = Vec::new();
        let end = trace_ray(&world, vec2(2.0, 2.0), Vec2::X, 0, 1.0, 100, &mut hops);

        assert_eq!(end, Termination::SolidWall);
        assert_eq!(hops.len(), 2);
        assert!(hops[0].is_portal);
        assert_eq!(hops[0].current_sector, 0);
        assert!((hops[0].total_dist - 2.0).abs() < 1e-4);
        assert_eq!(hops[1].current_sector, 1);
        assert_eq!(hops[1].wall, WallRef::new(1, 1));
        assert!(hops[1].total_dist > hops[0].total_dist);
        assert!((hops[1].total_dist - 5.99).abs() < 1e-3);
    }

    #[test]
    fn ray_follows_linker_made_portal() {
        let mut world = World::new();
        world.create_sector_from_polygon(&rect(0.0, 0.0, 4.0, 4.0));
        world.create_sector_from_polygon(&rect(4.0, 0.0, 8.0, 4.0));
        let link = link_wall(&mut world, WallRef::new(0, 1)).unwrap();

        let mut hops = Vec::new();
        let end = trace_ray(&world, vec2(2.0, 2.0), Vec2::X, 0, 1.0, 100, &mut hops);

        assert_eq!(end, Termination::SolidWall);
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0].wall, link.source);
        assert!(hops[0].is_portal);
        assert!(hops[0].total_dist > 0.0);
        assert_eq!(hops[1].current_sector, 1);
        assert!(!hops[1].is_portal);
    }

    #[test]
    fn centre_column_looks_straight_ahead() {
        let world = linked_rooms(2);
        let camera = Camera::new(vec2(2.0, 2.0), Vec2::X, 0.66);
        let mut hops = Vec::new();
        let end = trace_column(&world, &camera, 50, 100, 100, &mut hops);
        assert_eq!(end, Some(Termination::SolidWall));
        assert_eq!(hops.len(), 2);

        let outside = Camera::new(vec2(-5.0, 2.0), Vec2::X, 0.66);
        assert_eq!(trace_column(&world, &outside, 50, 100, 100, &mut hops), None);
    }

    #[test]
    fn solid_room_terminates_on_first_wall() {
        let world = linked_rooms(1);
        let mut hops = Vec::new();
        let end = trace_ray(&world, vec2(2.0, 2.0), Vec2::Y, 0, 1.0, 100, &mut hops);
        assert_eq!(end, Termination::SolidWall);
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].wall, WallRef::new(0, 2));
    }

    #[test]
    fn portal_chain_stops_at_depth_limit() {
        let world = linked_rooms(MAX_PORTAL_DEPTH + 5);
        let mut hops = Vec::new();
        let end = trace_ray(&world, vec2(2.0, 2.0), Vec2::X, 0, 1.0, 100, &mut hops);
        assert_eq!(end, Termination::MaxDepth);
        assert_eq!(hops.len(), MAX_PORTAL_DEPTH);
        assert!(hops.iter().all(|h| h.is_portal));
    }

    #[test]
    fn dangling_portal_ends_the_ray() {
        let mut world = linked_rooms(1);
        let right = world.sectors[0].walls[1];
        world.sectors[0].walls[1] = Wall::portal(right.start, right.end, 42);
        let mut hops = Vec::new();
        let end = trace_ray(&world, vec2(2.0, 2.0), Vec2::X, 0, 1.0, 100, &mut hops);
        assert_eq!(end, Termination::BadPortal);
        assert_eq!(hops.len(), 1);
    }

    #[test]
    fn ray_out_of_world_hits_nothing() {
        let world = linked_rooms(1);
        let mut hops = Vec::new();
        let end = trace_ray(&world, vec2(10.0, 2.0), Vec2::X, 0, 1.0, 100, &mut hops);
        assert_eq!(end, Termination::NoHit);
        assert!(hops.is_empty());
    }

    #[test]
    fn spans_follow_perspective() {
        // Eye at 1, floor 0, ceiling 2, distance 4: 100 / 4 = 25 rows per unit
        let s = project_spans(4.0, 0.0, 2.0, 1.0, 100);
        assert_eq!(s.ceiling_end, 25);
        assert_eq!(s.floor_start, 75);
        assert_eq!((s.wall_start, s.wall_end), (25, 75));
    }

    #[test]
    fn spans_are_clamped_up_close() {
        let s = project_spans(0.1, 0.0, 4.0, 1.0, 100);
        assert_eq!(s.ceiling_end, 0);
        assert_eq!(s.floor_start, 99);
    }

    #[test]
    fn inverted_spans_fall_back_to_centred_band() {
        // Eye far above a low sector pushes the ceiling edge below the screen
        let s = project_spans(10.0, 0.0, 1.0, 20.0, 100);
        assert!(s.wall_start <= s.wall_end);
        assert_eq!(s.wall_start, 45);
        assert_eq!(s.wall_end, 55);
    }

    #[test]
    fn frame_outside_world_stays_clear() {
        let world = linked_rooms(1);
        let camera = Camera::new(vec2(50.0, 50.0), Vec2::X, 0.66);
        let mut buf = vec![7u32; 16 * 12];
        render_frame(&mut buf, 16, 12, &world, &camera);
        assert!(buf.iter().all(|&p| p == BACKGROUND));
    }

    #[test]
    fn frame_paints_every_column() {
        let mut world = linked_rooms(2);
        // Low ceilings keep the top rows visible at this range
        for id in 0..2 {
            world.set_heights(id, 0.0, 2.0);
        }
        let camera = Camera::new(vec2(2.0, 2.0), Vec2::X, 0.66);
        let (w, h) = (32, 24);
        let mut buf = vec![BACKGROUND; w * h];
        render_frame(&mut buf, w, h, &world, &camera);
        for x in 0..w {
            assert_eq!(buf[x], CEILING);
            assert_eq!(buf[(h - 1) * w + x], FLOOR);
        }
        let centre = (h / 2) * w + w / 2;
        assert_eq!(buf[centre], SOLID_WALL);
    }
}

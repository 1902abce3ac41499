use glam::{Vec2, vec2};

use crate::geometry::distance_to_segment;
use crate::world::World;

pub const COLLISION_RADIUS: f32 = 0.1;

/// A position is blocked outside every sector, or when it sits closer than
/// `radius` to a solid wall of the sector containing it.
pub fn is_blocked(world: &World, pos: Vec2, radius: f32) -> bool {
    let Some(id) = world.sector_at(pos) else {
        return true;
    };

    world.sectors[id]
        .walls
        .iter()
        .filter(|w| !w.is_portal)
        .any(|w| distance_to_segment(pos, w.start, w.end) < radius)
}

/// Apply `delta` one axis at a time so the mover slides along walls.
pub fn slide_move(world: &World, pos: Vec2, delta: Vec2, radius: f32) -> Vec2 {
    let mut out = pos;
    if !is_blocked(world, vec2(pos.x + delta.x, out.y), radius) {
        out.x += delta.x;
    }
    if !is_blocked(world, vec2(out.x, pos.y + delta.y), radius) {
        out.y += delta.y;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Wall;
    use crate::world::tests::rect;

    fn room() -> World {
        let mut world = World::new();
        world.create_sector_from_polygon(&rect(0.0, 0.0, 4.0, 4.0));
        world
    }

    #[test]
    fn near_wall_is_blocked() {
        let world = room();
        assert!(is_blocked(&world, vec2(2.0, 0.05), COLLISION_RADIUS));
        assert!(!is_blocked(&world, vec2(2.0, 0.2), COLLISION_RADIUS));
    }

    #[test]
    fn outside_every_sector_is_blocked() {
        let world = room();
        assert!(is_blocked(&world, vec2(-1.0, 2.0), COLLISION_RADIUS));
        assert!(is_blocked(&World::new(), Vec2::ZERO, COLLISION_RADIUS));
    }

    #[test]
    fn portal_walls_do_not_block() {
        let mut world = room();
        world.create_sector_from_polygon(&rect(4.0, 0.0, 8.0, 4.0));
        let right = world.sectors[0].walls[1];
        world.sectors[0].walls[1] = Wall::portal(right.start, right.end, 1);
        let left = world.sectors[1].walls[3];
        world.sectors[1].walls[3] = Wall::portal(left.start, left.end, 0);

        assert!(!is_blocked(&world, vec2(3.95, 2.0), COLLISION_RADIUS));
        let moved = slide_move(&world, vec2(3.8, 2.0), vec2(0.4, 0.0), COLLISION_RADIUS);
        assert_eq!(world.sector_at(moved), Some(1));
    }

    #[test]
    fn blocked_axis_still_slides_on_the_other() {
        let world = room();
        let start = vec2(2.0, 3.8);
        let moved = slide_move(&world, start, vec2(0.5, 0.5), COLLISION_RADIUS);
        assert_eq!(moved.y, start.y);
        assert_eq!(moved.x, 2.5);
    }
}

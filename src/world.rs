use glam::Vec2;
use log::info;

use crate::geometry::{distance_to_segment, point_in_polygon};

/// Index of a sector in `World::sectors`. Shifts when an earlier sector is deleted.
pub type SectorId = usize;

pub const DEFAULT_FLOOR_Z: f32 = 0.0;
pub const DEFAULT_CEILING_Z: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub start: Vec2, // (x, y) start point in world space
    pub end: Vec2,   // (x, y) end point in world space
    pub is_portal: bool,
    pub adjoining: Option<SectorId>, // None if solid, or portal still waiting for a link
}

impl Wall {
    pub fn solid(start: Vec2, end: Vec2) -> Self {
        Self {
            start,
            end,
            is_portal: false,
            adjoining: None,
        }
    }

    pub fn portal(start: Vec2, end: Vec2, adjoining: SectorId) -> Self {
        Self {
            start,
            end,
            is_portal: true,
            adjoining: Some(adjoining),
        }
    }

    /// Clear portal state on this side only.
    #[inline]
    pub fn make_solid(&mut self) {
        self.is_portal = false;
        self.adjoining = None;
    }

    #[inline]
    pub fn portal_to(&self, sector: SectorId) -> bool {
        self.is_portal && self.adjoining == Some(sector)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    pub walls: Vec<Wall>,
    pub floor_z: f32,
    pub ceiling_z: f32,
}

impl Sector {
    /// Closed loop of solid walls through `points`, last point back to first.
    pub fn from_points(points: &[Vec2], floor_z: f32, ceiling_z: f32) -> Self {
        let n = points.len();
        let walls = (0..n)
            .map(|i| Wall::solid(points[i], points[(i + 1) % n]))
            .collect();
        Self {
            walls,
            floor_z,
            ceiling_z,
        }
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        point_in_polygon(p, &self.walls)
    }
}

/// Stable handle to a wall: owning sector plus slot within it.
///
/// Only valid until the next sector deletion or wall split; resolve it again
/// through `World::wall` before every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WallRef {
    pub sector: SectorId,
    pub wall: usize,
}

impl WallRef {
    pub const fn new(sector: SectorId, wall: usize) -> Self {
        Self { sector, wall }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    pub sectors: Vec<Sector>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sector(&self, id: SectorId) -> Option<&Sector> {
        self.sectors.get(id)
    }

    pub fn wall(&self, r: WallRef) -> Option<&Wall> {
        self.sectors.get(r.sector)?.walls.get(r.wall)
    }

    pub fn wall_mut(&mut self, r: WallRef) -> Option<&mut Wall> {
        self.sectors.get_mut(r.sector)?.walls.get_mut(r.wall)
    }

    pub fn wall_count(&self) -> usize {
        self.sectors.iter().map(|s| s.walls.len()).sum()
    }

    /// Every wall with its handle, sector order then slot order.
    pub fn walls(&self) -> impl Iterator<Item = (WallRef, &Wall)> {
        self.sectors.iter().enumerate().flat_map(|(si, sector)| {
            sector
                .walls
                .iter()
                .enumerate()
                .map(move |(wi, wall)| (WallRef::new(si, wi), wall))
        })
    }

    /// New sector with default heights. `None` for fewer than three points.
    pub fn create_sector_from_polygon(&mut self, points: &[Vec2]) -> Option<SectorId> {
        self.create_sector(points, DEFAULT_FLOOR_Z, DEFAULT_CEILING_Z)
    }

    pub fn create_sector(
        &mut self,
        points: &[Vec2],
        floor_z: f32,
        ceiling_z: f32,
    ) -> Option<SectorId> {
        if points.len() < 3 || ceiling_z <= floor_z {
            return None;
        }
        self.sectors
            .push(Sector::from_points(points, floor_z, ceiling_z));
        let id = self.sectors.len() - 1;
        info!("Sector {id} created, total sectors: {}", self.sectors.len());
        Some(id)
    }

    /// Remove a sector and repair every portal index that pointed at or past it.
    pub fn delete_sector(&mut self, id: SectorId) -> bool {
        if id >= self.sectors.len() {
            return false;
        }

        for wall in self.sectors.iter_mut().flat_map(|s| s.walls.iter_mut()) {
            match wall.adjoining {
                Some(adj) if adj == id => wall.make_solid(),
                Some(adj) if adj > id => wall.adjoining = Some(adj - 1),
                _ => {}
            }
        }

        self.sectors.remove(id);

        // Second pass against the shifted indices. Everything above `id` was
        // already decremented once, so only out-of-range leftovers remain.
        let len = self.sectors.len();
        for wall in self.sectors.iter_mut().flat_map(|s| s.walls.iter_mut()) {
            if let Some(adj) = wall.adjoining {
                if adj >= len {
                    wall.make_solid();
                }
            }
        }

        info!("Deleted sector {id}");
        true
    }

    /// First wall, in iteration order, closer than `hit_radius` to `p`.
    pub fn find_nearest_wall(&self, p: Vec2, hit_radius: f32) -> Option<WallRef> {
        self.walls()
            .find(|(_, w)| distance_to_segment(p, w.start, w.end) < hit_radius)
            .map(|(r, _)| r)
    }

    /// Sector owning the first wall within `hit_radius`. Points deep inside a
    /// sector but away from its walls report nothing.
    pub fn find_sector_under_point(&self, p: Vec2, hit_radius: f32) -> Option<SectorId> {
        self.find_nearest_wall(p, hit_radius).map(|r| r.sector)
    }

    /// First sector whose polygon contains `p`.
    pub fn sector_at(&self, p: Vec2) -> Option<SectorId> {
        self.sectors.iter().position(|s| s.contains(p))
    }

    pub fn set_heights(&mut self, id: SectorId, floor_z: f32, ceiling_z: f32) -> bool {
        match self.sectors.get_mut(id) {
            Some(sector) if ceiling_z > floor_z => {
                sector.floor_z = floor_z;
                sector.ceiling_z = ceiling_z;
                true
            }
            _ => false,
        }
    }

    /// Portal walls naming a sector that does not exist.
    pub fn dangling_portals(&self) -> Vec<WallRef> {
        let len = self.sectors.len();
        self.walls()
            .filter(|(_, w)| matches!(w.adjoining, Some(adj) if adj >= len))
            .map(|(r, _)| r)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use glam::vec2;

    pub(crate) fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Vec2> {
        vec![vec2(x0, y0), vec2(x1, y0), vec2(x1, y1), vec2(x0, y1)]
    }

    #[test]
    fn polygon_needs_three_points() {
        let mut world = World::new();
        assert_eq!(
            world.create_sector_from_polygon(&[vec2(0.0, 0.0), vec2(1.0, 0.0)]),
            None
        );
        assert!(world.sectors.is_empty());
    }

    #[test]
    fn polygon_walls_close_the_loop() {
        let mut world = World::new();
        let id = world
            .create_sector_from_polygon(&rect(0.0, 0.0, 4.0, 4.0))
            .unwrap();
        let walls = &world.sectors[id].walls;
        assert_eq!(walls.len(), 4);
        for i in 0..walls.len() {
            assert_eq!(walls[i].end, walls[(i + 1) % walls.len()].start);
            assert!(!walls[i].is_portal);
            assert_eq!(walls[i].adjoining, None);
        }
        assert!(world.sectors[id].ceiling_z > world.sectors[id].floor_z);
    }

    #[test]
    fn inverted_heights_are_rejected() {
        let mut world = World::new();
        assert_eq!(world.create_sector(&rect(0.0, 0.0, 1.0, 1.0), 2.0, 1.0), None);
    }

    #[test]
    fn delete_repairs_portal_indices() {
        let mut world = World::new();
        for i in 0..4 {
            let x = i as f32 * 4.0;
            world.create_sector_from_polygon(&rect(x, 0.0, x + 4.0, 4.0));
        }
        // 0 <-> 1, 1 <-> 2, 2 <-> 3 through each sector's right/left wall
        for i in 0..3 {
            world.sectors[i].walls[1] = Wall::portal(
                world.sectors[i].walls[1].start,
                world.sectors[i].walls[1].end,
                i + 1,
            );
            world.sectors[i + 1].walls[3] = Wall::portal(
                world.sectors[i + 1].walls[3].start,
                world.sectors[i + 1].walls[3].end,
                i,
            );
        }

        assert!(world.delete_sector(1));
        assert_eq!(world.sectors.len(), 3);

        for (_, wall) in world.walls() {
            if let Some(adj) = wall.adjoining {
                assert!(adj < world.sectors.len());
            }
        }
        // Old 0 lost its link to old 1
        assert!(!world.sectors[0].walls[1].is_portal);
        // Old 2 (now 1) lost its link to old 1, kept old 3 (now 2)
        assert!(!world.sectors[1].walls[3].is_portal);
        assert!(world.sectors[1].walls[1].portal_to(2));
        assert!(world.sectors[2].walls[3].portal_to(1));
        assert!(world.dangling_portals().is_empty());
    }

    #[test]
    fn delete_out_of_range_is_noop() {
        let mut world = World::new();
        world.create_sector_from_polygon(&rect(0.0, 0.0, 1.0, 1.0));
        assert!(!world.delete_sector(1));
        assert_eq!(world.sectors.len(), 1);
    }

    #[test]
    fn nearest_wall_is_first_match_not_closest() {
        let mut world = World::new();
        world.create_sector_from_polygon(&rect(0.0, 0.0, 4.0, 4.0));
        // Bottom wall is slot 0, right wall slot 1. Point near the corner is
        // within radius of both, closer to the right wall.
        let p = vec2(3.9, 0.3);
        let hit = world.find_nearest_wall(p, 0.5).unwrap();
        assert_eq!(hit, WallRef::new(0, 0));
    }

    #[test]
    fn hover_needs_a_nearby_wall() {
        let mut world = World::new();
        world.create_sector_from_polygon(&rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(world.find_sector_under_point(vec2(5.0, 5.0), 0.5), None);
        assert_eq!(world.find_sector_under_point(vec2(5.0, 0.2), 0.5), Some(0));
        assert_eq!(world.sector_at(vec2(5.0, 5.0)), Some(0));
        assert_eq!(world.sector_at(vec2(15.0, 5.0)), None);
    }
}

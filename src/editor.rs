//! Sector drawing workflow: place vertices on a grid, close the polygon,
//! link portals, toggle and delete.

use std::path::{Path, PathBuf};

use glam::Vec2;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::geometry::snap_to_grid;
use crate::map_file::{MapError, MapUnits, save_map};
use crate::portal::{Toggle, link_exact_matches, link_new_sector, toggle_portal};
use crate::world::{DEFAULT_CEILING_Z, DEFAULT_FLOOR_Z, SectorId, World};

/// How a freshly closed sector finds its neighbours.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkMode {
    /// Split overlapping walls, one pairing per wall.
    #[default]
    Overlap,
    /// Only identical grid-snapped edges; the new duplicate wall is dropped.
    Exact,
}

impl std::str::FromStr for LinkMode {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overlap" => Ok(Self::Overlap),
            "exact" => Ok(Self::Exact),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Invalid link mode",
            )),
        }
    }
}

/// Distances are in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorSettings {
    pub grid_step: f32,
    /// Cursor distance for picking walls.
    pub hit_radius: f32,
    /// Grid-snapped clicks this close to an existing vertex reuse it.
    pub snap_radius: f32,
    /// Clicking this close to the first vertex closes the polygon.
    pub close_radius: f32,
    pub floor_z: f32,
    pub ceiling_z: f32,
    pub link_mode: LinkMode,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            grid_step: 0.5,
            hit_radius: 0.2,
            snap_radius: 0.3,
            close_radius: 0.3,
            floor_z: DEFAULT_FLOOR_Z,
            ceiling_z: DEFAULT_CEILING_Z,
            link_mode: LinkMode::Overlap,
        }
    }
}

/// What a left click did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Click {
    Vertex(Vec2),
    Closed(SectorId),
    /// Closing was attempted but the polygon was rejected.
    Rejected,
}

pub struct Editor {
    pub settings: EditorSettings,
    /// Polygon under construction, already snapped.
    pub vertices: Vec<Vec2>,
    pub filename: PathBuf,
    pub units: MapUnits,
}

impl Editor {
    pub fn new(settings: EditorSettings, filename: PathBuf, units: MapUnits) -> Self {
        Self {
            settings,
            vertices: Vec::new(),
            filename,
            units,
        }
    }

    /// Grid snap, then prefer an existing vertex within `snap_radius`.
    pub fn snap(&self, world: &World, p: Vec2) -> Vec2 {
        let snapped = snap_to_grid(p, self.settings.grid_step);
        world
            .walls()
            .flat_map(|(_, w)| [w.start, w.end])
            .find(|v| v.distance(snapped) < self.settings.snap_radius)
            .unwrap_or(snapped)
    }

    fn near_first_vertex(&self, p: Vec2) -> bool {
        self.vertices
            .first()
            .is_some_and(|v| v.distance(p) < self.settings.close_radius)
    }

    pub fn left_click(&mut self, world: &mut World, p: Vec2) -> Click {
        if self.vertices.len() >= 3 && self.near_first_vertex(p) {
            return match self.finish(world) {
                Some(id) => Click::Closed(id),
                None => Click::Rejected,
            };
        }

        let v = self.snap(world, p);
        if self.vertices.last() != Some(&v) {
            self.vertices.push(v);
        }
        Click::Vertex(v)
    }

    /// Commit the pending polygon as a sector and link it to its neighbours.
    ///
    /// Fewer than three vertices leaves the draft untouched.
    pub fn finish(&mut self, world: &mut World) -> Option<SectorId> {
        if self.vertices.len() < 3 {
            return None;
        }

        let id = world.create_sector(&self.vertices, self.settings.floor_z, self.settings.ceiling_z);
        self.vertices.clear();
        let Some(id) = id else {
            warn!("Sector rejected, check the configured floor/ceiling heights");
            return None;
        };

        let linked = match self.settings.link_mode {
            LinkMode::Overlap => link_new_sector(world, id),
            LinkMode::Exact => link_exact_matches(world, id, self.settings.grid_step),
        };
        info!("Sector {id} closed with {linked} portal links");
        Some(id)
    }

    pub fn undo_vertex(&mut self) -> Option<Vec2> {
        self.vertices.pop()
    }

    pub fn toggle_portal_at(&self, world: &mut World, p: Vec2) -> Option<Toggle> {
        let r = world.find_nearest_wall(p, self.settings.hit_radius)?;
        toggle_portal(world, r)
    }

    pub fn hovered_sector(&self, world: &World, p: Vec2) -> Option<SectorId> {
        world.find_sector_under_point(p, self.settings.hit_radius)
    }

    pub fn delete_at(&self, world: &mut World, p: Vec2) -> Option<SectorId> {
        let id = self.hovered_sector(world, p)?;
        world.delete_sector(id).then_some(id)
    }

    /// Raise or lower the hovered sector's ceiling, never below its floor.
    pub fn adjust_ceiling_at(&self, world: &mut World, p: Vec2, delta: f32) -> bool {
        let Some(id) = self.hovered_sector(world, p) else {
            return false;
        };
        let sector = &world.sectors[id];
        let (floor, ceiling) = (sector.floor_z, sector.ceiling_z + delta);
        let changed = world.set_heights(id, floor, ceiling);
        if changed {
            info!("Sector {id} ceiling now {ceiling}");
        }
        changed
    }

    pub fn set_filename(&mut self, path: &Path) {
        self.filename = path.to_path_buf();
    }

    pub fn save(&self, world: &World) -> Result<(), MapError> {
        save_map(&self.filename, world, self.units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_file::load_map;
    use glam::vec2;

    fn editor() -> Editor {
        Editor::new(
            EditorSettings::default(),
            PathBuf::from("map.txt"),
            MapUnits::Grid(0.5),
        )
    }

    fn draw(editor: &mut Editor, world: &mut World, points: &[Vec2]) -> Click {
        for &p in points {
            editor.left_click(world, p);
        }
        editor.left_click(world, points[0])
    }

    #[test]
    fn clicks_snap_to_grid() {
        let mut world = World::new();
        let mut ed = editor();
        assert_eq!(ed.left_click(&mut world, vec2(1.2, 0.8)), Click::Vertex(vec2(1.0, 1.0)));
    }

    #[test]
    fn clicking_first_vertex_closes_polygon() {
        let mut world = World::new();
        let mut ed = editor();
        let click = draw(
            &mut ed,
            &mut world,
            &[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(0.0, 4.0)],
        );
        assert_eq!(click, Click::Closed(0));
        assert!(ed.vertices.is_empty());
        assert_eq!(world.sectors[0].walls.len(), 4);
    }

    #[test]
    fn two_vertices_do_not_close() {
        let mut world = World::new();
        let mut ed = editor();
        ed.left_click(&mut world, vec2(0.0, 0.0));
        ed.left_click(&mut world, vec2(2.0, 0.0));
        assert_eq!(ed.finish(&mut world), None);
        assert_eq!(ed.vertices.len(), 2);
        // Near the first vertex but too few points: just another vertex
        assert!(matches!(ed.left_click(&mut world, vec2(0.1, 0.0)), Click::Vertex(_)));
    }

    #[test]
    fn closing_next_to_a_room_links_it() {
        let mut world = World::new();
        let mut ed = editor();
        draw(
            &mut ed,
            &mut world,
            &[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(0.0, 4.0)],
        );
        draw(
            &mut ed,
            &mut world,
            &[vec2(4.0, 0.0), vec2(8.0, 0.0), vec2(8.0, 4.0), vec2(4.0, 4.0)],
        );
        let portals: Vec<_> = world.walls().filter(|(_, w)| w.is_portal).collect();
        assert_eq!(portals.len(), 2);
        assert_eq!(world.sectors[0].walls.len(), 4);
        assert_eq!(world.sectors[1].walls.len(), 4);
    }

    #[test]
    fn exact_mode_drops_shared_wall() {
        let mut world = World::new();
        let mut ed = editor();
        ed.settings.link_mode = LinkMode::Exact;
        draw(
            &mut ed,
            &mut world,
            &[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(0.0, 4.0)],
        );
        draw(
            &mut ed,
            &mut world,
            &[vec2(4.0, 0.0), vec2(8.0, 0.0), vec2(8.0, 4.0), vec2(4.0, 4.0)],
        );
        assert_eq!(world.sectors[1].walls.len(), 3);
        assert!(world.sectors[0].walls[1].portal_to(1));
    }

    #[test]
    fn snaps_to_existing_vertex() {
        let mut world = World::new();
        world.create_sector_from_polygon(&[vec2(0.0, 0.0), vec2(3.25, 0.0), vec2(0.0, 3.0)]);
        let ed = editor();
        // Grid snap gives (3.5, 0) which is within reach of (3.25, 0)
        assert_eq!(ed.snap(&world, vec2(3.4, 0.1)), vec2(3.25, 0.0));
    }

    #[test]
    fn right_click_toggles_and_delete_repairs() {
        let mut world = World::new();
        let mut ed = editor();
        world.create_sector_from_polygon(&[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(0.0, 4.0)]);
        world.create_sector_from_polygon(&[vec2(4.0, 0.0), vec2(8.0, 0.0), vec2(8.0, 4.0), vec2(4.0, 4.0)]);

        assert!(matches!(
            ed.toggle_portal_at(&mut world, vec2(4.05, 2.0)),
            Some(Toggle::Linked(_))
        ));
        assert_eq!(ed.toggle_portal_at(&mut world, vec2(2.0, 2.0)), None);

        assert_eq!(ed.delete_at(&mut world, vec2(8.1, 2.0)), Some(1));
        assert!(world.walls().all(|(_, w)| !w.is_portal));
        ed.undo_vertex();
    }

    #[test]
    fn ceiling_adjusts_but_stays_above_floor() {
        let mut world = World::new();
        let ed = editor();
        world.create_sector(&[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(0.0, 4.0)], 0.0, 1.0);
        assert!(ed.adjust_ceiling_at(&mut world, vec2(2.0, 0.1), 0.5));
        assert_eq!(world.sectors[0].ceiling_z, 1.5);
        assert!(!ed.adjust_ceiling_at(&mut world, vec2(2.0, 0.1), -2.0));
        assert_eq!(world.sectors[0].ceiling_z, 1.5);
    }

    #[test]
    fn save_writes_to_current_filename() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = World::new();
        let mut ed = editor();
        draw(
            &mut ed,
            &mut world,
            &[vec2(0.0, 0.0), vec2(2.0, 0.0), vec2(2.0, 2.0)],
        );
        ed.set_filename(&dir.path().join("level.txt"));
        ed.save(&world).unwrap();
        let (loaded, units) = load_map(&ed.filename).unwrap();
        assert_eq!(units, MapUnits::Grid(0.5));
        assert_eq!(loaded, world);
    }
}

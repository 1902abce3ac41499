use glam::Vec2;
use log::{info, warn};

use crate::geometry::{
    MATCH_EPSILON, distance_to_segment, lex_le, segments_match, segments_overlap, snap_to_grid,
};
use crate::world::{SectorId, Wall, WallRef, World};

/// The two middle pieces created by a successful link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalLink {
    pub source: WallRef,
    pub target: WallRef,
}

/// Outcome of toggling a wall from the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Linked(PortalLink),
    /// Flagged as portal but no overlapping wall was found.
    Pending,
    Unlinked,
}

#[inline]
fn close(a: Vec2, b: Vec2) -> bool {
    a.distance(b) < MATCH_EPSILON
}

#[inline]
fn canonical(a: Vec2, b: Vec2) -> (Vec2, Vec2) {
    if lex_le(a, b) { (a, b) } else { (b, a) }
}

/// Shared stretch of two overlapping walls, canonical order.
///
/// `b`'s endpoints are projected onto `a` and the parameter ranges
/// intersected. Rejected when the result collapses to a point or falls off
/// `b`, which the bounding-box overlap test lets through for end-to-end
/// neighbours and some diagonals.
fn overlap_bounds(a: &Wall, b: &Wall) -> Option<(Vec2, Vec2)> {
    let dir = a.end - a.start;
    let len_sq = dir.length_squared();
    if len_sq < MATCH_EPSILON * MATCH_EPSILON {
        return None;
    }

    let t = |p: Vec2| (p - a.start).dot(dir) / len_sq;
    let (tb1, tb2) = (t(b.start), t(b.end));
    let lo = tb1.min(tb2).max(0.0);
    let hi = tb1.max(tb2).min(1.0);
    if hi <= lo {
        return None;
    }

    let (start, end) = canonical(a.start + dir * lo, a.start + dir * hi);
    if close(start, end) {
        return None;
    }
    let on_b = |p: Vec2| distance_to_segment(p, b.start, b.end) < MATCH_EPSILON;
    if !(on_b(start) && on_b(end)) {
        return None;
    }
    Some((start, end))
}

/// Up to three pieces replacing `wall`: solid lead-in, portal middle, solid
/// tail. Pieces keep the wall's direction so the sector loop stays closed.
/// Returns the pieces and the slot offset of the portal piece.
fn split_pieces(wall: &Wall, lo: Vec2, hi: Vec2, target: SectorId) -> (Vec<Wall>, usize) {
    let (first, second) = if wall.start.distance_squared(lo) <= wall.start.distance_squared(hi) {
        (lo, hi)
    } else {
        (hi, lo)
    };

    let mut pieces = Vec::with_capacity(3);
    if !close(wall.start, first) {
        pieces.push(Wall::solid(wall.start, first));
    }
    let middle = pieces.len();
    pieces.push(Wall::portal(first, second, target));
    if !close(second, wall.end) {
        pieces.push(Wall::solid(second, wall.end));
    }
    (pieces, middle)
}

fn replace_wall(world: &mut World, r: WallRef, pieces: Vec<Wall>) {
    if let Some(sector) = world.sectors.get_mut(r.sector) {
        sector.walls.splice(r.wall..r.wall + 1, pieces);
    }
}

/// Link `source` to the first overlapping solid wall of another sector.
///
/// Both walls are split at the overlap and the middle pieces become a portal
/// pair. Only one pairing is made per call: a wall that overlaps several
/// sectors needs one call per overlap.
pub fn link_wall(world: &mut World, source: WallRef) -> Option<PortalLink> {
    let src = *world.wall(source)?;

    let (other_ref, lo, hi) = world.walls().find_map(|(r, other)| {
        if r.sector == source.sector || other.is_portal {
            return None;
        }
        if !segments_overlap(src.start, src.end, other.start, other.end) {
            return None;
        }
        overlap_bounds(&src, other).map(|(lo, hi)| (r, lo, hi))
    })?;
    let other = *world.wall(other_ref)?;

    let (src_pieces, src_mid) = split_pieces(&src, lo, hi, other_ref.sector);
    let (other_pieces, other_mid) = split_pieces(&other, lo, hi, source.sector);

    replace_wall(world, source, src_pieces);
    replace_wall(world, other_ref, other_pieces);

    info!(
        "Auto-linked portal between sector {} and {}",
        source.sector, other_ref.sector
    );
    Some(PortalLink {
        source: WallRef::new(source.sector, source.wall + src_mid),
        target: WallRef::new(other_ref.sector, other_ref.wall + other_mid),
    })
}

/// Turn a portal wall and its counterpart back into solid walls.
///
/// Split pieces are left as they are. Returns false if `r` is not a portal.
pub fn unlink_wall(world: &mut World, r: WallRef) -> bool {
    let wall = match world.wall(r) {
        Some(w) if w.is_portal => *w,
        _ => return false,
    };

    if let Some(linked) = wall.adjoining.and_then(|id| world.sectors.get_mut(id)) {
        let coincides = |w: &Wall| {
            w.portal_to(r.sector)
                && segments_match(w.start, w.end, wall.start, wall.end, MATCH_EPSILON)
        };
        let exact = linked.walls.iter().any(coincides);

        for w in linked.walls.iter_mut() {
            // Without a coinciding counterpart every back link goes
            if w.portal_to(r.sector) && (!exact || coincides(&*w)) {
                w.make_solid();
            }
        }
    }

    if let Some(w) = world.wall_mut(r) {
        w.make_solid();
    }
    info!("Portal unset on both sides");
    true
}

/// Editor toggle: solid walls try to link, portal walls unlink.
pub fn toggle_portal(world: &mut World, r: WallRef) -> Option<Toggle> {
    let wall = world.wall_mut(r)?;
    if wall.is_portal {
        unlink_wall(world, r);
        return Some(Toggle::Unlinked);
    }

    wall.is_portal = true;
    match link_wall(world, r) {
        Some(link) => Some(Toggle::Linked(link)),
        None => {
            warn!(
                "No overlapping wall for sector {} wall {}, portal link pending",
                r.sector, r.wall
            );
            Some(Toggle::Pending)
        }
    }
}

/// Try to link every wall of a freshly closed sector. Returns the number of
/// portal pairs made.
pub fn link_new_sector(world: &mut World, id: SectorId) -> usize {
    let slots = world.sector(id).map_or(0, |s| s.walls.len());

    // Highest slot first: a split only shifts the slots after it
    let mut linked = 0;
    for slot in (0..slots).rev() {
        if link_wall(world, WallRef::new(id, slot)).is_some() {
            linked += 1;
        }
    }
    linked
}

/// Batch linking for exactly shared edges, compared after snapping to `grid_step`.
///
/// A matching wall in an existing sector becomes a portal into `id`, and the
/// duplicate wall is dropped from the new sector instead of being split.
pub fn link_exact_matches(world: &mut World, id: SectorId, grid_step: f32) -> usize {
    let Some(new_sector) = world.sector(id) else {
        return 0;
    };

    let mut matches: Vec<(usize, WallRef)> = Vec::new();
    for (slot, new_wall) in new_sector.walls.iter().enumerate() {
        let n1 = snap_to_grid(new_wall.start, grid_step);
        let n2 = snap_to_grid(new_wall.end, grid_step);
        for (r, existing) in world.walls() {
            if r.sector == id {
                continue;
            }
            let e1 = snap_to_grid(existing.start, grid_step);
            let e2 = snap_to_grid(existing.end, grid_step);
            if segments_match(n1, n2, e1, e2, MATCH_EPSILON) {
                matches.push((slot, r));
            }
        }
    }

    for &(_, r) in &matches {
        if let Some(w) = world.wall_mut(r) {
            w.is_portal = true;
            w.adjoining = Some(id);
        }
    }

    let mut remove: Vec<usize> = matches.iter().map(|&(slot, _)| slot).collect();
    remove.sort_unstable_by(|a, b| b.cmp(a));
    remove.dedup();
    if let Some(sector) = world.sectors.get_mut(id) {
        for slot in remove {
            sector.walls.remove(slot);
        }
    }

    for &(_, r) in &matches {
        info!("Linked exact edge between sector {} and {}", id, r.sector);
    }
    matches.len()
}

//! Spatial grid partitioning for radius queries.
//!
//! This module provides O(1) cell lookup and O(K) neighbor queries where K is the average
//! actors per cell, replacing a scan of the whole registry for every AoE, melee swing
//! and auto-fire target search.
//!
//! ## Cell Size Choice
//!
//! Cell size (`GRID_CELL_SIZE` in `constants.rs`) must be chosen relative to the
//! query radius.  With `GRID_CELL_SIZE = 2.0`:
//!   - a splash of radius 1.0 checks a 3×3 = 9 cell area
//!   - the auto-fire search (radius 10.0) checks an 11×11 area, still cheaper than a
//!     full scan once a wave holds more than a few dozen enemies.

use crate::actor::{ActorId, ActorRegistry, Faction};
use crate::combat::CollisionQuery;
use crate::constants::GRID_CELL_SIZE;
use bevy::math::Vec2;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct GridEntry {
    id: ActorId,
    position: Vec2,
    faction: Faction,
}

/// Uniform grid over actor positions, rebuilt once per frame.
///
/// Cell size is controlled by [`crate::constants::GRID_CELL_SIZE`].
#[derive(Debug, Clone, Default)]
pub struct SpatialGrid {
    /// Map from cell coordinates to actor list
    cells: HashMap<(i32, i32), Vec<GridEntry>>,
}

impl SpatialGrid {
    /// Compute grid cell coordinates for a world position
    fn world_to_cell(pos: Vec2) -> (i32, i32) {
        let x = (pos.x / GRID_CELL_SIZE).floor() as i32;
        let y = (pos.y / GRID_CELL_SIZE).floor() as i32;
        (x, y)
    }

    /// Insert an actor at a position. Call after clear() for bulk rebuild.
    pub fn insert(&mut self, id: ActorId, position: Vec2, faction: Faction) {
        let cell = Self::world_to_cell(position);
        self.cells.entry(cell).or_default().push(GridEntry {
            id,
            position,
            faction,
        });
    }

    /// Clear all grid data (call before each frame rebuild)
    pub fn clear(&mut self) {
        // Retain allocations but clear contents to avoid re-allocating Vec capacity
        for v in self.cells.values_mut() {
            v.clear();
        }
        self.cells.retain(|_, v| !v.is_empty());
    }

    /// Re-index every active actor of `registry`.
    pub fn rebuild(&mut self, registry: &ActorRegistry) {
        self.clear();
        for (id, actor) in registry.iter() {
            if actor.is_active() {
                self.insert(id, actor.position, actor.faction());
            }
        }
    }

    pub fn from_registry(registry: &ActorRegistry) -> Self {
        let mut grid = Self::default();
        grid.rebuild(registry);
        grid
    }

    /// Visit every entry within `radius` of `center` (exact distance check).
    fn for_each_within(&self, center: Vec2, radius: f32, mut visit: impl FnMut(&GridEntry)) {
        let cell = Self::world_to_cell(center);
        let reach = Self::radius_in_cells(radius);
        let radius_sq = radius * radius;

        for dx in -reach..=reach {
            for dy in -reach..=reach {
                if let Some(entries) = self.cells.get(&(cell.0 + dx, cell.1 + dy)) {
                    for entry in entries {
                        if entry.position.distance_squared(center) <= radius_sq {
                            visit(entry);
                        }
                    }
                }
            }
        }
    }

    /// Closest actor of `faction` within `radius` of `center`.
    pub fn nearest(&self, faction: Faction, center: Vec2, radius: f32) -> Option<(ActorId, Vec2)> {
        let mut best: Option<(ActorId, Vec2, f32)> = None;
        self.for_each_within(center, radius, |e| {
            if e.faction != faction {
                return;
            }
            let d = e.position.distance_squared(center);
            let closer = match best {
                None => true,
                // Ties break on id so results do not depend on HashMap order.
                Some((best_id, _, best_d)) => d < best_d || (d == best_d && e.id < best_id),
            };
            if closer {
                best = Some((e.id, e.position, d));
            }
        });
        best.map(|(id, pos, _)| (id, pos))
    }

    /// Compute how many cells in each direction we need to check for a given max distance
    fn radius_in_cells(max_distance: f32) -> i32 {
        ((max_distance / GRID_CELL_SIZE).ceil() as i32).max(1)
    }
}

impl CollisionQuery for SpatialGrid {
    fn actors_within(&self, center: Vec2, radius: f32) -> Vec<ActorId> {
        let mut found = Vec::new();
        self.for_each_within(center, radius, |e| found.push(e.id));
        found.sort();
        found
    }

    fn faction_within(&self, faction: Faction, center: Vec2, radius: f32) -> bool {
        let mut any = false;
        self.for_each_within(center, radius, |e| any |= e.faction == faction);
        any
    }
}

//! Spawn-point selection.
//!
//! Authored points win when present: one is picked at random and jittered.
//! Otherwise a random side of the view is chosen and the point is projected
//! just outside it.  Either way the candidate is retried while another enemy
//! stands inside the separation radius; after the last attempt the final
//! candidate is accepted as is.

use crate::actor::Faction;
use crate::combat::CollisionQuery;
use crate::config::GameConfig;
use crate::difficulty::EnemyKind;
use bevy::math::{Rect, Vec2};
use rand::Rng;

/// Where enemies may appear.
pub trait SpawnPointProvider {
    /// Level-authored spawn points; empty for camera-edge placement.
    fn authored_points(&self) -> &[Vec2];

    /// Visible world rectangle.
    fn view_bounds(&self) -> Rect;
}

/// Fixed authored points plus a view rectangle that follows the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticSpawnPoints {
    pub points: Vec<Vec2>,
    pub half_extents: Vec2,
    pub view_center: Vec2,
}

impl StaticSpawnPoints {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            points: config.authored_spawn_points(),
            half_extents: Vec2::new(config.view_half_width, config.view_half_height),
            view_center: Vec2::ZERO,
        }
    }
}

impl SpawnPointProvider for StaticSpawnPoints {
    fn authored_points(&self) -> &[Vec2] {
        &self.points
    }

    fn view_bounds(&self) -> Rect {
        Rect::from_center_half_size(self.view_center, self.half_extents)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPlacer {
    pub attempts: u32,
    pub separation_radius: f32,
    pub edge_margin: f32,
    pub jitter: f32,
}

impl SpawnPlacer {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            attempts: config.spawn_attempts.max(1),
            separation_radius: config.spawn_separation_radius,
            edge_margin: config.spawn_edge_margin,
            jitter: config.spawn_jitter,
        }
    }

    fn jittered<R: Rng + ?Sized>(&self, point: Vec2, rng: &mut R) -> Vec2 {
        if self.jitter <= 0.0 {
            return point;
        }
        point
            + Vec2::new(
                rng.gen_range(-self.jitter..=self.jitter),
                rng.gen_range(-self.jitter..=self.jitter),
            )
    }

    fn edge_candidate<R: Rng + ?Sized>(&self, view: Rect, rng: &mut R) -> Vec2 {
        let m = self.edge_margin;
        let x = rng.gen_range(view.min.x..=view.max.x);
        let y = rng.gen_range(view.min.y..=view.max.y);
        let point = match rng.gen_range(0..4) {
            0 => Vec2::new(x, view.max.y + m),
            1 => Vec2::new(x, view.min.y - m),
            2 => Vec2::new(view.min.x - m, y),
            _ => Vec2::new(view.max.x + m, y),
        };
        self.jittered(point, rng)
    }

    /// Pick a spawn position clear of existing enemies when possible.
    pub fn place<R: Rng + ?Sized>(
        &self,
        provider: &dyn SpawnPointProvider,
        occupied: &dyn CollisionQuery,
        rng: &mut R,
    ) -> Vec2 {
        let authored = provider.authored_points();
        let view = provider.view_bounds();
        let mut candidate = view.center();

        for _ in 0..self.attempts.max(1) {
            candidate = if authored.is_empty() {
                self.edge_candidate(view, rng)
            } else {
                let base = authored[rng.gen_range(0..authored.len())];
                self.jittered(base, rng)
            };
            if !occupied.faction_within(Faction::Enemy, candidate, self.separation_radius) {
                return candidate;
            }
        }
        candidate
    }
}

/// Independent biased coin flip per spawn slot.
pub fn roll_enemy_kind<R: Rng + ?Sized>(ranged_chance: f64, rng: &mut R) -> EnemyKind {
    if rng.gen_bool(ranged_chance.clamp(0.0, 1.0)) {
        EnemyKind::Ranged
    } else {
        EnemyKind::Melee
    }
}

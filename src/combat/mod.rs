//! Combat resolution: damage, hit-sets, i-frames, knockback, bleed and
//! one-shot death detection.
//!
//! ## Sub-module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`hit_window`] | Time-gated acceptance for player i-frames and enemy contact debounce |
//! | [`knockback`] | `MotionState` velocity override with a fixed duration |
//! | [`bleed`] | Melee damage-over-time |
//! | [`projectile`] | `Fire` trait, `Projectile`, `MeleeSwing`, hit-sets, projectile store |
//! | [`resolver`] | `CombatResolver`: per-frame hit queue, guards, death notices |

pub mod bleed;
pub mod hit_window;
pub mod knockback;
pub mod projectile;
pub mod resolver;

pub use projectile::{Fire, MeleeSwing, Projectile, ProjectileId, ProjectileStore};
pub use resolver::{CombatResolver, DeathNotice, HitEvent, HitOutcome};

use crate::actor::{ActorId, Faction};
use bevy::math::Vec2;

/// Overlap queries answered by the physics side.
pub trait CollisionQuery {
    /// Every actor whose position lies within `radius` of `center`.
    fn actors_within(&self, center: Vec2, radius: f32) -> Vec<ActorId>;

    /// Whether any actor of `faction` lies within `radius` of `center`.
    fn faction_within(&self, faction: Faction, center: Vec2, radius: f32) -> bool;
}

//! Centralised combat and pacing constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! [`crate::config::GameConfig::default`] mirrors every value below, and
//! `assets/combat.toml` can override any subset at startup.

// ── Player ────────────────────────────────────────────────────────────────────

/// Player hearts at the start of a session.
pub const PLAYER_MAX_HP: i32 = 10;

/// Base player movement speed (world units / second).
pub const PLAYER_MOVE_SPEED: f32 = 5.0;

/// Invulnerability window granted to the player after an accepted contact hit.
///
/// Every further contact hit inside the window is rejected outright.
pub const PLAYER_INVINCIBLE_DURATION: f32 = 0.6;

/// Collider radius of the player body.
pub const PLAYER_COLLIDER_RADIUS: f32 = 0.45;

// ── Player weapon ─────────────────────────────────────────────────────────────

/// Damage dealt by one player projectile before upgrades.
pub const WEAPON_BASE_DAMAGE: i32 = 1;

/// Projectiles per volley before upgrades.
pub const WEAPON_BASE_PROJECTILE_COUNT: u32 = 1;

/// Extra enemies a projectile may pass through before it is spent.
///
/// `0` means the projectile is spent after its first distinct hit.
pub const WEAPON_BASE_PIERCE: u32 = 0;

/// Seconds between two auto-fire volleys.
pub const WEAPON_BASE_FIRE_INTERVAL: f32 = 1.0;

/// Angular spread between neighbouring projectiles of one volley (degrees).
pub const WEAPON_SPREAD_DEGREES: f32 = 10.0;

/// Player projectile flight speed (world units / second).
pub const PROJECTILE_SPEED: f32 = 12.0;

/// Seconds a projectile stays alive when it never reaches its pierce budget.
pub const PROJECTILE_LIFETIME: f32 = 3.0;

/// Collider radius of every projectile.
pub const PROJECTILE_COLLIDER_RADIUS: f32 = 0.15;

/// Auto-fire only targets enemies inside this radius.
pub const AUTO_FIRE_DETECT_RADIUS: f32 = 10.0;

// ── Melee build ───────────────────────────────────────────────────────────────

/// Damage of one melee swing before upgrades.
pub const MELEE_BASE_DAMAGE: i32 = 1;

/// Reach of a melee swing measured from the player centre.
pub const MELEE_REACH: f32 = 1.2;

/// Seconds between two automatic melee swings.
pub const MELEE_SWING_INTERVAL: f32 = 0.5;

/// Knockback speed applied by a melee hit at multiplier 1.0.
pub const MELEE_KNOCKBACK_SPEED: f32 = 6.0;

/// Total bleed damage applied by one melee hit once bleed is unlocked.
pub const BLEED_TOTAL_DAMAGE: i32 = 2;

/// Seconds between two bleed ticks.
pub const BLEED_TICK_INTERVAL: f32 = 1.0;

// ── Knockback ─────────────────────────────────────────────────────────────────

/// Duration of the knockback velocity override.
pub const KNOCKBACK_DURATION: f32 = 0.1;

// ── Enemies ───────────────────────────────────────────────────────────────────

/// Per-enemy debounce between two contact attacks on the player.
pub const ENEMY_CONTACT_COOLDOWN: f32 = 0.6;

/// Chance that a spawn slot becomes a ranged enemy instead of a melee one.
pub const RANGED_ENEMY_CHANCE: f64 = 0.5;

/// Seconds between two ranged-enemy shots.
pub const RANGED_FIRE_COOLDOWN: f32 = 1.5;

/// Ranged enemies stop approaching and start shooting inside this range.
pub const RANGED_FIRE_RANGE: f32 = 6.0;

/// Ranged-enemy projectile flight speed.
pub const RANGED_PROJECTILE_SPEED: f32 = 10.0;

/// Collider radius of every enemy body.
pub const ENEMY_COLLIDER_RADIUS: f32 = 0.4;

/// Strong enemies multiply the tier's base max HP by this factor.
pub const STRONG_HP_MULTIPLIER: i32 = 3;

/// Strong enemies multiply the tier's base score value by this factor.
pub const STRONG_SCORE_MULTIPLIER: i32 = 3;

/// Strong enemies move at this fraction of the tier's base speed.
pub const STRONG_SPEED_FACTOR: f32 = 0.8;

/// Flat contact-damage bonus for strong enemies.
pub const STRONG_CONTACT_BONUS: i32 = 1;

// ── Per-wave stat growth ──────────────────────────────────────────────────────

/// Max HP added to freshly spawned enemies per wave beyond the first.
pub const WAVE_HP_BONUS: i32 = 2;

/// Move speed added to freshly spawned enemies per wave beyond the first.
pub const WAVE_SPEED_BONUS: f32 = 0.2;

/// Contact damage added per wave beyond the first (accumulated, then floored).
pub const WAVE_CONTACT_BONUS: f32 = 0.5;

// ── Wave pacing ───────────────────────────────────────────────────────────────

/// Delay between the main batch and the strong sub-batch of a wave.
pub const STRONG_BATCH_DELAY: f32 = 1.5;

/// Delay before the next wave when no upgrade gate is available.
pub const AUTO_CONTINUE_DELAY: f32 = 2.0;

/// Every Nth wave opens a grand upgrade gate.
pub const GRAND_UPGRADE_EVERY: u32 = 5;

/// Offers shown per upgrade gate.
pub const UPGRADE_OFFER_COUNT: usize = 3;

/// Endless mode: seconds between two continuous spawn batches.
pub const ENDLESS_SPAWN_INTERVAL: f32 = 6.0;

/// Endless mode: kills required to open the first upgrade gate.
pub const ENDLESS_KILLS_PER_UPGRADE: u32 = 15;

/// Endless mode: kills added to the requirement after each gate.
pub const ENDLESS_KILLS_PER_UPGRADE_GROWTH: u32 = 5;

/// Endless mode: continuous spawn batches per escalation step.
pub const ENDLESS_BATCHES_PER_STEP: u32 = 3;

// ── Spawn placement ───────────────────────────────────────────────────────────

/// Candidate positions tried before a spawn accepts an overlapping position.
pub const SPAWN_ATTEMPTS: u32 = 10;

/// No other enemy may stand inside this radius of a fresh spawn position.
pub const SPAWN_SEPARATION_RADIUS: f32 = 0.8;

/// Distance outside the camera view at which edge spawns are placed.
pub const SPAWN_EDGE_MARGIN: f32 = 1.0;

/// Maximum random offset applied to authored and edge spawn positions.
pub const SPAWN_JITTER: f32 = 0.75;

/// Half extents of the default camera view used for edge spawns.
pub const VIEW_HALF_WIDTH: f32 = 12.0;
pub const VIEW_HALF_HEIGHT: f32 = 7.0;

// ── Spatial grid ──────────────────────────────────────────────────────────────

/// Cell size of the actor spatial grid.
///
/// Should be at least the largest AoE radius so a query checks a 3×3 area.
pub const GRID_CELL_SIZE: f32 = 2.0;

// ── Achievements ──────────────────────────────────────────────────────────────

/// Kill totals that unlock an achievement, ascending.
pub const KILL_THRESHOLDS: [u32; 6] = [5, 25, 50, 100, 150, 200];

// ── Presentation ──────────────────────────────────────────────────────────────

/// Pixels per world unit for transforms, colliders and gizmos.
pub const WORLD_SCALE: f32 = 40.0;

/// Seconds the melee swing arc stays visible.
pub const SWING_FLASH_SECS: f32 = 0.12;

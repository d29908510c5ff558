//! Runtime combat configuration loaded from `assets/combat.toml`.
//!
//! [`GameConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_game_config`] reads
//! `assets/combat.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the values you care about.
//!
//! ## Difficulty tables
//!
//! Per-tier pacing and base enemy stats live under `[tiers.easy]`,
//! `[tiers.medium]`, `[tiers.hard]` and `[tiers.endless]`.  A tier table that is
//! present replaces that tier as a whole; keys missing inside it fall back to
//! [`TierSettings::default`], not to the tier's own defaults.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `GameConfig::default()`.

use crate::constants::*;
use crate::error::{validate_non_negative, validate_positive, CoreError, CoreResult};
use bevy::prelude::*;
use serde::Deserialize;

/// Pacing and base stats for one difficulty tier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TierSettings {
    /// Waves to clear for victory; `0` means unbounded (endless).
    pub max_waves: u32,
    pub initial_per_batch: u32,
    pub increment_per_wave: u32,
    pub strong_start_count: u32,
    pub strong_increment_per_wave: u32,
    pub base_hp: i32,
    pub base_move_speed: f32,
    pub base_contact_damage: i32,
    pub base_score_value: i32,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            max_waves: 8,
            initial_per_batch: 6,
            increment_per_wave: 3,
            strong_start_count: 1,
            strong_increment_per_wave: 1,
            base_hp: 4,
            base_move_speed: 2.3,
            base_contact_damage: 1,
            base_score_value: 15,
        }
    }
}

/// One [`TierSettings`] per difficulty tier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TierTable {
    pub easy: TierSettings,
    pub medium: TierSettings,
    pub hard: TierSettings,
    pub endless: TierSettings,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            easy: TierSettings {
                max_waves: 5,
                initial_per_batch: 4,
                increment_per_wave: 2,
                strong_start_count: 0,
                strong_increment_per_wave: 1,
                base_hp: 3,
                base_move_speed: 2.0,
                base_contact_damage: 1,
                base_score_value: 10,
            },
            medium: TierSettings::default(),
            hard: TierSettings {
                max_waves: 10,
                initial_per_batch: 8,
                increment_per_wave: 4,
                strong_start_count: 2,
                strong_increment_per_wave: 1,
                base_hp: 5,
                base_move_speed: 2.6,
                base_contact_damage: 2,
                base_score_value: 20,
            },
            endless: TierSettings {
                max_waves: 0,
                initial_per_batch: 5,
                increment_per_wave: 2,
                strong_start_count: 1,
                strong_increment_per_wave: 1,
                base_hp: 4,
                base_move_speed: 2.3,
                base_contact_damage: 1,
                base_score_value: 15,
            },
        }
    }
}

/// Runtime-tunable combat, pacing and spawn configuration.
///
/// All fields default to the corresponding compile-time constant from
/// `src/constants.rs`.  Override any subset by setting the value in
/// `assets/combat.toml`.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // ── Player ────────────────────────────────────────────────────────────────
    pub player_max_hp: i32,
    pub player_move_speed: f32,
    pub player_invincible_duration: f32,
    pub player_collider_radius: f32,

    // ── Player weapon ─────────────────────────────────────────────────────────
    pub weapon_base_damage: i32,
    pub weapon_base_projectile_count: u32,
    pub weapon_base_pierce: u32,
    pub weapon_base_fire_interval: f32,
    pub weapon_spread_degrees: f32,
    pub projectile_speed: f32,
    pub projectile_lifetime: f32,
    pub projectile_collider_radius: f32,
    pub auto_fire_detect_radius: f32,

    // ── Melee build ───────────────────────────────────────────────────────────
    pub melee_base_damage: i32,
    pub melee_reach: f32,
    pub melee_swing_interval: f32,
    pub melee_knockback_speed: f32,
    pub bleed_total_damage: i32,
    pub bleed_tick_interval: f32,
    pub knockback_duration: f32,

    // ── Enemies ───────────────────────────────────────────────────────────────
    pub enemy_contact_cooldown: f32,
    pub ranged_enemy_chance: f64,
    pub ranged_fire_cooldown: f32,
    pub ranged_fire_range: f32,
    pub ranged_projectile_speed: f32,
    pub enemy_collider_radius: f32,

    // ── Per-wave growth ───────────────────────────────────────────────────────
    pub wave_hp_bonus: i32,
    pub wave_speed_bonus: f32,
    pub wave_contact_bonus: f32,

    // ── Wave pacing ───────────────────────────────────────────────────────────
    pub strong_batch_delay: f32,
    pub auto_continue_delay: f32,
    pub grand_upgrade_every: u32,
    pub upgrade_offer_count: usize,
    pub endless_spawn_interval: f32,
    pub endless_kills_per_upgrade: u32,
    pub endless_kills_per_upgrade_growth: u32,
    pub endless_batches_per_step: u32,

    // ── Spawn placement ───────────────────────────────────────────────────────
    pub spawn_attempts: u32,
    pub spawn_separation_radius: f32,
    pub spawn_edge_margin: f32,
    pub spawn_jitter: f32,
    pub view_half_width: f32,
    pub view_half_height: f32,
    /// Authored spawn points; empty means camera-edge placement.
    pub spawn_points: Vec<[f32; 2]>,

    // ── Difficulty tables ─────────────────────────────────────────────────────
    pub tiers: TierTable,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            // Player
            player_max_hp: PLAYER_MAX_HP,
            player_move_speed: PLAYER_MOVE_SPEED,
            player_invincible_duration: PLAYER_INVINCIBLE_DURATION,
            player_collider_radius: PLAYER_COLLIDER_RADIUS,
            // Player weapon
            weapon_base_damage: WEAPON_BASE_DAMAGE,
            weapon_base_projectile_count: WEAPON_BASE_PROJECTILE_COUNT,
            weapon_base_pierce: WEAPON_BASE_PIERCE,
            weapon_base_fire_interval: WEAPON_BASE_FIRE_INTERVAL,
            weapon_spread_degrees: WEAPON_SPREAD_DEGREES,
            projectile_speed: PROJECTILE_SPEED,
            projectile_lifetime: PROJECTILE_LIFETIME,
            projectile_collider_radius: PROJECTILE_COLLIDER_RADIUS,
            auto_fire_detect_radius: AUTO_FIRE_DETECT_RADIUS,
            // Melee build
            melee_base_damage: MELEE_BASE_DAMAGE,
            melee_reach: MELEE_REACH,
            melee_swing_interval: MELEE_SWING_INTERVAL,
            melee_knockback_speed: MELEE_KNOCKBACK_SPEED,
            bleed_total_damage: BLEED_TOTAL_DAMAGE,
            bleed_tick_interval: BLEED_TICK_INTERVAL,
            knockback_duration: KNOCKBACK_DURATION,
            // Enemies
            enemy_contact_cooldown: ENEMY_CONTACT_COOLDOWN,
            ranged_enemy_chance: RANGED_ENEMY_CHANCE,
            ranged_fire_cooldown: RANGED_FIRE_COOLDOWN,
            ranged_fire_range: RANGED_FIRE_RANGE,
            ranged_projectile_speed: RANGED_PROJECTILE_SPEED,
            enemy_collider_radius: ENEMY_COLLIDER_RADIUS,
            // Per-wave growth
            wave_hp_bonus: WAVE_HP_BONUS,
            wave_speed_bonus: WAVE_SPEED_BONUS,
            wave_contact_bonus: WAVE_CONTACT_BONUS,
            // Wave pacing
            strong_batch_delay: STRONG_BATCH_DELAY,
            auto_continue_delay: AUTO_CONTINUE_DELAY,
            grand_upgrade_every: GRAND_UPGRADE_EVERY,
            upgrade_offer_count: UPGRADE_OFFER_COUNT,
            endless_spawn_interval: ENDLESS_SPAWN_INTERVAL,
            endless_kills_per_upgrade: ENDLESS_KILLS_PER_UPGRADE,
            endless_kills_per_upgrade_growth: ENDLESS_KILLS_PER_UPGRADE_GROWTH,
            endless_batches_per_step: ENDLESS_BATCHES_PER_STEP,
            // Spawn placement
            spawn_attempts: SPAWN_ATTEMPTS,
            spawn_separation_radius: SPAWN_SEPARATION_RADIUS,
            spawn_edge_margin: SPAWN_EDGE_MARGIN,
            spawn_jitter: SPAWN_JITTER,
            view_half_width: VIEW_HALF_WIDTH,
            view_half_height: VIEW_HALF_HEIGHT,
            spawn_points: Vec::new(),
            // Difficulty tables
            tiers: TierTable::default(),
        }
    }
}

impl GameConfig {
    /// Parse a TOML document on top of the compiled defaults and validate it.
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        let config: GameConfig = toml::from_str(contents).map_err(|e| CoreError::ConfigParse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or divide by zero at runtime.
    pub fn validate(&self) -> CoreResult<()> {
        validate_positive("player_max_hp", self.player_max_hp as f32)?;
        validate_non_negative("player_invincible_duration", self.player_invincible_duration)?;
        validate_positive("weapon_base_fire_interval", self.weapon_base_fire_interval)?;
        validate_positive("projectile_lifetime", self.projectile_lifetime)?;
        validate_positive("melee_swing_interval", self.melee_swing_interval)?;
        validate_non_negative("knockback_duration", self.knockback_duration)?;
        validate_positive("bleed_tick_interval", self.bleed_tick_interval)?;
        validate_positive("endless_spawn_interval", self.endless_spawn_interval)?;
        validate_positive("view_half_width", self.view_half_width)?;
        validate_positive("view_half_height", self.view_half_height)?;
        if !(0.0..=1.0).contains(&self.ranged_enemy_chance) {
            return Err(CoreError::UnsafeConstant {
                name: "ranged_enemy_chance",
                value: self.ranged_enemy_chance as f32,
                safe_range: "[0.0, 1.0]",
            });
        }
        for tier in [
            &self.tiers.easy,
            &self.tiers.medium,
            &self.tiers.hard,
            &self.tiers.endless,
        ] {
            validate_positive("tier base_hp", tier.base_hp as f32)?;
        }
        Ok(())
    }

    /// Authored spawn points as world positions.
    pub fn authored_spawn_points(&self) -> Vec<Vec2> {
        self.spawn_points
            .iter()
            .map(|[x, y]| Vec2::new(*x, *y))
            .collect()
    }
}

/// Startup system: attempt to load `assets/combat.toml` and overwrite the
/// `GameConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults.  Parse or validation errors are
/// printed to stderr but do not abort the game.  A missing file keeps the
/// defaults already in place from `insert_resource`.
pub fn load_game_config(mut config: ResMut<GameConfig>) {
    let path = "assets/combat.toml";
    match std::fs::read_to_string(path) {
        Ok(contents) => match GameConfig::from_toml_str(&contents) {
            Ok(loaded) => {
                *config = loaded;
                println!("✓ Loaded combat config from {path}");
            }
            Err(e) => {
                eprintln!("⚠ Failed to load {path}: {e}; using defaults");
            }
        },
        Err(_) => {
            println!("ℹ No {path} found; using compiled defaults");
        }
    }
}

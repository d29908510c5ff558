//! Difficulty tiers, pacing formulas and per-wave enemy scaling.
//!
//! A [`DifficultyProfile`] is built once per combat session from the selected
//! tier and the loaded [`GameConfig`].  It answers two questions for the
//! scheduler: how many enemies a wave spawns ([`WavePlan`]) and which stats a
//! freshly spawned enemy receives ([`DifficultyProfile::scaled_stats`]).

use crate::config::{GameConfig, TierSettings};
use crate::constants::{
    STRONG_CONTACT_BONUS, STRONG_HP_MULTIPLIER, STRONG_SCORE_MULTIPLIER, STRONG_SPEED_FACTOR,
};
use crate::error::{CoreError, CoreResult};
use crate::stats::StatBlock;

// ── Selections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
    Endless,
}

impl DifficultyTier {
    /// Decode the `SelectedDifficulty` flag (`0..=3`).
    pub fn from_index(value: i32) -> CoreResult<Self> {
        match value {
            0 => Ok(Self::Easy),
            1 => Ok(Self::Medium),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Endless),
            _ => Err(CoreError::UnknownDifficulty { value }),
        }
    }

    pub fn index(self) -> i32 {
        match self {
            Self::Easy => 0,
            Self::Medium => 1,
            Self::Hard => 2,
            Self::Endless => 3,
        }
    }

    pub fn mode(self) -> CombatMode {
        match self {
            Self::Endless => CombatMode::Endless,
            _ => CombatMode::Wave,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Endless => "Endless",
        }
    }
}

/// How a session progresses: discrete waves with a victory, or continuous
/// spawning until the player dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatMode {
    Wave,
    Endless,
}

/// The player's build, read from the `SelectedCombat` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatStyle {
    Melee,
    Ranged,
}

impl CombatStyle {
    /// Decode `SelectedCombat`.  `-1` means nothing was chosen yet.
    pub fn from_flag(value: i32) -> CoreResult<Option<Self>> {
        match value {
            -1 => Ok(None),
            0 => Ok(Some(Self::Melee)),
            1 => Ok(Some(Self::Ranged)),
            _ => Err(CoreError::UnknownCombatType { value }),
        }
    }

    pub fn flag_value(self) -> i32 {
        match self {
            Self::Melee => 0,
            Self::Ranged => 1,
        }
    }
}

/// Behaviour family of a spawned enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyKind {
    Melee,
    Ranged,
}

// ── Profile ───────────────────────────────────────────────────────────────────

/// Spawn counts for one wave (or one Endless escalation step).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavePlan {
    pub wave: u32,
    pub main_count: u32,
    pub strong_count: u32,
}

impl WavePlan {
    #[inline]
    pub fn total(&self) -> u32 {
        self.main_count + self.strong_count
    }
}

/// Per-wave stat growth applied on top of the tier's base stats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveGrowth {
    pub hp_bonus: i32,
    pub speed_bonus: f32,
    pub contact_bonus: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyProfile {
    pub tier: DifficultyTier,
    pub settings: TierSettings,
    pub growth: WaveGrowth,
}

impl DifficultyProfile {
    pub fn from_config(tier: DifficultyTier, config: &GameConfig) -> Self {
        let settings = match tier {
            DifficultyTier::Easy => config.tiers.easy.clone(),
            DifficultyTier::Medium => config.tiers.medium.clone(),
            DifficultyTier::Hard => config.tiers.hard.clone(),
            DifficultyTier::Endless => config.tiers.endless.clone(),
        };
        Self {
            tier,
            settings,
            growth: WaveGrowth {
                hp_bonus: config.wave_hp_bonus,
                speed_bonus: config.wave_speed_bonus,
                contact_bonus: config.wave_contact_bonus,
            },
        }
    }

    #[inline]
    pub fn mode(&self) -> CombatMode {
        self.tier.mode()
    }

    /// Waves to clear for victory, `None` in Endless.
    pub fn max_waves(&self) -> Option<u32> {
        match self.mode() {
            CombatMode::Endless => None,
            CombatMode::Wave => Some(self.settings.max_waves.max(1)),
        }
    }

    /// `initial + (wave - 1) * increment` for the main batch.
    pub fn per_batch(&self, wave: u32) -> u32 {
        let steps = wave.max(1) - 1;
        self.settings.initial_per_batch + steps * self.settings.increment_per_wave
    }

    /// `start + (wave - 1) * increment` for the strong sub-batch.
    pub fn strong_count(&self, wave: u32) -> u32 {
        let steps = wave.max(1) - 1;
        self.settings.strong_start_count + steps * self.settings.strong_increment_per_wave
    }

    pub fn plan(&self, wave: u32) -> WavePlan {
        WavePlan {
            wave: wave.max(1),
            main_count: self.per_batch(wave),
            strong_count: self.strong_count(wave),
        }
    }

    /// Stats for an enemy spawned during `wave`.
    ///
    /// The contact bonus accumulates as a float and is floored once.
    pub fn scaled_stats(&self, wave: u32, strong: bool) -> StatBlock {
        let steps = (wave.max(1) - 1) as i32;
        let s = &self.settings;

        let mut max_hp = s.base_hp + steps * self.growth.hp_bonus;
        let mut speed = s.base_move_speed + steps as f32 * self.growth.speed_bonus;
        let mut contact =
            (s.base_contact_damage as f32 + steps as f32 * self.growth.contact_bonus).floor() as i32;
        let mut score = s.base_score_value;

        if strong {
            max_hp *= STRONG_HP_MULTIPLIER;
            speed *= STRONG_SPEED_FACTOR;
            contact += STRONG_CONTACT_BONUS;
            score *= STRONG_SCORE_MULTIPLIER;
        }

        StatBlock::new(max_hp, speed, contact, score)
    }
}

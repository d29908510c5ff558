//! Kill-count achievements and the rewards they unlock.
//!
//! The lifetime kill total lives in the flag store under `TotalKills`.  Each
//! threshold crossing sets `Achievement_{T}Kills` exactly once.  Every
//! achievement owns one claimable [`Reward`]; claimed rewards are applied to
//! the loadout when a combat session starts.

use crate::flags::{achievement_key, FlagStore, TOTAL_KILLS};
use crate::upgrade::{PlayerLoadout, UpgradeEffect};
use crate::stats::StatBlock;
use bevy::log::{info, warn};

// ── Ledger ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AchievementLedger {
    total_kills: u32,
    /// Ascending kill thresholds.
    thresholds: Vec<u32>,
}

impl AchievementLedger {
    /// Resume from the persisted kill total.
    pub fn load(store: &dyn FlagStore, thresholds: &[u32]) -> Self {
        let mut thresholds = thresholds.to_vec();
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            total_kills: store.get_int(TOTAL_KILLS, 0).max(0) as u32,
            thresholds,
        }
    }

    pub fn total_kills(&self) -> u32 {
        self.total_kills
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    /// Count one kill and return the thresholds it newly unlocked.
    pub fn record_kill(&mut self, store: &mut dyn FlagStore) -> Vec<u32> {
        self.total_kills = self.total_kills.saturating_add(1);
        store.set_int(TOTAL_KILLS, self.total_kills.min(i32::MAX as u32) as i32);
        self.check(store)
    }

    /// Flag every reached threshold that is not flagged yet.
    ///
    /// Already-flagged thresholds are skipped, so a re-check returns nothing.
    pub fn check(&self, store: &mut dyn FlagStore) -> Vec<u32> {
        let mut unlocked = Vec::new();
        for &threshold in &self.thresholds {
            if self.total_kills < threshold {
                break;
            }
            let key = achievement_key(threshold);
            if !store.is_set(&key) {
                store.set_int(&key, 1);
                info!("Achievement unlocked: {} kills", threshold);
                unlocked.push(threshold);
            }
        }
        if !unlocked.is_empty() {
            if let Err(e) = store.flush() {
                warn!("Failed to persist achievements: {}", e);
            }
        }
        unlocked
    }

    pub fn is_unlocked(store: &dyn FlagStore, threshold: u32) -> bool {
        store.is_set(&achievement_key(threshold))
    }
}

// ── Rewards ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reward {
    ExtraProjectile,
    PlusPower,
    KnockPierce,
    MoveSpeed,
    PowerUpV2,
    MoveSpeedV2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed,
    /// The owning achievement is not unlocked yet.
    Locked,
}

impl Reward {
    pub const ALL: [Reward; 6] = [
        Reward::ExtraProjectile,
        Reward::PlusPower,
        Reward::KnockPierce,
        Reward::MoveSpeed,
        Reward::PowerUpV2,
        Reward::MoveSpeedV2,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Reward::ExtraProjectile => "Reward_ExtraProjectile",
            Reward::PlusPower => "Reward_PlusPower",
            Reward::KnockPierce => "Reward_KnockPierce",
            Reward::MoveSpeed => "Reward_MoveSpeed",
            Reward::PowerUpV2 => "Reward_PowerUpv2",
            Reward::MoveSpeedV2 => "Reward_MoveSpeedv2",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Reward::ExtraProjectile => "Extra Projectile",
            Reward::PlusPower => "Plus Power",
            Reward::KnockPierce => "Knockback + Pierce",
            Reward::MoveSpeed => "Move Speed",
            Reward::PowerUpV2 => "Power Up II",
            Reward::MoveSpeedV2 => "Move Speed II",
        }
    }

    /// Kill threshold of the achievement that owns this reward.
    pub fn threshold(self) -> u32 {
        match self {
            Reward::ExtraProjectile => 5,
            Reward::PlusPower => 25,
            Reward::KnockPierce => 50,
            Reward::MoveSpeed => 100,
            Reward::PowerUpV2 => 150,
            Reward::MoveSpeedV2 => 200,
        }
    }

    pub fn effects(self) -> &'static [UpgradeEffect] {
        match self {
            Reward::ExtraProjectile => &[UpgradeEffect::Projectiles(1)],
            Reward::PlusPower | Reward::PowerUpV2 => &[UpgradeEffect::Power(1)],
            Reward::KnockPierce => &[UpgradeEffect::Knockback(0.20), UpgradeEffect::Pierce(1)],
            Reward::MoveSpeed | Reward::MoveSpeedV2 => &[UpgradeEffect::MoveSpeed(1.15)],
        }
    }

    pub fn is_claimed(self, store: &dyn FlagStore) -> bool {
        store.is_set(self.key())
    }

    /// Claim once the owning achievement is unlocked.  Claiming twice is a no-op.
    pub fn claim(self, store: &mut dyn FlagStore) -> ClaimOutcome {
        if !AchievementLedger::is_unlocked(store, self.threshold()) {
            return ClaimOutcome::Locked;
        }
        if self.is_claimed(store) {
            return ClaimOutcome::AlreadyClaimed;
        }
        store.set_int(self.key(), 1);
        if let Err(e) = store.flush() {
            warn!("Failed to persist reward claim {}: {}", self.key(), e);
        }
        ClaimOutcome::Claimed
    }
}

/// Apply every claimed reward to a fresh loadout.  Returns what was applied.
pub fn apply_claimed_rewards(
    store: &dyn FlagStore,
    loadout: &mut PlayerLoadout,
    stats: &mut StatBlock,
) -> Vec<Reward> {
    let mut applied = Vec::new();
    for reward in Reward::ALL {
        if !reward.is_claimed(store) {
            continue;
        }
        for effect in reward.effects() {
            effect.apply(loadout, stats);
        }
        info!("Reward applied: {}", reward.key());
        applied.push(reward);
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::constants::KILL_THRESHOLDS;
    use crate::difficulty::CombatStyle;
    use crate::flags::MemoryFlagStore;

    #[test]
    fn fifth_kill_unlocks_once() {
        let mut store = MemoryFlagStore::new();
        store.set_int(TOTAL_KILLS, 4);
        let mut ledger = AchievementLedger::load(&store, &KILL_THRESHOLDS);

        assert_eq!(ledger.record_kill(&mut store), vec![5]);
        assert!(ledger.check(&mut store).is_empty());
        assert_eq!(store.get_int(TOTAL_KILLS, 0), 5);
        assert!(store.is_set("Achievement_5Kills"));
    }

    #[test]
    fn kill_total_is_monotonic_across_sessions() {
        let mut store = MemoryFlagStore::new();
        let mut ledger = AchievementLedger::load(&store, &KILL_THRESHOLDS);
        for _ in 0..24 {
            ledger.record_kill(&mut store);
        }
        let mut resumed = AchievementLedger::load(&store, &KILL_THRESHOLDS);
        assert_eq!(resumed.total_kills(), 24);
        assert_eq!(resumed.record_kill(&mut store), vec![25]);
    }

    #[test]
    fn check_catches_up_on_skipped_thresholds() {
        let mut store = MemoryFlagStore::new();
        store.set_int(TOTAL_KILLS, 60);
        let ledger = AchievementLedger::load(&store, &KILL_THRESHOLDS);
        assert_eq!(ledger.check(&mut store), vec![5, 25, 50]);
        assert!(store.flush_count() >= 1);
    }

    #[test]
    fn reward_needs_achievement_and_claims_once() {
        let mut store = MemoryFlagStore::new();
        assert_eq!(Reward::PlusPower.claim(&mut store), ClaimOutcome::Locked);
        store.set_int(&achievement_key(25), 1);
        assert_eq!(Reward::PlusPower.claim(&mut store), ClaimOutcome::Claimed);
        assert_eq!(Reward::PlusPower.claim(&mut store), ClaimOutcome::AlreadyClaimed);
    }

    #[test]
    fn reward_thresholds_match_achievements() {
        let thresholds: Vec<u32> = Reward::ALL.iter().map(|r| r.threshold()).collect();
        assert_eq!(thresholds, KILL_THRESHOLDS.to_vec());
    }

    #[test]
    fn claimed_rewards_apply_to_loadout() {
        let mut store = MemoryFlagStore::new();
        store.set_int(Reward::KnockPierce.key(), 1);
        store.set_int(Reward::ExtraProjectile.key(), 1);
        let config = GameConfig::default();
        let mut loadout = PlayerLoadout::from_config(CombatStyle::Ranged, &config);
        let mut stats = StatBlock::new(10, 5.0, 0, 0);

        let applied = apply_claimed_rewards(&store, &mut loadout, &mut stats);
        assert_eq!(applied, vec![Reward::ExtraProjectile, Reward::KnockPierce]);
        assert_eq!(loadout.weapon.pierce, config.weapon_base_pierce + 1);
        assert_eq!(
            loadout.weapon.projectile_count,
            config.weapon_base_projectile_count + 1
        );
        assert!((loadout.melee.knockback_multiplier - 1.2).abs() < 1e-6);
    }
}

//! Upgrade offers, their effects and the player loadout they mutate.

use crate::config::GameConfig;
use crate::difficulty::CombatStyle;
use crate::stats::StatBlock;

// ── Loadout ───────────────────────────────────────────────────────────────────

/// Ranged build parameters read by auto-fire.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponParams {
    pub damage: i32,
    pub projectile_count: u32,
    pub pierce: u32,
    /// Seconds between volleys.
    pub fire_interval: f32,
    pub aoe_radius: f32,
    pub spread_degrees: f32,
    pub projectile_speed: f32,
    pub projectile_lifetime: f32,
}

impl WeaponParams {
    /// Volleys per second; `0` for a non-positive interval.
    #[inline]
    pub fn fire_rate(&self) -> f32 {
        if self.fire_interval <= 0.0 {
            0.0
        } else {
            1.0 / self.fire_interval
        }
    }

    /// Faster fire: the interval is divided by `multiplier`.
    pub fn add_fire_rate_multiplier(&mut self, multiplier: f32) {
        if multiplier > 0.0 {
            self.fire_interval /= multiplier;
        }
    }

    /// Never drops below one projectile per volley.
    pub fn add_projectiles(&mut self, delta: i32) {
        self.projectile_count = (self.projectile_count as i32 + delta).max(1) as u32;
    }
}

/// Melee build parameters read by the auto-swing.
#[derive(Debug, Clone, PartialEq)]
pub struct MeleeParams {
    pub damage: i32,
    pub reach: f32,
    pub swing_interval: f32,
    pub aoe_radius: f32,
    pub knockback_speed: f32,
    pub knockback_multiplier: f32,
    pub bleed: bool,
}

impl MeleeParams {
    #[inline]
    pub fn knockback(&self) -> f32 {
        self.knockback_speed * self.knockback_multiplier
    }
}

/// Live player parameters that upgrades and rewards mutate.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerLoadout {
    pub style: CombatStyle,
    pub weapon: WeaponParams,
    pub melee: MeleeParams,
}

impl PlayerLoadout {
    pub fn from_config(style: CombatStyle, config: &GameConfig) -> Self {
        Self {
            style,
            weapon: WeaponParams {
                damage: config.weapon_base_damage,
                projectile_count: config.weapon_base_projectile_count.max(1),
                pierce: config.weapon_base_pierce,
                fire_interval: config.weapon_base_fire_interval,
                aoe_radius: 0.0,
                spread_degrees: config.weapon_spread_degrees,
                projectile_speed: config.projectile_speed,
                projectile_lifetime: config.projectile_lifetime,
            },
            melee: MeleeParams {
                damage: config.melee_base_damage,
                reach: config.melee_reach,
                swing_interval: config.melee_swing_interval,
                aoe_radius: 0.0,
                knockback_speed: config.melee_knockback_speed,
                knockback_multiplier: 1.0,
                bleed: false,
            },
        }
    }
}

// ── Effects ───────────────────────────────────────────────────────────────────

/// What an upgrade or reward does when applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpgradeEffect {
    /// Ranged and melee damage.
    Power(i32),
    MeleeDamage(i32),
    MoveSpeed(f32),
    Heal(i32),
    FullHeal,
    /// Full heal after raising max hp.
    FullHealMaxHp(i32),
    Projectiles(i32),
    Pierce(u32),
    AttackSpeed(f32),
    HitRadius(f32),
    /// Additive knockback multiplier bonus.
    Knockback(f32),
    Bleed,
}

impl UpgradeEffect {
    pub fn apply(self, loadout: &mut PlayerLoadout, stats: &mut StatBlock) {
        match self {
            UpgradeEffect::Power(n) => {
                loadout.weapon.damage += n;
                loadout.melee.damage += n;
            }
            UpgradeEffect::MeleeDamage(n) => loadout.melee.damage += n,
            UpgradeEffect::MoveSpeed(m) => stats.move_speed *= m,
            UpgradeEffect::Heal(n) => {
                stats.heal(n);
            }
            UpgradeEffect::FullHeal => stats.full_heal(),
            UpgradeEffect::FullHealMaxHp(n) => {
                stats.add_max_hp(n);
                stats.full_heal();
            }
            UpgradeEffect::Projectiles(n) => loadout.weapon.add_projectiles(n),
            UpgradeEffect::Pierce(n) => loadout.weapon.pierce += n,
            UpgradeEffect::AttackSpeed(m) => loadout.weapon.add_fire_rate_multiplier(m),
            UpgradeEffect::HitRadius(r) => {
                loadout.weapon.aoe_radius += r;
                loadout.melee.aoe_radius += r;
            }
            UpgradeEffect::Knockback(bonus) => loadout.melee.knockback_multiplier += bonus,
            UpgradeEffect::Bleed => loadout.melee.bleed = true,
        }
    }
}

// ── Offers and pools ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeOffer {
    /// Unique key shown on the gate.
    pub title: &'static str,
    pub weight: f32,
    pub effect: UpgradeEffect,
    /// Leaves the pool for good once taken this many times.
    pub stack_cap: Option<u32>,
}

impl UpgradeOffer {
    pub fn new(title: &'static str, weight: f32, effect: UpgradeEffect) -> Self {
        Self {
            title,
            weight,
            effect,
            stack_cap: None,
        }
    }

    pub fn capped(mut self, cap: u32) -> Self {
        self.stack_cap = Some(cap);
        self
    }
}

pub fn ranged_pool() -> Vec<UpgradeOffer> {
    vec![
        UpgradeOffer::new("Power +1", 23.0, UpgradeEffect::Power(1)).capped(2),
        UpgradeOffer::new("Move Speed +15%", 23.0, UpgradeEffect::MoveSpeed(1.15)),
        UpgradeOffer::new("Heal +1 Heart", 23.0, UpgradeEffect::Heal(1)),
        UpgradeOffer::new("Projectiles +1", 10.0, UpgradeEffect::Projectiles(1)),
        UpgradeOffer::new("Full Heal", 10.0, UpgradeEffect::FullHeal),
        UpgradeOffer::new("Pierce +1", 10.0, UpgradeEffect::Pierce(1)),
        UpgradeOffer::new("Attack Speed +10%", 10.0, UpgradeEffect::AttackSpeed(1.10)),
    ]
}

pub fn melee_pool() -> Vec<UpgradeOffer> {
    vec![
        UpgradeOffer::new("Knockback +20%", 25.0, UpgradeEffect::Knockback(0.20)),
        UpgradeOffer::new("Melee Damage +1", 25.0, UpgradeEffect::MeleeDamage(1)),
        UpgradeOffer::new("Bleed (2 dmg over time)", 25.0, UpgradeEffect::Bleed).capped(1),
        UpgradeOffer::new("Move Speed +5%", 23.0, UpgradeEffect::MoveSpeed(1.05)),
        UpgradeOffer::new("Heal +1 Heart", 23.0, UpgradeEffect::Heal(1)),
        UpgradeOffer::new("Full Heal", 10.0, UpgradeEffect::FullHeal),
    ]
}

/// Offers only drawn at grand gates, on top of the build pool.
pub fn grand_extras() -> Vec<UpgradeOffer> {
    vec![
        UpgradeOffer::new("Big Hit Radius +0.2", 10.0, UpgradeEffect::HitRadius(0.2)),
        UpgradeOffer::new("Power +2", 10.0, UpgradeEffect::Power(2)),
        UpgradeOffer::new("Full Heal + Max HP +2", 10.0, UpgradeEffect::FullHealMaxHp(2)),
    ]
}

pub fn pool_for(style: CombatStyle) -> Vec<UpgradeOffer> {
    match style {
        CombatStyle::Ranged => ranged_pool(),
        CombatStyle::Melee => melee_pool(),
    }
}

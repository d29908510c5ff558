//! Per-actor stat block.
//!
//! Every actor (player, melee, ranged or strong enemy) owns exactly one
//! [`StatBlock`].  It is created at spawn from a difficulty snapshot and only
//! mutated through the clamping methods below, so `0 ≤ hp ≤ max_hp` holds
//! after every call.

/// Hit points, movement and payout of one actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatBlock {
    pub max_hp: i32,
    pub hp: i32,
    /// World units / second.
    pub move_speed: f32,
    /// Damage dealt to the player on contact.
    pub contact_damage: i32,
    /// Score awarded when this actor dies.
    pub score_value: i32,
}

impl StatBlock {
    /// Fresh block at full health.  Inputs are clamped to their valid ranges.
    pub fn new(max_hp: i32, move_speed: f32, contact_damage: i32, score_value: i32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            max_hp,
            hp: max_hp,
            move_speed: move_speed.max(0.0),
            contact_damage: contact_damage.max(0),
            score_value: score_value.max(0),
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Subtract `amount` and return the hp actually removed.
    ///
    /// Negative amounts are treated as zero.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_sub(amount.max(0)).clamp(0, self.max_hp);
        before - self.hp
    }

    /// Add up to `amount` hp, never exceeding `max_hp`.  Returns hp restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount.max(0)).clamp(0, self.max_hp);
        self.hp - before
    }

    pub fn full_heal(&mut self) {
        self.hp = self.max_hp;
    }

    /// Raise `max_hp` by `amount` (minimum 1 overall), keeping `hp` in range.
    pub fn add_max_hp(&mut self, amount: i32) {
        self.max_hp = self.max_hp.saturating_add(amount).max(1);
        self.hp = self.hp.clamp(0, self.max_hp);
    }

    /// Fraction of health remaining in `[0, 1]`.
    #[inline]
    pub fn hp_fraction(&self) -> f32 {
        self.hp as f32 / self.max_hp as f32
    }
}

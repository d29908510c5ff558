//! Damage-over-time applied by melee hits once bleed is unlocked.

/// Delivers `total` damage as one point per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Bleed {
    ticks_left: u32,
    interval: f32,
    until_next: f32,
}

impl Bleed {
    pub fn new(total_damage: i32, interval: f32) -> Self {
        let interval = interval.max(f32::EPSILON);
        Self {
            ticks_left: total_damage.max(0) as u32,
            interval,
            until_next: interval,
        }
    }

    /// Advance by `dt` and return the damage that falls due.
    pub fn tick(&mut self, dt: f32) -> i32 {
        let mut due = 0;
        self.until_next -= dt;
        while self.ticks_left > 0 && self.until_next <= 0.0 {
            due += 1;
            self.ticks_left -= 1;
            self.until_next += self.interval;
        }
        due
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.ticks_left == 0
    }

    pub fn ticks_left(&self) -> u32 {
        self.ticks_left
    }
}

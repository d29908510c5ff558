//! Time-gated hit acceptance.
//!
//! The same window backs two rules: the player's invulnerability frames and
//! each enemy's contact-attack debounce.  A hit at `now` is rejected while
//! `now - last_hit < duration`; a hit at exactly `last_hit + duration` is
//! accepted.

#[derive(Debug, Clone, PartialEq)]
pub struct HitWindow {
    pub duration: f32,
    last_hit: Option<f32>,
}

impl HitWindow {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            last_hit: None,
        }
    }

    #[inline]
    pub fn accepts(&self, now: f32) -> bool {
        match self.last_hit {
            None => true,
            Some(last) => now - last >= self.duration,
        }
    }

    /// Accept and stamp `now`, or reject without touching state.
    pub fn try_accept(&mut self, now: f32) -> bool {
        if self.accepts(now) {
            self.last_hit = Some(now);
            true
        } else {
            false
        }
    }

    pub fn last_hit(&self) -> Option<f32> {
        self.last_hit
    }

    /// Seconds of protection left at `now`.
    pub fn remaining(&self, now: f32) -> f32 {
        match self.last_hit {
            None => 0.0,
            Some(last) => (self.duration - (now - last)).max(0.0),
        }
    }
}

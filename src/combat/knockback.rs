//! Knockback motion override.
//!
//! A knocked-back actor ignores its normal seek movement and slides with a
//! fixed velocity until the timer runs out, then drops back to
//! [`MotionState::Normal`] on its own.

use bevy::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MotionState {
    #[default]
    Normal,
    KnockedBack { velocity: Vec2, remaining: f32 },
}

impl MotionState {
    /// Start (or restart) a knockback.  Zero vectors and durations are ignored.
    pub fn knock(&mut self, velocity: Vec2, duration: f32) {
        if velocity == Vec2::ZERO || duration <= 0.0 {
            return;
        }
        *self = MotionState::KnockedBack {
            velocity,
            remaining: duration,
        };
    }

    /// Velocity to use for this step, then advance the timer by `dt`.
    ///
    /// Returns `None` when the actor moves normally.
    pub fn step(&mut self, dt: f32) -> Option<Vec2> {
        match *self {
            MotionState::Normal => None,
            MotionState::KnockedBack {
                velocity,
                remaining,
            } => {
                let left = remaining - dt;
                *self = if left <= 0.0 {
                    MotionState::Normal
                } else {
                    MotionState::KnockedBack {
                        velocity,
                        remaining: left,
                    }
                };
                Some(velocity)
            }
        }
    }

    #[inline]
    pub fn is_knocked_back(&self) -> bool {
        matches!(self, MotionState::KnockedBack { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knockback_expires_without_reset() {
        let mut m = MotionState::Normal;
        m.knock(Vec2::new(6.0, 0.0), 0.1);
        assert_eq!(m.step(0.05), Some(Vec2::new(6.0, 0.0)));
        assert!(m.is_knocked_back());
        assert_eq!(m.step(0.05), Some(Vec2::new(6.0, 0.0)));
        assert_eq!(m, MotionState::Normal);
        assert_eq!(m.step(0.05), None);
    }

    #[test]
    fn zero_vector_does_not_knock() {
        let mut m = MotionState::Normal;
        m.knock(Vec2::ZERO, 0.1);
        assert_eq!(m, MotionState::Normal);
    }

    #[test]
    fn second_knock_restarts_timer() {
        let mut m = MotionState::Normal;
        m.knock(Vec2::X, 0.1);
        m.step(0.08);
        m.knock(Vec2::Y, 0.1);
        assert_eq!(
            m,
            MotionState::KnockedBack {
                velocity: Vec2::Y,
                remaining: 0.1
            }
        );
    }
}

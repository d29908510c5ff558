//! Combat-core error types.
//!
//! Recoverable failures (a gate choice out of range, a stale gate token, a
//! broken flag file) surface as [`CoreError`].  Missing collaborators are not
//! errors: callers log a warning and degrade instead.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wave_survival::error::{CoreError, CoreResult};
//!
//! fn choose(offers: &[UpgradeOffer], index: usize) -> CoreResult<&UpgradeOffer> {
//!     offers.get(index).ok_or(CoreError::InvalidChoice {
//!         index,
//!         offered: offers.len(),
//!     })
//! }
//! ```

use std::fmt;

/// Top-level error enum for the wave-survival core.
#[derive(Debug)]
pub enum CoreError {
    /// `SelectedDifficulty` held a value outside `0..=3`.
    UnknownDifficulty {
        /// The raw flag value.
        value: i32,
    },

    /// `SelectedCombat` held a value other than `0` (melee) or `1` (ranged).
    UnknownCombatType {
        /// The raw flag value.
        value: i32,
    },

    /// An actor was referenced but is not in the session registry.
    MissingActor {
        /// Raw id of the missing actor.
        id: u64,
        /// Human-readable description of where the lookup occurred.
        context: &'static str,
    },

    /// An upgrade gate was opened over an empty pool.
    EmptyUpgradePool,

    /// A gate choice index was outside the offered slice.
    InvalidChoice {
        /// Index the caller asked for.
        index: usize,
        /// Number of offers on display.
        offered: usize,
    },

    /// No upgrade gate is currently open.
    NoOpenGate,

    /// A gate callback arrived with a token from an earlier, invalidated gate.
    StaleGate {
        /// Token carried by the callback.
        token: u64,
        /// Token of the gate currently open (0 if none).
        current: u64,
    },

    /// Reading or writing the flag file failed.
    FlagStoreIo {
        /// Path of the flag file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The flag file exists but is not a valid flag table.
    FlagStoreParse {
        /// Path of the flag file.
        path: String,
        /// Parser message.
        message: String,
    },

    /// `assets/combat.toml` could not be parsed.
    ConfigParse {
        /// Parser message.
        message: String,
    },

    /// A tuning value is outside its safe operating range.
    UnsafeConstant {
        /// Name of the value (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::UnknownDifficulty { value } => {
                write!(f, "unknown difficulty index {} (expected 0..=3)", value)
            }
            CoreError::UnknownCombatType { value } => {
                write!(f, "unknown combat type {} (expected 0 or 1)", value)
            }
            CoreError::MissingActor { id, context } => {
                write!(f, "actor {} not found during '{}'", id, context)
            }
            CoreError::EmptyUpgradePool => write!(f, "upgrade pool is empty"),
            CoreError::InvalidChoice { index, offered } => write!(
                f,
                "upgrade choice {} is out of range ({} offers on display)",
                index, offered
            ),
            CoreError::NoOpenGate => write!(f, "no upgrade gate is open"),
            CoreError::StaleGate { token, current } => write!(
                f,
                "gate token {} is stale (current gate token {})",
                token, current
            ),
            CoreError::FlagStoreIo { path, source } => {
                write!(f, "flag store I/O error at '{}': {}", path, source)
            }
            CoreError::FlagStoreParse { path, message } => {
                write!(f, "flag store at '{}' is malformed: {}", path, message)
            }
            CoreError::ConfigParse { message } => {
                write!(f, "combat config is malformed: {}", message)
            }
            CoreError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "value '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::FlagStoreIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias: a `Result` using `CoreError` as the error type.
pub type CoreResult<T> = Result<T, CoreError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error if `value` is not strictly positive.
pub fn validate_positive(name: &'static str, value: f32) -> CoreResult<()> {
    if value <= 0.0 || value.is_nan() {
        Err(CoreError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    } else {
        Ok(())
    }
}

/// Returns an error if `value` is negative.
pub fn validate_non_negative(name: &'static str, value: f32) -> CoreResult<()> {
    if value < 0.0 || value.is_nan() {
        Err(CoreError::UnsafeConstant {
            name,
            value,
            safe_range: "[0.0, ∞)",
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_rejects_zero_and_nan() {
        assert!(validate_positive("x", 0.0).is_err());
        assert!(validate_positive("x", f32::NAN).is_err());
        assert!(validate_positive("x", 0.1).is_ok());
    }

    #[test]
    fn non_negative_accepts_zero() {
        assert!(validate_non_negative("x", 0.0).is_ok());
        assert!(validate_non_negative("x", -0.01).is_err());
    }

    #[test]
    fn stale_gate_message_names_both_tokens() {
        let msg = CoreError::StaleGate {
            token: 3,
            current: 4,
        }
        .to_string();
        assert!(msg.contains('3') && msg.contains('4'));
    }
}

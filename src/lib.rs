//! Wave-survival combat core.
//!
//! A top-down wave-survival shooter: enemies arrive in escalating batches, the
//! player auto-fires or swings, and every cleared wave opens a weighted
//! upgrade gate.  Kill totals unlock persistent achievements and rewards.
//!
//! The combat rules live in plain Rust types owned by one
//! [`session::CombatSession`]; the [`game`] module wires that session into
//! Bevy states and Rapier collision events.

pub mod achievement;
pub mod actor;
pub mod combat;
pub mod config;
pub mod constants;
pub mod difficulty;
pub mod error;
pub mod flags;
pub mod game;
pub mod session;
pub mod spatial_partition;
pub mod stats;
pub mod upgrade;
pub mod wave;

//! Wave progression and enemy placement.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`scheduler`] | `WaveScheduler` phase machine: batches, gates, victory, defeat, endless pacing |
//! | [`spawn`] | Spawn-point providers, separation retries, ranged/melee coin flip |

pub mod scheduler;
pub mod spawn;

pub use scheduler::{WaveCommand, WavePacing, WavePhase, WaveScheduler};
pub use spawn::{roll_enemy_kind, SpawnPlacer, SpawnPointProvider, StaticSpawnPoints};

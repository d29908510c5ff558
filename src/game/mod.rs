//! Bevy layer around [`CombatSession`]: states, resources and plugins.
//!
//! ## States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `CombatSelect` | Difficulty and build picker; no session exists |
//! | `Playing` | Session ticks every frame; collisions are ingested |
//! | `UpgradeGate` | Session clock and physics frozen until an offer is picked |
//! | `Victory` / `Defeat` | Run over; any confirm key returns to `CombatSelect` |
//!
//! ## Sub-module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`selection`] | Selection input writing `SelectedDifficulty` / `SelectedCombat`, reward claims, session teardown, result screens |
//! | [`sync`] | Session creation, collision ingestion, per-frame tick, entity mirroring |
//! | [`gate`] | Gate input and physics pause/resume |
//! | [`hud`] | `HudUpdate` messages, HUD text, overlays, gizmo drawing |
//!
//! Simulation systems run under `.run_if(in_state(GameState::Playing))`.
//! [`CombatPlugin`] holds everything headless; [`CombatViewPlugin`] adds the
//! UI and gizmo systems that need a window.

pub mod gate;
pub mod hud;
pub mod selection;
pub mod sync;

use crate::flags::{FlagStore, MemoryFlagStore, TomlFlagStore, DEFAULT_FLAGS_PATH};
use crate::session::CombatSession;
use bevy::prelude::*;

pub use hud::HudUpdate;
pub use sync::{ActorLink, ContactPairs, EntityIndex, PlayerBody, ProjectileLink, SwingFlash};

/// Top-level application state machine.
#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    /// Difficulty and build picker; shown on startup and after a run.
    #[default]
    CombatSelect,
    /// Active combat.
    Playing,
    /// Upgrade offers shown; the session clock is paused.
    UpgradeGate,
    /// Final wave cleared.
    Victory,
    /// Player died.
    Defeat,
}

/// The running combat session.  Exists only between combat entry and exit.
#[derive(Resource)]
pub struct ActiveSession(pub CombatSession);

/// The persistent flag store while no session owns it.
#[derive(Resource)]
pub struct Flags(pub Option<Box<dyn FlagStore + Send + Sync>>);

impl Default for Flags {
    fn default() -> Self {
        Self(Some(Box::new(MemoryFlagStore::new())))
    }
}

impl Flags {
    /// Open `saves/flags.toml`, falling back to an in-memory store.
    pub fn open_default() -> Self {
        match TomlFlagStore::open(DEFAULT_FLAGS_PATH) {
            Ok(store) => {
                println!("✓ Loaded flags from {}", DEFAULT_FLAGS_PATH);
                Self(Some(Box::new(store)))
            }
            Err(e) => {
                eprintln!("⚠ Failed to open flag store ({}); progress will not persist", e);
                Self::default()
            }
        }
    }

    pub fn store(&self) -> Option<&(dyn FlagStore + Send + Sync)> {
        self.0.as_deref()
    }

    pub fn store_mut(&mut self) -> Option<&mut (dyn FlagStore + Send + Sync + 'static)> {
        self.0.as_deref_mut()
    }
}

/// RNG seed for the next session.  Bumped every time a session starts.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSeed(pub u64);

impl Default for SessionSeed {
    fn default() -> Self {
        Self(rand::random())
    }
}

// ── Plugins ───────────────────────────────────────────────────────────────────

/// States, session lifecycle, collision ingestion and the frame tick.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            .init_resource::<Flags>()
            .init_resource::<SessionSeed>()
            .init_resource::<EntityIndex>()
            .init_resource::<ContactPairs>()
            .add_message::<HudUpdate>()
            .add_systems(OnEnter(GameState::CombatSelect), selection::end_session)
            .add_systems(
                Update,
                (
                    selection::selection_input_system,
                    selection::reward_claim_system,
                )
                    .run_if(in_state(GameState::CombatSelect)),
            )
            .add_systems(OnEnter(GameState::Playing), sync::begin_session)
            .add_systems(
                Update,
                (
                    sync::player_movement_system,
                    sync::collision_ingest_system,
                    sync::session_tick_system,
                    sync::transform_sync_system,
                    hud::hud_emit_system,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing))
                    .run_if(resource_exists::<ActiveSession>),
            )
            .add_systems(OnEnter(GameState::UpgradeGate), gate::pause_physics)
            .add_systems(OnExit(GameState::UpgradeGate), gate::resume_physics)
            .add_systems(
                Update,
                gate::gate_input_system
                    .run_if(in_state(GameState::UpgradeGate))
                    .run_if(resource_exists::<ActiveSession>),
            )
            .add_systems(OnEnter(GameState::Victory), gate::pause_physics)
            .add_systems(OnEnter(GameState::Defeat), gate::pause_physics)
            .add_systems(OnExit(GameState::Victory), gate::resume_physics)
            .add_systems(OnExit(GameState::Defeat), gate::resume_physics)
            .add_systems(
                Update,
                selection::result_input_system
                    .run_if(in_state(GameState::Victory).or(in_state(GameState::Defeat))),
            );
    }
}

/// HUD, overlays and gizmos.  Requires the rendering plugins.
pub struct CombatViewPlugin;

impl Plugin for CombatViewPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, hud::setup_hud)
            .add_systems(OnEnter(GameState::CombatSelect), hud::setup_selection_screen)
            .add_systems(OnExit(GameState::CombatSelect), hud::cleanup_selection_screen)
            .add_systems(
                Update,
                hud::selection_text_system.run_if(in_state(GameState::CombatSelect)),
            )
            .add_systems(OnEnter(GameState::UpgradeGate), hud::setup_gate_overlay)
            .add_systems(OnExit(GameState::UpgradeGate), hud::cleanup_overlay)
            .add_systems(OnEnter(GameState::Victory), hud::setup_result_overlay)
            .add_systems(OnEnter(GameState::Defeat), hud::setup_result_overlay)
            .add_systems(OnExit(GameState::Victory), hud::cleanup_overlay)
            .add_systems(OnExit(GameState::Defeat), hud::cleanup_overlay)
            .add_systems(
                Update,
                (
                    hud::hud_text_system,
                    hud::swing_flash_system,
                    hud::camera_follow_system.run_if(resource_exists::<ActiveSession>),
                    hud::gizmo_system.run_if(resource_exists::<ActiveSession>),
                ),
            );
    }
}

//! Combat selection, session teardown and the post-run screens.

use super::{ActiveSession, ContactPairs, EntityIndex, Flags, GameState, SwingFlash};
use crate::achievement::{ClaimOutcome, Reward};
use crate::difficulty::{CombatStyle, DifficultyTier};
use crate::flags::{FlagStore, SELECTED_COMBAT, SELECTED_DIFFICULTY, SELECTED_MAP};
use bevy::prelude::*;

/// Flag writes for one frame of selection input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionInput {
    pub tier: Option<DifficultyTier>,
    pub style: Option<CombatStyle>,
    pub confirm: bool,
}

impl SelectionInput {
    pub fn from_keys(keys: &ButtonInput<KeyCode>) -> Self {
        let tier = [
            KeyCode::Digit1,
            KeyCode::Digit2,
            KeyCode::Digit3,
            KeyCode::Digit4,
        ]
        .iter()
        .position(|k| keys.just_pressed(*k))
        .and_then(|i| DifficultyTier::from_index(i as i32).ok());
        let style = if keys.just_pressed(KeyCode::KeyM) {
            Some(CombatStyle::Melee)
        } else if keys.just_pressed(KeyCode::KeyR) {
            Some(CombatStyle::Ranged)
        } else {
            None
        };
        Self {
            tier,
            style,
            confirm: keys.just_pressed(KeyCode::Enter) || keys.just_pressed(KeyCode::Space),
        }
    }

    /// Persist the picks.  Returns true when combat may start.
    pub fn apply(self, store: &mut dyn FlagStore) -> bool {
        if let Some(tier) = self.tier {
            store.set_int(SELECTED_DIFFICULTY, tier.index());
            store.set_int(SELECTED_MAP, 0);
            info!("Difficulty: {}", tier.label());
        }
        if let Some(style) = self.style {
            store.set_int(SELECTED_COMBAT, style.flag_value());
            info!("Build: {:?}", style);
        }
        if !self.confirm {
            return false;
        }
        if store.get_int(SELECTED_COMBAT, -1) < 0 {
            info!("Pick a build first: [M] melee or [R] ranged");
            return false;
        }
        if let Err(e) = store.flush() {
            warn!("Failed to save selection: {}", e);
        }
        true
    }
}

/// Digits pick the difficulty, M/R the build, Enter starts.
pub fn selection_input_system(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut flags: ResMut<Flags>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(keys) = keys else {
        return;
    };
    let input = SelectionInput::from_keys(&keys);
    if input == SelectionInput::default() {
        return;
    }
    let Some(store) = flags.store_mut() else {
        warn!("Flag store unavailable");
        return;
    };
    if input.apply(store) {
        next_state.set(GameState::Playing);
    }
}

/// Reward claimed by F1..F6, in achievement order.
pub fn reward_for(keys: &ButtonInput<KeyCode>) -> Option<Reward> {
    const KEYS: [KeyCode; 6] = [
        KeyCode::F1,
        KeyCode::F2,
        KeyCode::F3,
        KeyCode::F4,
        KeyCode::F5,
        KeyCode::F6,
    ];
    KEYS.iter()
        .position(|k| keys.just_pressed(*k))
        .and_then(|i| Reward::ALL.get(i).copied())
}

/// Claim the reward of an unlocked achievement from the selection screen.
pub fn reward_claim_system(keys: Option<Res<ButtonInput<KeyCode>>>, mut flags: ResMut<Flags>) {
    let Some(reward) = keys.as_deref().and_then(reward_for) else {
        return;
    };
    let Some(store) = flags.store_mut() else {
        warn!("Flag store unavailable");
        return;
    };
    match reward.claim(store) {
        ClaimOutcome::Claimed => info!("Reward claimed: {}", reward.label()),
        ClaimOutcome::AlreadyClaimed => info!("{} already claimed", reward.label()),
        ClaimOutcome::Locked => info!(
            "{} unlocks at {} total kills",
            reward.label(),
            reward.threshold()
        ),
    }
}

/// Any confirm key after a run returns to selection.
pub fn result_input_system(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(keys) = keys else {
        return;
    };
    if keys.just_pressed(KeyCode::Enter)
        || keys.just_pressed(KeyCode::Space)
        || keys.just_pressed(KeyCode::Escape)
    {
        next_state.set(GameState::CombatSelect);
    }
}

/// Drop the session, hand its flag store back and despawn every mirror.
pub fn end_session(world: &mut World) {
    if let Some(ActiveSession(mut session)) = world.remove_resource::<ActiveSession>() {
        session.cancel();
        info!("Combat ended with score {}", session.score());
        let store = session.into_store();
        world.get_resource_or_insert_with(Flags::default).0 = Some(store);
    }

    let mut doomed = world
        .get_resource_mut::<EntityIndex>()
        .map(|mut index| index.drain_all())
        .unwrap_or_default();
    let mut flashes = world.query_filtered::<Entity, With<SwingFlash>>();
    doomed.extend(flashes.iter(world));
    for entity in doomed {
        world.despawn(entity);
    }
    if let Some(mut contacts) = world.get_resource_mut::<ContactPairs>() {
        contacts.0.clear();
    }
}

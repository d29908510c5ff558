use super::{ActiveSession, GameState};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Disable the Rapier pipeline so mirrors freeze while the gate is open.
pub fn pause_physics(mut config: Query<&mut RapierConfiguration>) {
    for mut cfg in config.iter_mut() {
        cfg.physics_pipeline_active = false;
    }
}

/// Re-enable the Rapier pipeline.
pub fn resume_physics(mut config: Query<&mut RapierConfiguration>) {
    for mut cfg in config.iter_mut() {
        cfg.physics_pipeline_active = true;
    }
}

/// Offer index for a pressed digit key.
pub fn offer_index_for(keys: &ButtonInput<KeyCode>) -> Option<usize> {
    const KEYS: [(KeyCode, KeyCode); 3] = [
        (KeyCode::Digit1, KeyCode::Numpad1),
        (KeyCode::Digit2, KeyCode::Numpad2),
        (KeyCode::Digit3, KeyCode::Numpad3),
    ];
    KEYS.iter()
        .position(|&(digit, numpad)| keys.just_pressed(digit) || keys.just_pressed(numpad))
}

/// 1/2/3 picks an offer; the session resumes and combat continues.
pub fn gate_input_system(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut session: ResMut<ActiveSession>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(token) = session.0.open_gate().map(|gate| gate.token) else {
        // Nothing to choose from: the scheduler already fell back to auto-continue.
        next_state.set(GameState::Playing);
        return;
    };
    let Some(index) = keys.as_deref().and_then(offer_index_for) else {
        return;
    };
    match session.0.choose_upgrade(token, index) {
        Ok(offer) => {
            info!("Picked upgrade {}: {}", index + 1, offer.title);
            next_state.set(GameState::Playing);
        }
        Err(e) => warn!("Upgrade choice rejected: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_and_numpad_map_to_offers() {
        let mut keys = ButtonInput::<KeyCode>::default();
        assert_eq!(offer_index_for(&keys), None);
        keys.press(KeyCode::Numpad2);
        assert_eq!(offer_index_for(&keys), Some(1));
        keys.clear();
        keys.press(KeyCode::Digit3);
        assert_eq!(offer_index_for(&keys), Some(2));
    }
}

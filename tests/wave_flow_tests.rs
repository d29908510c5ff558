//! End-to-end combat session scenarios without Bevy.
//!
//! Each test drives a [`CombatSession`] through real ticks.  Enemies are
//! killed by reporting hits from a high-damage, high-pierce bolt, which takes
//! the same resolver path as a physics-reported projectile overlap.
//!
//! Covered scenarios:
//! 1. A cleared mid-run wave opens exactly one gate and holds the next wave.
//! 2. Clearing the final wave wins; later ticks are ignored.
//! 3. Repeated contact kills the player and ends the run in defeat.
//! 4. Kills unlock achievements; a claimed reward shapes the next session.
//! 5. Grand gates carry the extra offers.
//! 6. Endless mode gates on kill count and raises the threshold.
//! 7. Builds attack on their own: ranged auto-fire and melee swings.

use bevy::math::Vec2;
use wave_survival::achievement::{ClaimOutcome, Reward};
use wave_survival::actor::{ActorId, Faction};
use wave_survival::combat::{Fire, HitEvent, Projectile};
use wave_survival::config::GameConfig;
use wave_survival::difficulty::{CombatStyle, DifficultyTier};
use wave_survival::flags::{FlagStore, MemoryFlagStore, TOTAL_KILLS};
use wave_survival::session::{CombatSession, SessionEvent, SessionSelection};
use wave_survival::upgrade::grand_extras;
use wave_survival::wave::WavePhase;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn selection(tier: DifficultyTier, style: CombatStyle) -> SessionSelection {
    SessionSelection { tier, style }
}

fn session_with(
    config: GameConfig,
    tier: DifficultyTier,
    style: CombatStyle,
    store: MemoryFlagStore,
) -> CombatSession {
    let mut session = CombatSession::new(config, selection(tier, style), Box::new(store), 11);
    session.start();
    session
}

fn easy_session(max_waves: u32) -> CombatSession {
    let mut config = GameConfig::default();
    config.tiers.easy.max_waves = max_waves;
    session_with(
        config,
        DifficultyTier::Easy,
        CombatStyle::Ranged,
        MemoryFlagStore::new(),
    )
}

fn active_enemies(session: &CombatSession) -> Vec<ActorId> {
    session
        .registry()
        .enemies()
        .filter(|(_, actor)| actor.is_active())
        .map(|(id, _)| id)
        .collect()
}

/// Report a lethal hit on every living enemy, then tick once.
fn kill_all(session: &mut CombatSession, dt: f32) -> Vec<SessionEvent> {
    let targets = active_enemies(session);
    if !targets.is_empty() {
        let mut bolt = Projectile::new(
            session.player_id(),
            Faction::Player,
            Vec2::ZERO,
            0.0,
            10_000,
            100.0,
        );
        bolt.fire(Vec2::X, 10_000, 0.0);
        let id = session.projectiles_mut().insert(bolt);
        for target in targets {
            session.report_hit(HitEvent::Projectile {
                projectile: id,
                target,
            });
        }
    }
    session.tick(dt);
    session.drain_events()
}

/// Kill everything that spawns until the scheduler stops running.
fn fight_until_stopped(session: &mut CombatSession) -> Vec<SessionEvent> {
    let mut events = session.drain_events();
    for _ in 0..100 {
        events.extend(kill_all(session, 0.5));
        if !session.scheduler().is_running() {
            break;
        }
    }
    events
}

fn gates(events: &[SessionEvent]) -> Vec<(wave_survival::upgrade::GateToken, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::GateOpened { token, grand, .. } => Some((*token, *grand)),
            _ => None,
        })
        .collect()
}

fn spawned(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::ActorSpawned { .. }))
        .count()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn cleared_wave_opens_one_gate_and_holds_next_wave() {
    let mut session = easy_session(5);

    let first = fight_until_stopped(&mut session);
    let (token, _) = gates(&first)[0];
    session.choose_upgrade(token, 0).expect("first gate");

    let second = fight_until_stopped(&mut session);
    let opened = gates(&second);
    assert_eq!(opened.len(), 1, "wave 2 clear opens exactly one gate");
    assert_eq!(session.phase(), WavePhase::UpgradeGate);
    assert_eq!(session.scheduler().wave(), 2);

    // The clock is frozen and nothing spawns while the gate is open.
    let now = session.resolver().now();
    for _ in 0..20 {
        session.tick(1.0);
    }
    assert_eq!(session.resolver().now(), now);
    assert_eq!(spawned(&session.drain_events()), 0);
    assert_eq!(session.scheduler().wave(), 2);

    // The old token is stale.
    assert!(session.choose_upgrade(token, 0).is_err());

    let (current, _) = opened[0];
    session.choose_upgrade(current, 1).expect("second gate");
    let resumed = session.drain_events();
    assert!(resumed.contains(&SessionEvent::WaveStarted { wave: 3 }));
    assert_eq!(
        spawned(&resumed) as u32,
        session.profile().per_batch(3),
        "wave 3 main batch spawns on the gate callback"
    );
}

#[test]
fn final_wave_clear_is_victory() {
    let mut session = easy_session(2);

    let first = fight_until_stopped(&mut session);
    let (token, _) = gates(&first)[0];
    session.choose_upgrade(token, 0).expect("gate");

    let second = fight_until_stopped(&mut session);
    assert!(second.contains(&SessionEvent::Victory { wave: 2 }));
    assert!(gates(&second).is_empty(), "no gate after the last wave");
    assert_eq!(session.phase(), WavePhase::Victory);
    assert!(session.score() > 0);

    session.tick(5.0);
    assert!(session.drain_events().is_empty());
}

#[test]
fn repeated_contact_ends_in_defeat() {
    let mut session = easy_session(5);
    session.drain_events();
    let player = session.player_id();

    let mut events = Vec::new();
    for _ in 0..50 {
        if let Some(attacker) = active_enemies(&session).first().copied() {
            session.report_hit(HitEvent::Contact {
                attacker,
                victim: player,
            });
        }
        session.tick(1.0);
        events.extend(session.drain_events());
        if session.scheduler().is_finished() {
            break;
        }
    }

    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Defeat { wave: 1 })));
    assert_eq!(session.phase(), WavePhase::Defeat);
    let hp = session.player().map(|p| p.stats.hp);
    assert_eq!(hp, Some(0));
}

#[test]
fn kills_unlock_achievement_and_reward_carries_over() {
    let mut store = MemoryFlagStore::new();
    store.set_int(TOTAL_KILLS, 3);
    let config = GameConfig::default();
    let base_projectiles = config.weapon_base_projectile_count;
    let mut session = session_with(
        config.clone(),
        DifficultyTier::Easy,
        CombatStyle::Ranged,
        store,
    );

    let events = fight_until_stopped(&mut session);
    assert!(events.contains(&SessionEvent::AchievementUnlocked(5)));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::AchievementUnlocked(5)))
            .count(),
        1
    );
    assert!(session.store().get_int(TOTAL_KILLS, 0) >= 5);

    assert_eq!(session.claim_reward(Reward::PlusPower), ClaimOutcome::Locked);
    assert_eq!(
        session.claim_reward(Reward::ExtraProjectile),
        ClaimOutcome::Claimed
    );
    assert_eq!(
        session.claim_reward(Reward::ExtraProjectile),
        ClaimOutcome::AlreadyClaimed
    );

    session.cancel();
    let store = session.into_store();
    let next = CombatSession::new(
        config,
        selection(DifficultyTier::Easy, CombatStyle::Ranged),
        store,
        12,
    );
    assert_eq!(next.loadout().weapon.projectile_count, base_projectiles + 1);
    assert!(next.ledger().total_kills() >= 5);
}

#[test]
fn grand_gate_offers_include_extras() {
    let mut config = GameConfig::default();
    config.grand_upgrade_every = 2;
    config.upgrade_offer_count = 50;
    let mut session = session_with(
        config,
        DifficultyTier::Easy,
        CombatStyle::Ranged,
        MemoryFlagStore::new(),
    );

    let first = fight_until_stopped(&mut session);
    let (token, grand) = gates(&first)[0];
    assert!(!grand);
    let regular: Vec<&str> = session
        .open_gate()
        .map(|g| g.offers.iter().map(|o| o.title).collect())
        .unwrap_or_default();
    for extra in grand_extras() {
        assert!(!regular.contains(&extra.title));
    }
    session.choose_upgrade(token, 0).expect("gate");

    let second = fight_until_stopped(&mut session);
    let (_, grand) = gates(&second)[0];
    assert!(grand, "wave 2 is a grand wave");
    let offered: Vec<&str> = session
        .open_gate()
        .map(|g| g.offers.iter().map(|o| o.title).collect())
        .unwrap_or_default();
    for extra in grand_extras() {
        assert!(offered.contains(&extra.title), "{} missing", extra.title);
    }
}

#[test]
fn endless_gates_on_kills_and_raises_threshold() {
    let mut session = session_with(
        GameConfig::default(),
        DifficultyTier::Endless,
        CombatStyle::Ranged,
        MemoryFlagStore::new(),
    );
    assert!(session.is_endless());
    let first_threshold = session.scheduler().kill_threshold();

    let events = fight_until_stopped(&mut session);
    assert_eq!(session.phase(), WavePhase::UpgradeGate);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Victory { .. })));
    let (token, grand) = gates(&events)[0];
    assert!(!grand);

    session.choose_upgrade(token, 0).expect("endless gate");
    assert_eq!(
        session.scheduler().kill_threshold(),
        first_threshold + GameConfig::default().endless_kills_per_upgrade_growth
    );
    assert_eq!(session.scheduler().kills_since_upgrade(), 0);
    assert!(session.scheduler().is_running());
}

#[test]
fn ranged_build_auto_fires_at_nearby_enemy() {
    let mut session = easy_session(5);
    session.drain_events();
    let target = active_enemies(&session)[0];
    if let Some(enemy) = session.registry_mut().get_mut(target) {
        enemy.position = Vec2::new(3.0, 0.0);
    }

    session.tick(0.05);
    let fired = session.drain_events().into_iter().any(|e| {
        matches!(
            e,
            SessionEvent::ProjectileFired {
                faction: Faction::Player,
                ..
            }
        )
    });
    assert!(fired);
}

#[test]
fn melee_build_swings_at_adjacent_enemy() {
    let mut session = session_with(
        GameConfig::default(),
        DifficultyTier::Easy,
        CombatStyle::Melee,
        MemoryFlagStore::new(),
    );
    session.drain_events();
    let target = active_enemies(&session)[0];
    if let Some(enemy) = session.registry_mut().get_mut(target) {
        enemy.position = Vec2::new(0.5, 0.0);
    }

    session.tick(0.05);
    let events = session.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::MeleeSwung { .. })));
    let hit = session
        .registry()
        .get(target)
        .is_none_or(|enemy| enemy.stats.hp < enemy.stats.max_hp);
    assert!(hit, "swing damaged the adjacent enemy");
}

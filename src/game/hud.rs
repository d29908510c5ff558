//! HUD messages, text overlays and gizmo drawing.
//!
//! | System | Schedule | Purpose |
//! |--------|----------|---------|
//! | `hud_emit_system` | `Update` (Playing) | Write a [`HudUpdate`] when wave, score or hp change |
//! | `hud_text_system` | `Update` | Render the latest `HudUpdate` into the top-left text |
//! | `setup_selection_screen` | `OnEnter(CombatSelect)` | Difficulty/build picker and reward status text |
//! | `setup_gate_overlay` | `OnEnter(UpgradeGate)` | Numbered upgrade offers |
//! | `setup_result_overlay` | `OnEnter(Victory/Defeat)` | Final wave and score |
//! | `camera_follow_system` | `Update` | Camera tracks the player |
//! | `gizmo_system` | `Update` | Circles for actors, projectiles and melee swings |

use super::{ActiveSession, Flags, GameState, SwingFlash};
use crate::achievement::{AchievementLedger, Reward};
use crate::actor::{ActorKind, Faction};
use crate::constants::WORLD_SCALE;
use crate::difficulty::{CombatStyle, DifficultyTier, EnemyKind};
use crate::flags::{FlagStore, SELECTED_COMBAT, SELECTED_DIFFICULTY};
use crate::session::CombatSession;
use bevy::prelude::*;

/// Snapshot of the numbers the HUD shows.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HudUpdate {
    pub wave: u32,
    /// `None` in Endless mode.
    pub max_waves: Option<u32>,
    pub score: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub total_kills: u32,
}

impl HudUpdate {
    pub fn from_session(session: &CombatSession) -> Self {
        let (hp, max_hp) = session
            .player()
            .map_or((0, 0), |p| (p.stats.hp, p.stats.max_hp));
        Self {
            wave: session.scheduler().wave(),
            max_waves: session.scheduler().max_waves(),
            score: session.score(),
            hp,
            max_hp,
            total_kills: session.ledger().total_kills(),
        }
    }

    pub fn label(&self) -> String {
        let wave = match self.max_waves {
            Some(max) => format!("Wave {}/{}", self.wave, max),
            None => format!("Wave {} (endless)", self.wave),
        };
        format!(
            "{}   Score: {}   HP: {}/{}   Kills: {}",
            wave, self.score, self.hp, self.max_hp, self.total_kills
        )
    }
}

/// Root of the permanent HUD text.
#[derive(Component)]
pub struct HudText;

/// Root of any full-screen overlay; despawned on state exit.
#[derive(Component)]
pub struct OverlayRoot;

/// Root of the selection screen.
#[derive(Component)]
pub struct SelectionRoot;

/// Text node refreshed whenever the selection flags change.
#[derive(Component)]
pub struct SelectionText;

/// Reward claim status on the selection screen.
#[derive(Component)]
pub struct RewardText;

fn title_color() -> Color {
    Color::srgb(0.95, 0.88, 0.45)
}

fn body_color() -> Color {
    Color::srgb(0.85, 0.85, 0.90)
}

fn text_bundle(text: impl Into<String>, size: f32, color: Color) -> impl Bundle {
    (
        Text::new(text),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(color),
    )
}

fn overlay_node() -> impl Bundle {
    (
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            flex_direction: FlexDirection::Column,
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            row_gap: Val::Px(12.0),
            position_type: PositionType::Absolute,
            left: Val::Px(0.0),
            top: Val::Px(0.0),
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.78)),
        ZIndex(300),
    )
}

// ── HUD ───────────────────────────────────────────────────────────────────────

pub fn setup_hud(mut commands: Commands) {
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            top: Val::Px(10.0),
            ..default()
        },
        HudText,
        text_bundle("", 18.0, title_color()),
    ));
}

/// Write a [`HudUpdate`] whenever the displayed numbers change.
pub fn hud_emit_system(
    session: Res<ActiveSession>,
    mut last: Local<Option<HudUpdate>>,
    mut writer: MessageWriter<HudUpdate>,
) {
    let update = HudUpdate::from_session(&session.0);
    if *last == Some(update) {
        return;
    }
    *last = Some(update);
    writer.write(update);
}

pub fn hud_text_system(
    mut updates: MessageReader<HudUpdate>,
    mut q_text: Query<&mut Text, With<HudText>>,
) {
    let Some(update) = updates.read().last() else {
        return;
    };
    for mut text in q_text.iter_mut() {
        *text = Text::new(update.label());
    }
}

// ── Selection screen ──────────────────────────────────────────────────────────

fn selection_label(flags: &Flags) -> String {
    let (tier, style) = flags.store().map_or((None, None), |store| {
        (
            DifficultyTier::from_index(store.get_int(SELECTED_DIFFICULTY, 0)).ok(),
            CombatStyle::from_flag(store.get_int(SELECTED_COMBAT, -1))
                .ok()
                .flatten(),
        )
    });
    format!(
        "Difficulty: {}   Build: {}",
        tier.map_or("?", DifficultyTier::label),
        match style {
            Some(CombatStyle::Melee) => "Melee",
            Some(CombatStyle::Ranged) => "Ranged",
            None => "not chosen",
        }
    )
}

/// One line per reward: claim key, name and status.
fn reward_lines(store: &dyn FlagStore) -> String {
    Reward::ALL
        .iter()
        .enumerate()
        .map(|(i, reward)| {
            let status = if reward.is_claimed(store) {
                "claimed".to_string()
            } else if AchievementLedger::is_unlocked(store, reward.threshold()) {
                "ready".to_string()
            } else {
                format!("{} kills", reward.threshold())
            };
            format!("[F{}] {} ({})", i + 1, reward.label(), status)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn setup_selection_screen(mut commands: Commands, flags: Res<Flags>) {
    commands
        .spawn((overlay_node(), SelectionRoot))
        .with_children(|root| {
            root.spawn(text_bundle("WAVE SURVIVAL", 46.0, title_color()));
            root.spawn(text_bundle(
                "[1] Easy   [2] Medium   [3] Hard   [4] Endless",
                18.0,
                body_color(),
            ));
            root.spawn(text_bundle("[M] Melee   [R] Ranged", 18.0, body_color()));
            root.spawn((
                text_bundle(selection_label(&flags), 18.0, title_color()),
                SelectionText,
            ));
            root.spawn(text_bundle("[Enter] Start", 16.0, body_color()));
            root.spawn((
                text_bundle(
                    flags.store().map(|store| reward_lines(store)).unwrap_or_default(),
                    15.0,
                    body_color(),
                ),
                RewardText,
            ));
        });
}

pub fn selection_text_system(
    flags: Res<Flags>,
    mut q_selection: Query<&mut Text, (With<SelectionText>, Without<RewardText>)>,
    mut q_rewards: Query<&mut Text, (With<RewardText>, Without<SelectionText>)>,
) {
    if !flags.is_changed() {
        return;
    }
    for mut text in q_selection.iter_mut() {
        *text = Text::new(selection_label(&flags));
    }
    let rewards = flags.store().map(|store| reward_lines(store)).unwrap_or_default();
    for mut text in q_rewards.iter_mut() {
        *text = Text::new(rewards.clone());
    }
}

pub fn cleanup_selection_screen(mut commands: Commands, q: Query<Entity, With<SelectionRoot>>) {
    for e in q.iter() {
        commands.entity(e).despawn();
    }
}

// ── Gate and result overlays ──────────────────────────────────────────────────

pub fn setup_gate_overlay(mut commands: Commands, session: Option<Res<ActiveSession>>) {
    let Some(gate) = session.as_ref().and_then(|s| s.0.open_gate()) else {
        return;
    };
    let heading = if gate.grand {
        "GRAND UPGRADE"
    } else {
        "UPGRADE"
    };
    let lines: Vec<String> = gate
        .offers
        .iter()
        .enumerate()
        .map(|(i, offer)| format!("[{}] {}", i + 1, offer.title))
        .collect();

    commands
        .spawn((overlay_node(), OverlayRoot))
        .with_children(|root| {
            root.spawn(text_bundle(heading, 40.0, title_color()));
            for line in lines {
                root.spawn(text_bundle(line, 22.0, body_color()));
            }
        });
}

pub fn setup_result_overlay(
    mut commands: Commands,
    state: Res<State<GameState>>,
    session: Option<Res<ActiveSession>>,
) {
    let (heading, color) = match state.get() {
        GameState::Victory => ("VICTORY", Color::srgb(0.45, 1.0, 0.55)),
        _ => ("DEFEAT", Color::srgb(1.0, 0.22, 0.22)),
    };
    let summary = session.map_or_else(String::new, |s| {
        format!(
            "Wave {}   Score: {}",
            s.0.scheduler().wave(),
            s.0.score()
        )
    });

    commands
        .spawn((overlay_node(), OverlayRoot))
        .with_children(|root| {
            root.spawn(text_bundle(heading, 46.0, color));
            root.spawn(text_bundle(summary, 18.0, body_color()));
            root.spawn(text_bundle("[Enter] Back to selection", 16.0, body_color()));
        });
}

pub fn cleanup_overlay(mut commands: Commands, q: Query<Entity, With<OverlayRoot>>) {
    for e in q.iter() {
        commands.entity(e).despawn();
    }
}

// ── Camera & gizmos ───────────────────────────────────────────────────────────

/// Keep the camera centred on the player.
pub fn camera_follow_system(
    session: Res<ActiveSession>,
    mut q_camera: Query<&mut Transform, With<Camera2d>>,
) {
    let Some(player) = session.0.player() else {
        return;
    };
    for mut transform in q_camera.iter_mut() {
        let z = transform.translation.z;
        transform.translation = (player.position * WORLD_SCALE).extend(z);
    }
}

pub fn swing_flash_system(
    mut commands: Commands,
    time: Res<Time>,
    mut q: Query<(Entity, &mut SwingFlash)>,
) {
    let dt = time.delta_secs();
    for (entity, mut flash) in q.iter_mut() {
        flash.remaining -= dt;
        if flash.remaining <= 0.0 {
            commands.entity(entity).despawn();
        }
    }
}

/// Draw every actor and projectile as a circle, plus fresh melee swings.
pub fn gizmo_system(
    mut gizmos: Gizmos,
    session: Res<ActiveSession>,
    flashes: Query<&SwingFlash>,
) {
    let session = &session.0;
    let config = session.config();

    for (_, actor) in session.registry().iter() {
        if !actor.is_active() {
            continue;
        }
        let pos = actor.position * WORLD_SCALE;
        let (radius, color) = match actor.kind {
            ActorKind::Player => (config.player_collider_radius, Color::srgb(0.3, 0.9, 1.0)),
            ActorKind::Enemy { kind, strong } => {
                let base = match kind {
                    EnemyKind::Melee => Color::srgb(1.0, 0.35, 0.3),
                    EnemyKind::Ranged => Color::srgb(1.0, 0.65, 0.2),
                };
                let r = if strong {
                    config.enemy_collider_radius * 1.25
                } else {
                    config.enemy_collider_radius
                };
                (r, base)
            }
        };
        gizmos.circle_2d(pos, radius * WORLD_SCALE, color);

        if actor.stats.max_hp > 0 && actor.stats.hp < actor.stats.max_hp {
            let width = radius * 2.0 * WORLD_SCALE;
            let start = pos + Vec2::new(-width / 2.0, (radius + 0.25) * WORLD_SCALE);
            let end = start + Vec2::new(width * actor.stats.hp_fraction(), 0.0);
            gizmos.line_2d(start, end, Color::srgb(0.2, 1.0, 0.3));
        }
    }

    for (_, projectile) in session.projectiles().iter() {
        let color = match projectile.faction {
            Faction::Player => Color::WHITE,
            Faction::Enemy => Color::srgb(1.0, 0.4, 0.9),
        };
        gizmos.circle_2d(
            projectile.position * WORLD_SCALE,
            config.projectile_collider_radius * WORLD_SCALE,
            color,
        );
    }

    for flash in flashes.iter() {
        gizmos.circle_2d(
            flash.center * WORLD_SCALE,
            flash.radius * WORLD_SCALE,
            Color::srgba(1.0, 1.0, 1.0, 0.6),
        );
    }
}

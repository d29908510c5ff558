//! Session lifecycle, collision ingestion and entity mirroring.
//!
//! The session is the source of truth.  Entities are thin mirrors: a
//! kinematic sensor collider at the actor's position carrying an
//! [`ActorLink`] or [`ProjectileLink`].  Rapier only reports overlaps; every
//! damage decision happens in the session.
//!
//! ## Collision groups
//!
//! | Group | Members | Collides with |
//! |-------|---------|---------------|
//! | `GROUP_1` | player | enemies, enemy projectiles |
//! | `GROUP_2` | enemies | player, player projectiles |
//! | `GROUP_3` | player projectiles | enemies |
//! | `GROUP_4` | enemy projectiles | player |

use super::{ActiveSession, Flags, GameState, SessionSeed};
use crate::actor::{ActorId, ActorKind, Faction};
use crate::combat::{HitEvent, ProjectileId};
use crate::config::GameConfig;
use crate::constants::{SWING_FLASH_SECS, WORLD_SCALE};
use crate::session::{CombatSession, SessionEvent, SessionSelection};
use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::prelude::*;
use std::collections::{BTreeSet, HashMap};

// ── Components & resources ────────────────────────────────────────────────────

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorLink(pub ActorId);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileLink(pub ProjectileId);

/// Marks the player's mirror entity.
#[derive(Component, Debug, Clone, Copy)]
pub struct PlayerBody;

/// Short-lived marker drawn where a melee swing landed.
#[derive(Component, Debug, Clone, Copy)]
pub struct SwingFlash {
    pub center: Vec2,
    pub radius: f32,
    pub remaining: f32,
}

/// Session id → mirror entity.
#[derive(Resource, Debug, Default)]
pub struct EntityIndex {
    pub actors: HashMap<ActorId, Entity>,
    pub projectiles: HashMap<ProjectileId, Entity>,
}

impl EntityIndex {
    /// Forget every mapping and return the entities to despawn.
    pub fn drain_all(&mut self) -> Vec<Entity> {
        self.actors
            .drain()
            .map(|(_, e)| e)
            .chain(self.projectiles.drain().map(|(_, e)| e))
            .collect()
    }
}

/// Enemy/player pairs currently overlapping, as (attacker, victim).
///
/// Contact damage repeats while a pair stays in the set; the session's
/// cooldown and i-frame windows decide which repeats land.
#[derive(Resource, Debug, Default)]
pub struct ContactPairs(pub BTreeSet<(Entity, Entity)>);

// ── Body bundles ──────────────────────────────────────────────────────────────

fn to_world(position: Vec2) -> Vec3 {
    (position * WORLD_SCALE).extend(0.0)
}

fn sensor_body(position: Vec2, radius: f32, membership: Group, filter: Group) -> impl Bundle {
    (
        Transform::from_translation(to_world(position)),
        Visibility::default(),
        RigidBody::KinematicPositionBased,
        Collider::ball(radius * WORLD_SCALE),
        Sensor,
        CollisionGroups::new(membership, filter),
        ActiveCollisionTypes::KINEMATIC_KINEMATIC,
        ActiveEvents::COLLISION_EVENTS,
    )
}

fn spawn_player_body(
    commands: &mut Commands,
    index: &mut EntityIndex,
    config: &GameConfig,
    id: ActorId,
    position: Vec2,
) {
    let entity = commands
        .spawn((
            ActorLink(id),
            PlayerBody,
            sensor_body(
                position,
                config.player_collider_radius,
                Group::GROUP_1,
                Group::GROUP_2 | Group::GROUP_4,
            ),
        ))
        .id();
    index.actors.insert(id, entity);
}

// ── OnEnter(Playing) ──────────────────────────────────────────────────────────

/// Build the session from the persisted selections and mirror its first wave.
///
/// Returning from the upgrade gate re-enters `Playing`; an existing session
/// is kept.
#[allow(clippy::too_many_arguments)]
pub fn begin_session(
    mut commands: Commands,
    existing: Option<Res<ActiveSession>>,
    mut flags: ResMut<Flags>,
    config: Res<GameConfig>,
    mut seed: ResMut<SessionSeed>,
    mut index: ResMut<EntityIndex>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if existing.is_some() {
        return;
    }
    let Some(store) = flags.0.take() else {
        warn!("Flag store unavailable; returning to combat select");
        next_state.set(GameState::CombatSelect);
        return;
    };
    let selection = match SessionSelection::from_flags(store.as_ref()) {
        Ok(selection) => selection,
        Err(e) => {
            warn!("Cannot start combat: {}", e);
            flags.0 = Some(store);
            next_state.set(GameState::CombatSelect);
            return;
        }
    };

    let mut session = CombatSession::new(config.clone(), selection, store, seed.0);
    seed.0 = seed.0.wrapping_add(1);
    info!(
        "Starting {} combat as {:?}",
        selection.tier.label(),
        selection.style
    );
    session.start();

    let player = session.player_id();
    let position = session.player().map_or(Vec2::ZERO, |p| p.position);
    spawn_player_body(&mut commands, &mut index, &config, player, position);
    let events = session.drain_events();
    apply_session_events(&mut commands, &mut index, &config, &mut next_state, events);

    commands.insert_resource(ActiveSession(session));
}

// ── Update (Playing) ──────────────────────────────────────────────────────────

/// WASD movement.  Aim falls back to the last movement direction.
pub fn player_movement_system(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    time: Res<Time>,
    mut session: ResMut<ActiveSession>,
) {
    let Some(keys) = keys else {
        return;
    };
    let mut dir = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        dir.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) {
        dir.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyA) {
        dir.x -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        dir.x += 1.0;
    }
    let Some(dir) = dir.try_normalize() else {
        return;
    };
    let session = &mut session.0;
    let Some((position, speed)) = session
        .player()
        .filter(|p| p.is_active())
        .map(|p| (p.position, p.stats.move_speed))
    else {
        return;
    };
    let next = position + dir * speed * time.delta_secs();
    session.set_player_position(next);
    session.set_view_center(next);
    session.set_aim(dir);
}

/// Turn Rapier overlap messages into queued session hits.
///
/// Projectile overlaps are one-shot.  Enemy/player overlaps are tracked from
/// `Started` to `Stopped` and re-queued every frame.
pub fn collision_ingest_system(
    mut collision_events: MessageReader<CollisionEvent>,
    actors: Query<&ActorLink>,
    projectiles: Query<&ProjectileLink>,
    mut contacts: ResMut<ContactPairs>,
    mut session: ResMut<ActiveSession>,
) {
    let player = session.0.player_id();

    for event in collision_events.read() {
        let (e1, e2, started) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2, true),
            CollisionEvent::Stopped(e1, e2, _) => (*e1, *e2, false),
        };

        for (a, b) in [(e1, e2), (e2, e1)] {
            if let (Ok(projectile), Ok(target)) = (projectiles.get(a), actors.get(b)) {
                if started {
                    session.0.report_hit(HitEvent::Projectile {
                        projectile: projectile.0,
                        target: target.0,
                    });
                }
                break;
            }
            if let (Ok(attacker), Ok(victim)) = (actors.get(a), actors.get(b)) {
                if victim.0 != player || attacker.0 == player {
                    continue;
                }
                if started {
                    contacts.0.insert((a, b));
                } else {
                    contacts.0.remove(&(a, b));
                }
                break;
            }
        }
    }

    contacts.0.retain(|(attacker, victim)| {
        match (actors.get(*attacker), actors.get(*victim)) {
            (Ok(attacker), Ok(victim)) => {
                session.0.report_hit(HitEvent::Contact {
                    attacker: attacker.0,
                    victim: victim.0,
                });
                true
            }
            _ => false,
        }
    });
}

/// Advance the session one frame and mirror what changed.
pub fn session_tick_system(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<GameConfig>,
    mut session: ResMut<ActiveSession>,
    mut index: ResMut<EntityIndex>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    session.0.tick(time.delta_secs());
    let events = session.0.drain_events();
    apply_session_events(&mut commands, &mut index, &config, &mut next_state, events);
}

/// Copy session positions onto mirror transforms.
pub fn transform_sync_system(
    session: Res<ActiveSession>,
    mut q_actors: Query<(&ActorLink, &mut Transform), Without<ProjectileLink>>,
    mut q_projectiles: Query<(&ProjectileLink, &mut Transform), Without<ActorLink>>,
) {
    for (link, mut transform) in q_actors.iter_mut() {
        if let Some(actor) = session.0.registry().get(link.0) {
            transform.translation = to_world(actor.position);
        }
    }
    for (link, mut transform) in q_projectiles.iter_mut() {
        if let Some(projectile) = session.0.projectiles().get(link.0) {
            transform.translation = to_world(projectile.position);
        }
    }
}

// ── Event mirroring ───────────────────────────────────────────────────────────

pub fn apply_session_events(
    commands: &mut Commands,
    index: &mut EntityIndex,
    config: &GameConfig,
    next_state: &mut NextState<GameState>,
    events: Vec<SessionEvent>,
) {
    for event in events {
        match event {
            SessionEvent::ActorSpawned { id, kind, position } => {
                let radius = match kind {
                    ActorKind::Enemy { strong: true, .. } => config.enemy_collider_radius * 1.25,
                    _ => config.enemy_collider_radius,
                };
                let entity = commands
                    .spawn((
                        ActorLink(id),
                        sensor_body(
                            position,
                            radius,
                            Group::GROUP_2,
                            Group::GROUP_1 | Group::GROUP_3,
                        ),
                    ))
                    .id();
                index.actors.insert(id, entity);
            }
            SessionEvent::ActorDied(notice) => {
                if notice.kind == ActorKind::Player {
                    continue;
                }
                if let Some(entity) = index.actors.remove(&notice.id) {
                    commands.entity(entity).despawn();
                }
            }
            SessionEvent::ProjectileFired {
                id,
                faction,
                position,
            } => {
                let (membership, filter) = match faction {
                    Faction::Player => (Group::GROUP_3, Group::GROUP_2),
                    Faction::Enemy => (Group::GROUP_4, Group::GROUP_1),
                };
                let entity = commands
                    .spawn((
                        ProjectileLink(id),
                        sensor_body(position, config.projectile_collider_radius, membership, filter),
                    ))
                    .id();
                index.projectiles.insert(id, entity);
            }
            SessionEvent::ProjectileRemoved(id) => {
                if let Some(entity) = index.projectiles.remove(&id) {
                    commands.entity(entity).despawn();
                }
            }
            SessionEvent::MeleeSwung { origin, radius, .. } => {
                commands.spawn(SwingFlash {
                    center: origin,
                    radius,
                    remaining: SWING_FLASH_SECS,
                });
            }
            SessionEvent::WaveStarted { wave } => info!("Wave {} started", wave),
            SessionEvent::GateOpened { grand, titles, .. } => {
                info!(
                    "{} gate: {}",
                    if grand { "Grand upgrade" } else { "Upgrade" },
                    titles.join(" / ")
                );
                next_state.set(GameState::UpgradeGate);
            }
            SessionEvent::UpgradeApplied(title) => info!("Upgrade taken: {}", title),
            SessionEvent::AchievementUnlocked(threshold) => {
                info!("Achievement unlocked: {} kills", threshold)
            }
            SessionEvent::Victory { wave } => {
                info!("Victory after wave {}", wave);
                next_state.set(GameState::Victory);
            }
            SessionEvent::Defeat { wave } => {
                info!("Defeat on wave {}", wave);
                next_state.set(GameState::Defeat);
            }
        }
    }
}

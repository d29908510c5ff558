//! Actors and the per-session actor registry.
//!
//! Every combatant (player or enemy) is an [`Actor`] stored in an
//! [`ActorRegistry`] under a monotonic [`ActorId`].  The registry is a
//! `BTreeMap`, so iteration order is spawn order and every frame resolves
//! deterministically for a given seed.

use crate::combat::bleed::Bleed;
use crate::combat::hit_window::HitWindow;
use crate::combat::knockback::MotionState;
use crate::difficulty::EnemyKind;
use crate::stats::StatBlock;
use bevy::math::Vec2;
use std::collections::BTreeMap;

/// Identity of one actor within a session.  Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Faction {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    Player,
    Enemy { kind: EnemyKind, strong: bool },
}

impl ActorKind {
    #[inline]
    pub fn faction(self) -> Faction {
        match self {
            ActorKind::Player => Faction::Player,
            ActorKind::Enemy { .. } => Faction::Enemy,
        }
    }
}

/// Shooting state of a ranged enemy.
#[derive(Debug, Clone, PartialEq)]
pub struct RangedAttack {
    pub fire_cooldown: f32,
    /// Seconds until the next shot is allowed.
    pub cooldown_remaining: f32,
    pub fire_range: f32,
    pub projectile_speed: f32,
}

impl RangedAttack {
    /// Count down; returns `true` when a shot may be fired now.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        self.cooldown_remaining <= 0.0
    }

    pub fn reset(&mut self) {
        self.cooldown_remaining = self.fire_cooldown;
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub kind: ActorKind,
    pub stats: StatBlock,
    pub position: Vec2,
    pub motion: MotionState,
    /// Player only: invulnerability window after an accepted contact hit.
    pub invulnerability: Option<HitWindow>,
    /// Enemies only: debounce between two contact attacks.
    pub contact_cooldown: Option<HitWindow>,
    pub ranged: Option<RangedAttack>,
    pub bleed: Option<Bleed>,
    /// Set once when hp first reaches zero; the actor is removed at end of frame.
    pub(crate) dead: bool,
}

impl Actor {
    pub fn player(stats: StatBlock, position: Vec2, invincible_duration: f32) -> Self {
        Self {
            kind: ActorKind::Player,
            stats,
            position,
            motion: MotionState::Normal,
            invulnerability: Some(HitWindow::new(invincible_duration)),
            contact_cooldown: None,
            ranged: None,
            bleed: None,
            dead: false,
        }
    }

    pub fn enemy(
        kind: EnemyKind,
        strong: bool,
        stats: StatBlock,
        position: Vec2,
        contact_cooldown: f32,
    ) -> Self {
        Self {
            kind: ActorKind::Enemy { kind, strong },
            stats,
            position,
            motion: MotionState::Normal,
            invulnerability: None,
            contact_cooldown: Some(HitWindow::new(contact_cooldown)),
            ranged: None,
            bleed: None,
            dead: false,
        }
    }

    pub fn with_ranged(mut self, attack: RangedAttack) -> Self {
        self.ranged = Some(attack);
        self
    }

    #[inline]
    pub fn faction(&self) -> Faction {
        self.kind.faction()
    }

    /// Alive and not already settled as dead this frame.
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.dead && self.stats.is_alive()
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.dead
    }
}

/// Ordered store of every live actor in a session.
#[derive(Debug, Clone, Default)]
pub struct ActorRegistry {
    next_id: u64,
    actors: BTreeMap<ActorId, Actor>,
}

impl ActorRegistry {
    pub fn spawn(&mut self, actor: Actor) -> ActorId {
        self.next_id += 1;
        let id = ActorId(self.next_id);
        self.actors.insert(id, actor);
        id
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.actors.iter().map(|(id, a)| (*id, a))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ActorId, &mut Actor)> {
        self.actors.iter_mut().map(|(id, a)| (*id, a))
    }

    /// Active enemies in spawn order.
    pub fn enemies(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.iter()
            .filter(|(_, a)| a.faction() == Faction::Enemy && a.is_active())
    }

    /// Ids of actors marked dead this frame.
    pub fn dead_ids(&self) -> Vec<ActorId> {
        self.iter()
            .filter(|(_, a)| a.dead)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn clear(&mut self) {
        self.actors.clear();
    }
}

//! Projectiles, melee swings and the hit-set bookkeeping they share.
//!
//! Both launch through the [`Fire`] trait.  A [`Projectile`] is spent once it
//! has damaged `pierce + 1` distinct enemies or its lifetime runs out; a
//! [`MeleeSwing`] lives for one resolution pass and damages every enemy in
//! reach at most once.

use crate::actor::{ActorId, Faction};
use bevy::math::Vec2;
use std::collections::{BTreeMap, BTreeSet};

/// Launch capability shared by every damage carrier.
pub trait Fire {
    /// (Re)arm with a heading, damage and splash radius.  Clears the hit-set.
    fn fire(&mut self, direction: Vec2, damage: i32, aoe_radius: f32);
}

// ── Hit-set ───────────────────────────────────────────────────────────────────

/// Actors already damaged by one carrier.  Each actor counts at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitSet {
    hit: BTreeSet<ActorId>,
}

impl HitSet {
    #[inline]
    pub fn contains(&self, id: ActorId) -> bool {
        self.hit.contains(&id)
    }

    /// Record `id`; returns `false` if it was already present.
    pub fn insert(&mut self, id: ActorId) -> bool {
        self.hit.insert(id)
    }

    #[inline]
    pub fn distinct(&self) -> u32 {
        self.hit.len() as u32
    }

    pub fn clear(&mut self) {
        self.hit.clear();
    }
}

// ── Projectile ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectileId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// Never damaged by its own projectile.
    pub owner: ActorId,
    /// Side that fired it; same-faction actors are ignored.
    pub faction: Faction,
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub damage: i32,
    pub aoe_radius: f32,
    /// Extra distinct enemies allowed beyond the first.
    pub pierce: u32,
    /// Seconds left before the projectile expires.
    pub lifetime: f32,
    hits: HitSet,
    spent: bool,
}

impl Projectile {
    /// Unarmed projectile; call [`Fire::fire`] before use.
    pub fn new(
        owner: ActorId,
        faction: Faction,
        position: Vec2,
        speed: f32,
        pierce: u32,
        lifetime: f32,
    ) -> Self {
        Self {
            owner,
            faction,
            position,
            direction: Vec2::X,
            speed: speed.max(0.0),
            damage: 0,
            aoe_radius: 0.0,
            pierce,
            lifetime,
            hits: HitSet::default(),
            spent: false,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.direction * self.speed
    }

    #[inline]
    pub fn has_hit(&self, id: ActorId) -> bool {
        self.hits.contains(id)
    }

    /// Record a distinct enemy hit.  Returns `false` for repeats.
    pub fn register_hit(&mut self, id: ActorId) -> bool {
        let fresh = self.hits.insert(id);
        if fresh && self.hits.distinct() >= self.pierce.saturating_add(1) {
            self.spent = true;
        }
        fresh
    }

    #[inline]
    pub fn enemies_hit(&self) -> u32 {
        self.hits.distinct()
    }

    pub fn spend(&mut self) {
        self.spent = true;
    }

    #[inline]
    pub fn is_spent(&self) -> bool {
        self.spent || self.lifetime <= 0.0
    }

    /// Integrate position and age the projectile.
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity() * dt;
        self.lifetime -= dt;
    }
}

impl Fire for Projectile {
    fn fire(&mut self, direction: Vec2, damage: i32, aoe_radius: f32) {
        self.direction = direction.try_normalize().unwrap_or(Vec2::X);
        self.damage = damage.max(0);
        self.aoe_radius = aoe_radius.max(0.0);
        self.hits.clear();
        self.spent = false;
    }
}

/// Live projectiles of one session, keyed by monotonic id.
#[derive(Debug, Clone, Default)]
pub struct ProjectileStore {
    next_id: u64,
    live: BTreeMap<ProjectileId, Projectile>,
}

impl ProjectileStore {
    pub fn insert(&mut self, projectile: Projectile) -> ProjectileId {
        self.next_id += 1;
        let id = ProjectileId(self.next_id);
        self.live.insert(id, projectile);
        id
    }

    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.live.get(&id)
    }

    pub fn get_mut(&mut self, id: ProjectileId) -> Option<&mut Projectile> {
        self.live.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProjectileId, &Projectile)> {
        self.live.iter().map(|(id, p)| (*id, p))
    }

    pub fn advance_all(&mut self, dt: f32) {
        for p in self.live.values_mut() {
            p.advance(dt);
        }
    }

    /// Drop spent projectiles and return their ids.
    pub fn remove_spent(&mut self) -> Vec<ProjectileId> {
        let spent: Vec<ProjectileId> = self
            .live
            .iter()
            .filter(|(_, p)| p.is_spent())
            .map(|(id, _)| *id)
            .collect();
        for id in &spent {
            self.live.remove(id);
        }
        spent
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}

// ── Melee swing ───────────────────────────────────────────────────────────────

/// One melee attack arc in front of the player.
#[derive(Debug, Clone, PartialEq)]
pub struct MeleeSwing {
    pub owner: ActorId,
    pub origin: Vec2,
    pub direction: Vec2,
    pub reach: f32,
    pub damage: i32,
    /// Extra radius added around the strike point.
    pub aoe_radius: f32,
    /// Knockback speed applied away from `origin`.
    pub knockback_speed: f32,
    pub bleed: bool,
    hits: HitSet,
}

impl MeleeSwing {
    pub fn new(owner: ActorId, origin: Vec2, reach: f32, knockback_speed: f32, bleed: bool) -> Self {
        Self {
            owner,
            origin,
            direction: Vec2::X,
            reach: reach.max(0.0),
            damage: 0,
            aoe_radius: 0.0,
            knockback_speed,
            bleed,
            hits: HitSet::default(),
        }
    }

    /// Centre of the swing's hit circle.
    #[inline]
    pub fn strike_point(&self) -> Vec2 {
        self.origin + self.direction * (self.reach * 0.5)
    }

    #[inline]
    pub fn hit_radius(&self) -> f32 {
        self.reach * 0.5 + self.aoe_radius
    }

    /// Record `id`; returns `false` if this swing already hit it.
    pub fn register_hit(&mut self, id: ActorId) -> bool {
        self.hits.insert(id)
    }

    /// Knockback vector for a target standing at `target`.
    pub fn knockback_for(&self, target: Vec2) -> Vec2 {
        let away = (target - self.origin).try_normalize().unwrap_or(self.direction);
        away * self.knockback_speed
    }
}

impl Fire for MeleeSwing {
    fn fire(&mut self, direction: Vec2, damage: i32, aoe_radius: f32) {
        self.direction = direction.try_normalize().unwrap_or(Vec2::X);
        self.damage = damage.max(0);
        self.aoe_radius = aoe_radius.max(0.0);
        self.hits.clear();
    }
}

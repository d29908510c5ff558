//! Hit pipeline.
//!
//! Hits reported during a frame are queued as [`HitEvent`]s and resolved in
//! arrival order by [`CombatResolver::resolve_pending`].  Every guard (hit-set
//! membership, i-frames, contact debounce, owner excusal) is evaluated against
//! the state at resolution time, so a hit that arrives after its target died
//! earlier in the same frame is skipped.
//!
//! A death is detected exactly once: the first time hp reaches zero the actor
//! is flagged and a [`DeathNotice`] is queued.  Removal from the registry is
//! left to the session at end of frame.

use super::bleed::Bleed;
use super::projectile::{MeleeSwing, ProjectileId, ProjectileStore};
use super::CollisionQuery;
use crate::actor::{Actor, ActorId, ActorKind, ActorRegistry, Faction};
use bevy::log::debug;
use bevy::math::Vec2;
use std::collections::VecDeque;

/// One overlap reported by the physics side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitEvent {
    /// An enemy body touches the player.
    Contact { attacker: ActorId, victim: ActorId },
    /// A projectile overlaps an actor.
    Projectile {
        projectile: ProjectileId,
        target: ActorId,
    },
}

/// Result of one attempted hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitOutcome {
    /// The hit passed every guard and damage was applied.
    pub applied: bool,
    /// Hit points actually removed (after clamping).
    pub damage_dealt: i32,
    /// This hit moved the target from alive to dead.
    pub target_died: bool,
}

impl HitOutcome {
    pub const REJECTED: HitOutcome = HitOutcome {
        applied: false,
        damage_dealt: 0,
        target_died: false,
    };
}

/// Emitted once per death, drained by the session at end of frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathNotice {
    pub id: ActorId,
    pub kind: ActorKind,
    pub score_value: i32,
    pub position: Vec2,
}

#[derive(Debug, Clone)]
pub struct CombatResolver {
    /// Session clock used by every time-gated guard.  Frozen while paused.
    now: f32,
    pub knockback_duration: f32,
    pub bleed_total_damage: i32,
    pub bleed_tick_interval: f32,
    pending: VecDeque<HitEvent>,
    deaths: Vec<DeathNotice>,
}

impl CombatResolver {
    pub fn new(knockback_duration: f32, bleed_total_damage: i32, bleed_tick_interval: f32) -> Self {
        Self {
            now: 0.0,
            knockback_duration,
            bleed_total_damage,
            bleed_tick_interval,
            pending: VecDeque::new(),
            deaths: Vec::new(),
        }
    }

    #[inline]
    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn advance_clock(&mut self, dt: f32) {
        self.now += dt.max(0.0);
    }

    /// Set the clock directly.  Used by scripted scenarios.
    pub fn set_clock(&mut self, now: f32) {
        self.now = now;
    }

    // ── Core damage ───────────────────────────────────────────────────────────

    /// Apply `damage` to `target`, optionally knocking it back.
    ///
    /// Dead or missing targets are skipped.  The alive → dead crossing queues
    /// exactly one [`DeathNotice`].
    pub fn apply_hit(
        &mut self,
        registry: &mut ActorRegistry,
        target: ActorId,
        damage: i32,
        knockback: Option<Vec2>,
    ) -> HitOutcome {
        match registry.get_mut(target) {
            Some(actor) => self.damage_actor(target, actor, damage, knockback),
            None => HitOutcome::REJECTED,
        }
    }

    fn damage_actor(
        &mut self,
        id: ActorId,
        actor: &mut Actor,
        damage: i32,
        knockback: Option<Vec2>,
    ) -> HitOutcome {
        if !actor.is_active() {
            return HitOutcome::REJECTED;
        }

        let dealt = actor.stats.take_damage(damage);
        if let Some(v) = knockback {
            actor.motion.knock(v, self.knockback_duration);
        }

        let died = !actor.stats.is_alive();
        if died {
            actor.dead = true;
            self.deaths.push(DeathNotice {
                id,
                kind: actor.kind,
                score_value: actor.stats.score_value,
                position: actor.position,
            });
        }

        HitOutcome {
            applied: true,
            damage_dealt: dealt,
            target_died: died,
        }
    }

    // ── Contact ───────────────────────────────────────────────────────────────

    /// Enemy body touching the player.
    ///
    /// The attacker's own debounce is checked first, then the victim's
    /// i-frames.  Only an accepted hit stamps either window.
    pub fn resolve_contact(
        &mut self,
        registry: &mut ActorRegistry,
        attacker: ActorId,
        victim: ActorId,
    ) -> HitOutcome {
        let now = self.now;

        let damage = match registry.get(attacker) {
            Some(a) if a.is_active() && a.faction() == Faction::Enemy => {
                let ready = a.contact_cooldown.as_ref().is_none_or(|w| w.accepts(now));
                if !ready {
                    return HitOutcome::REJECTED;
                }
                a.stats.contact_damage
            }
            _ => return HitOutcome::REJECTED,
        };

        let Some(target) = registry.get_mut(victim) else {
            return HitOutcome::REJECTED;
        };
        if !target.is_active() || target.faction() != Faction::Player {
            return HitOutcome::REJECTED;
        }
        if let Some(window) = target.invulnerability.as_mut() {
            if !window.try_accept(now) {
                return HitOutcome::REJECTED;
            }
        }
        let outcome = self.damage_actor(victim, target, damage, None);

        if let Some(window) = registry
            .get_mut(attacker)
            .and_then(|a| a.contact_cooldown.as_mut())
        {
            window.try_accept(now);
        }
        outcome
    }

    // ── Projectiles ───────────────────────────────────────────────────────────

    /// Projectile overlapping `target`.
    ///
    /// Player projectiles damage enemies through the hit-set, splash onto
    /// every enemy within `aoe_radius` of the impact point and spend
    /// themselves after `pierce + 1` distinct enemies.  Enemy projectiles only
    /// damage the player through its i-frames and are spent by an accepted
    /// hit.  Returns the outcome of the primary hit.
    pub fn resolve_projectile_hit(
        &mut self,
        registry: &mut ActorRegistry,
        projectiles: &mut ProjectileStore,
        query: &dyn CollisionQuery,
        projectile_id: ProjectileId,
        target: ActorId,
    ) -> HitOutcome {
        let Some(projectile) = projectiles.get_mut(projectile_id) else {
            return HitOutcome::REJECTED;
        };
        if projectile.is_spent() || projectile.owner == target {
            return HitOutcome::REJECTED;
        }
        let Some(target_actor) = registry.get_mut(target) else {
            return HitOutcome::REJECTED;
        };
        if !target_actor.is_active() || target_actor.faction() == projectile.faction {
            return HitOutcome::REJECTED;
        }

        if projectile.faction == Faction::Enemy {
            if let Some(window) = target_actor.invulnerability.as_mut() {
                if !window.try_accept(self.now) {
                    return HitOutcome::REJECTED;
                }
            }
            let outcome = self.damage_actor(target, target_actor, projectile.damage, None);
            projectile.spend();
            return outcome;
        }

        // Player projectile onto an enemy: repeats are skipped silently.
        if projectile.has_hit(target) {
            return HitOutcome::REJECTED;
        }
        projectile.register_hit(target);
        let damage = projectile.damage;
        let outcome = self.damage_actor(target, target_actor, damage, None);

        if projectile.aoe_radius > 0.0 {
            let impact = projectile.position;
            for splash in query.actors_within(impact, projectile.aoe_radius) {
                if projectile.has_hit(splash) || splash == projectile.owner {
                    continue;
                }
                let Some(actor) = registry.get_mut(splash) else {
                    continue;
                };
                if !actor.is_active() || actor.faction() != Faction::Enemy {
                    continue;
                }
                projectile.register_hit(splash);
                self.damage_actor(splash, actor, damage, None);
            }
        }

        debug!(
            "projectile {:?} hit {:?}: {} distinct, spent={}",
            projectile_id,
            target,
            projectile.enemies_hit(),
            projectile.is_spent()
        );
        outcome
    }

    // ── Melee ─────────────────────────────────────────────────────────────────

    /// Resolve one melee swing against every enemy in its hit circle.
    ///
    /// Each enemy is damaged and knocked back at most once per swing; with
    /// bleed unlocked a survivor also starts (or restarts) bleeding.
    pub fn resolve_melee_swing(
        &mut self,
        registry: &mut ActorRegistry,
        query: &dyn CollisionQuery,
        swing: &mut MeleeSwing,
    ) -> Vec<(ActorId, HitOutcome)> {
        let mut outcomes = Vec::new();
        for id in query.actors_within(swing.strike_point(), swing.hit_radius()) {
            if id == swing.owner {
                continue;
            }
            let Some(actor) = registry.get_mut(id) else {
                continue;
            };
            if !actor.is_active() || actor.faction() != Faction::Enemy {
                continue;
            }
            if !swing.register_hit(id) {
                continue;
            }
            let knockback = swing.knockback_for(actor.position);
            let outcome = self.damage_actor(id, actor, swing.damage, Some(knockback));
            if swing.bleed && !outcome.target_died {
                actor.bleed = Some(Bleed::new(self.bleed_total_damage, self.bleed_tick_interval));
            }
            outcomes.push((id, outcome));
        }
        outcomes
    }

    // ── Damage over time ──────────────────────────────────────────────────────

    /// Advance every bleed by `dt`; bleed deaths take the normal death path.
    pub fn tick_bleeds(&mut self, registry: &mut ActorRegistry, dt: f32) {
        for (id, actor) in registry.iter_mut() {
            let Some(bleed) = actor.bleed.as_mut() else {
                continue;
            };
            let due = bleed.tick(dt);
            if bleed.is_finished() {
                actor.bleed = None;
            }
            if due > 0 {
                self.damage_actor(id, actor, due, None);
            }
        }
    }

    // ── Frame queue ───────────────────────────────────────────────────────────

    pub fn queue(&mut self, event: HitEvent) {
        self.pending.push_back(event);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Resolve every queued hit in arrival order.
    pub fn resolve_pending(
        &mut self,
        registry: &mut ActorRegistry,
        projectiles: &mut ProjectileStore,
        query: &dyn CollisionQuery,
    ) -> Vec<(HitEvent, HitOutcome)> {
        let mut results = Vec::with_capacity(self.pending.len());
        while let Some(event) = self.pending.pop_front() {
            let outcome = match event {
                HitEvent::Contact { attacker, victim } => {
                    self.resolve_contact(registry, attacker, victim)
                }
                HitEvent::Projectile { projectile, target } => {
                    self.resolve_projectile_hit(registry, projectiles, query, projectile, target)
                }
            };
            results.push((event, outcome));
        }
        results
    }

    /// Take every death detected since the last drain.
    pub fn drain_deaths(&mut self) -> Vec<DeathNotice> {
        std::mem::take(&mut self.deaths)
    }

    /// Forget queued hits and deaths.  Used when a session is torn down.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.deaths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::combat::knockback::MotionState;
    use crate::combat::projectile::{Fire, Projectile};
    use crate::difficulty::EnemyKind;
    use crate::spatial_partition::SpatialGrid;
    use crate::stats::StatBlock;

    fn resolver() -> CombatResolver {
        CombatResolver::new(0.1, 2, 1.0)
    }

    fn spawn_player(reg: &mut ActorRegistry) -> ActorId {
        reg.spawn(Actor::player(StatBlock::new(10, 5.0, 0, 0), Vec2::ZERO, 0.6))
    }

    fn spawn_enemy(reg: &mut ActorRegistry, hp: i32, pos: Vec2) -> ActorId {
        reg.spawn(Actor::enemy(
            EnemyKind::Melee,
            false,
            StatBlock::new(hp, 2.0, 1, 10),
            pos,
            0.6,
        ))
    }

    fn player_shot(
        store: &mut ProjectileStore,
        owner: ActorId,
        pierce: u32,
        aoe: f32,
    ) -> ProjectileId {
        let mut p = Projectile::new(owner, Faction::Player, Vec2::ZERO, 12.0, pierce, 3.0);
        p.fire(Vec2::X, 1, aoe);
        store.insert(p)
    }

    #[test]
    fn overkill_clamps_and_dies_once() {
        let mut reg = ActorRegistry::default();
        let mut r = resolver();
        let e = spawn_enemy(&mut reg, 2, Vec2::ZERO);

        let first = r.apply_hit(&mut reg, e, 99, None);
        assert!(first.applied && first.target_died);
        assert_eq!(first.damage_dealt, 2);
        assert_eq!(reg.get(e).map(|a| a.stats.hp), Some(0));

        let second = r.apply_hit(&mut reg, e, 1, None);
        assert_eq!(second, HitOutcome::REJECTED);
        assert_eq!(r.drain_deaths().len(), 1);
    }

    #[test]
    fn pierce_zero_damages_exactly_one_enemy() {
        let mut reg = ActorRegistry::default();
        let mut store = ProjectileStore::default();
        let mut r = resolver();
        let p = spawn_player(&mut reg);
        let a = spawn_enemy(&mut reg, 5, Vec2::new(1.0, 0.0));
        let b = spawn_enemy(&mut reg, 5, Vec2::new(1.2, 0.0));
        let shot = player_shot(&mut store, p, 0, 0.0);
        let grid = SpatialGrid::from_registry(&reg);

        assert!(r.resolve_projectile_hit(&mut reg, &mut store, &grid, shot, a).applied);
        assert!(!r.resolve_projectile_hit(&mut reg, &mut store, &grid, shot, b).applied);
        assert_eq!(reg.get(a).map(|x| x.stats.hp), Some(4));
        assert_eq!(reg.get(b).map(|x| x.stats.hp), Some(5));
    }

    #[test]
    fn pierce_two_damages_up_to_three_enemies() {
        let mut reg = ActorRegistry::default();
        let mut store = ProjectileStore::default();
        let mut r = resolver();
        let p = spawn_player(&mut reg);
        let enemies: Vec<ActorId> = (0..4)
            .map(|i| spawn_enemy(&mut reg, 5, Vec2::new(2.0 + i as f32 * 3.0, 0.0)))
            .collect();
        let shot = player_shot(&mut store, p, 2, 0.0);
        let grid = SpatialGrid::from_registry(&reg);

        let applied = enemies
            .iter()
            .filter(|&&e| r.resolve_projectile_hit(&mut reg, &mut store, &grid, shot, e).applied)
            .count();
        assert_eq!(applied, 3);
        assert_eq!(reg.get(enemies[3]).map(|x| x.stats.hp), Some(5));
    }

    #[test]
    fn duplicate_hit_changes_nothing() {
        let mut reg = ActorRegistry::default();
        let mut store = ProjectileStore::default();
        let mut r = resolver();
        let p = spawn_player(&mut reg);
        let a = spawn_enemy(&mut reg, 5, Vec2::new(1.0, 0.0));
        let shot = player_shot(&mut store, p, 3, 0.0);
        let grid = SpatialGrid::from_registry(&reg);

        r.resolve_projectile_hit(&mut reg, &mut store, &grid, shot, a);
        let repeat = r.resolve_projectile_hit(&mut reg, &mut store, &grid, shot, a);
        assert_eq!(repeat, HitOutcome::REJECTED);
        assert_eq!(reg.get(a).map(|x| x.stats.hp), Some(4));
        assert_eq!(store.get(shot).map(|s| s.enemies_hit()), Some(1));
    }

    #[test]
    fn splash_damages_neighbours_and_counts_toward_pierce() {
        let mut reg = ActorRegistry::default();
        let mut store = ProjectileStore::default();
        let mut r = resolver();
        let p = spawn_player(&mut reg);
        let a = spawn_enemy(&mut reg, 5, Vec2::new(0.2, 0.0));
        let b = spawn_enemy(&mut reg, 5, Vec2::new(0.0, 0.5));
        let far = spawn_enemy(&mut reg, 5, Vec2::new(6.0, 0.0));
        let shot = player_shot(&mut store, p, 0, 1.0);
        let grid = SpatialGrid::from_registry(&reg);

        r.resolve_projectile_hit(&mut reg, &mut store, &grid, shot, a);
        assert_eq!(reg.get(a).map(|x| x.stats.hp), Some(4));
        assert_eq!(reg.get(b).map(|x| x.stats.hp), Some(4));
        assert_eq!(reg.get(far).map(|x| x.stats.hp), Some(5));
        // The owner sits inside the splash but is never hit.
        assert_eq!(reg.get(p).map(|x| x.stats.hp), Some(10));
        assert!(store.get(shot).is_some_and(|s| s.is_spent()));
    }

    #[test]
    fn contact_respects_iframes_boundary() {
        let mut reg = ActorRegistry::default();
        let mut r = resolver();
        let player = spawn_player(&mut reg);
        let e1 = spawn_enemy(&mut reg, 3, Vec2::ZERO);
        let e2 = spawn_enemy(&mut reg, 3, Vec2::ZERO);

        assert!(r.resolve_contact(&mut reg, e1, player).applied);
        r.set_clock(0.3);
        assert!(!r.resolve_contact(&mut reg, e2, player).applied);
        r.set_clock(0.6);
        assert!(r.resolve_contact(&mut reg, e2, player).applied);
        assert_eq!(reg.get(player).map(|x| x.stats.hp), Some(8));
    }

    #[test]
    fn enemy_contact_cooldown_debounces_attacker() {
        let mut reg = ActorRegistry::default();
        let mut r = resolver();
        let player = spawn_player(&mut reg);
        if let Some(p) = reg.get_mut(player) {
            p.invulnerability = None;
        }
        let e = spawn_enemy(&mut reg, 3, Vec2::ZERO);

        assert!(r.resolve_contact(&mut reg, e, player).applied);
        r.set_clock(0.5);
        assert!(!r.resolve_contact(&mut reg, e, player).applied);
        r.set_clock(0.75);
        assert!(r.resolve_contact(&mut reg, e, player).applied);
    }

    #[test]
    fn enemy_projectile_is_spent_by_accepted_hit_only() {
        let mut reg = ActorRegistry::default();
        let mut store = ProjectileStore::default();
        let mut r = resolver();
        let player = spawn_player(&mut reg);
        let shooter = spawn_enemy(&mut reg, 3, Vec2::new(4.0, 0.0));
        let other = spawn_enemy(&mut reg, 3, Vec2::new(2.0, 0.0));
        let grid = SpatialGrid::from_registry(&reg);

        let mut bolt = Projectile::new(shooter, Faction::Enemy, Vec2::ZERO, 10.0, 0, 3.0);
        bolt.fire(Vec2::NEG_X, 1, 0.0);
        let bolt = store.insert(bolt);

        // Passes through other enemies untouched.
        assert!(!r.resolve_projectile_hit(&mut reg, &mut store, &grid, bolt, other).applied);
        assert!(r.resolve_projectile_hit(&mut reg, &mut store, &grid, bolt, player).applied);
        assert!(store.get(bolt).is_some_and(|b| b.is_spent()));
        assert_eq!(reg.get(player).map(|x| x.stats.hp), Some(9));
    }

    #[test]
    fn queued_hits_skip_targets_killed_earlier_in_frame() {
        let mut reg = ActorRegistry::default();
        let mut store = ProjectileStore::default();
        let mut r = resolver();
        let p = spawn_player(&mut reg);
        let e = spawn_enemy(&mut reg, 1, Vec2::new(1.0, 0.0));
        let s1 = player_shot(&mut store, p, 0, 0.0);
        let s2 = player_shot(&mut store, p, 0, 0.0);
        let grid = SpatialGrid::from_registry(&reg);

        r.queue(HitEvent::Projectile { projectile: s1, target: e });
        r.queue(HitEvent::Projectile { projectile: s2, target: e });
        let results = r.resolve_pending(&mut reg, &mut store, &grid);

        assert!(results[0].1.target_died);
        assert_eq!(results[1].1, HitOutcome::REJECTED);
        // The second projectile was not consumed by a dead target.
        assert!(store.get(s2).is_some_and(|s| !s.is_spent()));
        assert_eq!(r.drain_deaths().len(), 1);
    }

    #[test]
    fn melee_swing_knocks_back_and_bleeds() {
        let mut reg = ActorRegistry::default();
        let mut r = resolver();
        let p = spawn_player(&mut reg);
        let e = spawn_enemy(&mut reg, 5, Vec2::new(0.8, 0.0));
        let grid = SpatialGrid::from_registry(&reg);

        let mut swing = MeleeSwing::new(p, Vec2::ZERO, 1.2, 6.0, true);
        swing.fire(Vec2::X, 1, 0.0);
        let hits = r.resolve_melee_swing(&mut reg, &grid, &mut swing);
        assert_eq!(hits.len(), 1);
        // Same swing resolved again hits nobody new.
        assert!(r.resolve_melee_swing(&mut reg, &grid, &mut swing).is_empty());

        let actor = reg.get(e).cloned();
        let actor = actor.as_ref();
        assert_eq!(actor.map(|a| a.stats.hp), Some(4));
        assert!(actor.is_some_and(|a| matches!(a.motion, MotionState::KnockedBack { .. })));
        assert!(actor.is_some_and(|a| a.bleed.is_some()));

        r.tick_bleeds(&mut reg, 1.0);
        r.tick_bleeds(&mut reg, 1.0);
        assert_eq!(reg.get(e).map(|a| a.stats.hp), Some(2));
        assert!(reg.get(e).is_some_and(|a| a.bleed.is_none()));
    }

    #[test]
    fn bleed_death_is_reported_once() {
        let mut reg = ActorRegistry::default();
        let mut r = resolver();
        let e = spawn_enemy(&mut reg, 1, Vec2::ZERO);
        if let Some(a) = reg.get_mut(e) {
            a.bleed = Some(Bleed::new(2, 1.0));
        }
        r.tick_bleeds(&mut reg, 5.0);
        assert_eq!(r.drain_deaths().len(), 1);
        assert!(reg.get(e).is_some_and(|a| a.is_dead()));
    }
}

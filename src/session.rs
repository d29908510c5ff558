//! One combat session: the owner of every combat component.
//!
//! A [`CombatSession`] is built when combat starts and dropped when it ends.
//! It owns the actor registry, projectiles, resolver, scheduler, upgrade
//! selector, achievement ledger, flag store, player loadout, score and a
//! seeded RNG.  Nothing here is global.
//!
//! ## Frame order
//!
//! [`CombatSession::tick`] runs, in order:
//!
//! 1. clock advance (skipped while the gate is open or the run is over)
//! 2. queued hits, in arrival order
//! 3. bleed ticks
//! 4. player attacks (auto-fire volley or melee swing)
//! 5. enemy movement, knockback and ranged fire
//! 6. projectile flight
//! 7. death settlement: score, kills, achievements, scheduler notices,
//!    removal of the dead
//! 8. scheduler tick and its spawn/gate commands
//!
//! Everything the presentation layer needs to mirror is reported as a
//! [`SessionEvent`], drained once per frame.

use crate::achievement::{apply_claimed_rewards, AchievementLedger, ClaimOutcome, Reward};
use crate::actor::{Actor, ActorId, ActorKind, ActorRegistry, Faction, RangedAttack};
use crate::combat::{
    CombatResolver, DeathNotice, Fire, HitEvent, MeleeSwing, Projectile, ProjectileId,
    ProjectileStore,
};
use crate::config::GameConfig;
use crate::constants::KILL_THRESHOLDS;
use crate::difficulty::{CombatMode, CombatStyle, DifficultyProfile, DifficultyTier, EnemyKind};
use crate::error::{CoreError, CoreResult};
use crate::flags::{FlagStore, SELECTED_COMBAT, SELECTED_DIFFICULTY};
use crate::spatial_partition::SpatialGrid;
use crate::stats::StatBlock;
use crate::upgrade::{GateToken, OpenGate, PlayerLoadout, UpgradeOffer, UpgradeSelector};
use crate::wave::{
    roll_enemy_kind, SpawnPlacer, StaticSpawnPoints, WaveCommand, WavePacing, WavePhase,
    WaveScheduler,
};
use bevy::log::{info, warn};
use bevy::math::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// What the presentation layer must mirror after a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ActorSpawned {
        id: ActorId,
        kind: ActorKind,
        position: Vec2,
    },
    ActorDied(DeathNotice),
    ProjectileFired {
        id: ProjectileId,
        faction: Faction,
        position: Vec2,
    },
    ProjectileRemoved(ProjectileId),
    MeleeSwung {
        origin: Vec2,
        direction: Vec2,
        radius: f32,
    },
    WaveStarted {
        wave: u32,
    },
    GateOpened {
        token: GateToken,
        grand: bool,
        titles: Vec<&'static str>,
    },
    UpgradeApplied(&'static str),
    AchievementUnlocked(u32),
    Victory {
        wave: u32,
    },
    Defeat {
        wave: u32,
    },
}

/// Inputs read from the flag store when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSelection {
    pub tier: DifficultyTier,
    pub style: CombatStyle,
}

impl SessionSelection {
    /// Decode `SelectedDifficulty` and `SelectedCombat`.
    ///
    /// A missing build selection falls back to ranged with a warning.
    pub fn from_flags(store: &dyn FlagStore) -> CoreResult<Self> {
        let tier = DifficultyTier::from_index(store.get_int(SELECTED_DIFFICULTY, 0))?;
        let style = match CombatStyle::from_flag(store.get_int(SELECTED_COMBAT, -1))? {
            Some(style) => style,
            None => {
                warn!("No combat style selected; defaulting to ranged");
                CombatStyle::Ranged
            }
        };
        Ok(Self { tier, style })
    }
}

pub struct CombatSession {
    config: GameConfig,
    profile: DifficultyProfile,
    registry: ActorRegistry,
    projectiles: ProjectileStore,
    resolver: CombatResolver,
    scheduler: WaveScheduler,
    selector: UpgradeSelector,
    ledger: AchievementLedger,
    store: Box<dyn FlagStore + Send + Sync>,
    spawn_points: StaticSpawnPoints,
    placer: SpawnPlacer,
    grid: SpatialGrid,
    rng: StdRng,
    loadout: PlayerLoadout,
    player: ActorId,
    score: i32,
    fire_cooldown: f32,
    aim: Vec2,
    events: Vec<SessionEvent>,
}

impl CombatSession {
    /// Build a session from explicit selections.  Claimed rewards are applied.
    pub fn new(
        config: GameConfig,
        selection: SessionSelection,
        store: Box<dyn FlagStore + Send + Sync>,
        seed: u64,
    ) -> Self {
        let profile = DifficultyProfile::from_config(selection.tier, &config);
        let mut registry = ActorRegistry::default();

        let mut loadout = PlayerLoadout::from_config(selection.style, &config);
        let mut player_stats =
            StatBlock::new(config.player_max_hp, config.player_move_speed, 0, 0);
        let rewards = apply_claimed_rewards(store.as_ref(), &mut loadout, &mut player_stats);
        if !rewards.is_empty() {
            info!("Applied {} claimed reward(s)", rewards.len());
        }
        let player = registry.spawn(Actor::player(
            player_stats,
            Vec2::ZERO,
            config.player_invincible_duration,
        ));

        let ledger = AchievementLedger::load(store.as_ref(), &KILL_THRESHOLDS);

        Self {
            resolver: CombatResolver::new(
                config.knockback_duration,
                config.bleed_total_damage,
                config.bleed_tick_interval,
            ),
            scheduler: WaveScheduler::new(WavePacing::from_config(&config)),
            selector: UpgradeSelector::for_style(selection.style, config.upgrade_offer_count),
            spawn_points: StaticSpawnPoints::from_config(&config),
            placer: SpawnPlacer::from_config(&config),
            grid: SpatialGrid::default(),
            rng: StdRng::seed_from_u64(seed),
            projectiles: ProjectileStore::default(),
            fire_cooldown: 0.0,
            aim: Vec2::X,
            events: Vec::new(),
            score: 0,
            config,
            profile,
            registry,
            ledger,
            store,
            loadout,
            player,
        }
    }

    /// Build a session from the selections persisted in `store`.
    pub fn from_flags(
        config: GameConfig,
        store: Box<dyn FlagStore + Send + Sync>,
        seed: u64,
    ) -> CoreResult<Self> {
        let selection = SessionSelection::from_flags(store.as_ref())?;
        Ok(Self::new(config, selection, store, seed))
    }

    /// Enter wave 1 (or Endless) and emit its first commands.
    pub fn start(&mut self) {
        self.scheduler.request_combat_selection();
        self.scheduler.begin(&self.profile);
        self.process_commands();
    }

    /// Tear down mid-combat: timers and the gate token become stale.
    pub fn cancel(&mut self) {
        self.scheduler.cancel();
        self.selector.cancel();
        self.resolver.reset();
        if let Err(e) = self.store.flush() {
            warn!("Failed to flush flags on exit: {}", e);
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ActorRegistry {
        &mut self.registry
    }

    pub fn projectiles(&self) -> &ProjectileStore {
        &self.projectiles
    }

    pub fn projectiles_mut(&mut self) -> &mut ProjectileStore {
        &mut self.projectiles
    }

    pub fn resolver(&self) -> &CombatResolver {
        &self.resolver
    }

    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    pub fn selector(&self) -> &UpgradeSelector {
        &self.selector
    }

    pub fn ledger(&self) -> &AchievementLedger {
        &self.ledger
    }

    pub fn store(&self) -> &dyn FlagStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut (dyn FlagStore + Send + Sync) {
        self.store.as_mut()
    }

    /// Hand the flag store back when the session is dropped.
    pub fn into_store(self) -> Box<dyn FlagStore + Send + Sync> {
        self.store
    }

    pub fn loadout(&self) -> &PlayerLoadout {
        &self.loadout
    }

    pub fn player_id(&self) -> ActorId {
        self.player
    }

    pub fn player(&self) -> Option<&Actor> {
        self.registry.get(self.player)
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn phase(&self) -> WavePhase {
        self.scheduler.phase()
    }

    pub fn open_gate(&self) -> Option<&OpenGate> {
        self.selector.gate()
    }

    // ── Inputs ────────────────────────────────────────────────────────────────

    /// Player position from the movement layer.
    pub fn set_player_position(&mut self, position: Vec2) {
        if let Some(p) = self.registry.get_mut(self.player) {
            p.position = position;
        }
    }

    /// Camera centre; edge spawns project from the view around it.
    pub fn set_view_center(&mut self, center: Vec2) {
        self.spawn_points.view_center = center;
    }

    /// Fallback aim used when no enemy is in range.
    pub fn set_aim(&mut self, direction: Vec2) {
        if let Some(d) = direction.try_normalize() {
            self.aim = d;
        }
    }

    /// Queue an overlap reported by physics for the next resolution pass.
    pub fn report_hit(&mut self, event: HitEvent) {
        self.resolver.queue(event);
    }

    /// Pick offer `index` of the gate opened under `token`, then resume.
    pub fn choose_upgrade(&mut self, token: GateToken, index: usize) -> CoreResult<UpgradeOffer> {
        if self.scheduler.gate_token() != Some(token) {
            return Err(CoreError::StaleGate {
                token: token.0,
                current: self.scheduler.gate_token().map_or(0, |t| t.0),
            });
        }
        let player = self.player;
        let stats = &mut self
            .registry
            .get_mut(player)
            .ok_or(CoreError::MissingActor {
                id: player.0,
                context: "choose_upgrade",
            })?
            .stats;
        let offer = self.selector.choose(token, index, &mut self.loadout, stats)?;
        self.events.push(SessionEvent::UpgradeApplied(offer.title));
        self.scheduler.resume_after_gate(token, &self.profile)?;
        self.process_commands();
        Ok(offer)
    }

    /// Claim a reward for future sessions.
    pub fn claim_reward(&mut self, reward: Reward) -> ClaimOutcome {
        reward.claim(self.store.as_mut())
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Frame ─────────────────────────────────────────────────────────────────

    pub fn tick(&mut self, dt: f32) {
        if !self.scheduler.is_running() {
            return;
        }
        let dt = dt.max(0.0);
        self.resolver.advance_clock(dt);

        self.grid.rebuild(&self.registry);
        self.resolver
            .resolve_pending(&mut self.registry, &mut self.projectiles, &self.grid);
        self.resolver.tick_bleeds(&mut self.registry, dt);
        self.grid.rebuild(&self.registry);

        self.player_attack(dt);
        self.move_enemies(dt);
        self.projectiles.advance_all(dt);

        self.settle_deaths();
        if !self.scheduler.is_running() {
            return;
        }
        self.scheduler.tick(dt, &self.profile);
        self.process_commands();
    }

    fn player_attack(&mut self, dt: f32) {
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        if self.fire_cooldown > 0.0 {
            return;
        }
        let Some(player) = self.registry.get(self.player).filter(|p| p.is_active()) else {
            return;
        };
        let origin = player.position;

        match self.loadout.style {
            CombatStyle::Ranged => {
                let weapon = &self.loadout.weapon;
                if weapon.fire_rate() <= 0.0 {
                    return;
                }
                let Some((_, target)) =
                    self.grid
                        .nearest(Faction::Enemy, origin, self.config.auto_fire_detect_radius)
                else {
                    return;
                };
                let aim = (target - origin).try_normalize().unwrap_or(self.aim);
                self.fire_volley(origin, aim);
                self.fire_cooldown = self.loadout.weapon.fire_interval;
            }
            CombatStyle::Melee => {
                let melee = self.loadout.melee.clone();
                let Some((_, target)) =
                    self.grid
                        .nearest(Faction::Enemy, origin, melee.reach + melee.aoe_radius)
                else {
                    return;
                };
                let aim = (target - origin).try_normalize().unwrap_or(self.aim);
                let mut swing =
                    MeleeSwing::new(self.player, origin, melee.reach, melee.knockback(), melee.bleed);
                swing.fire(aim, melee.damage, melee.aoe_radius);
                self.resolver
                    .resolve_melee_swing(&mut self.registry, &self.grid, &mut swing);
                self.events.push(SessionEvent::MeleeSwung {
                    origin: swing.strike_point(),
                    direction: aim,
                    radius: swing.hit_radius(),
                });
                self.fire_cooldown = melee.swing_interval;
            }
        }
    }

    /// One auto-fire volley fanned around `aim`.
    fn fire_volley(&mut self, origin: Vec2, aim: Vec2) {
        let weapon = self.loadout.weapon.clone();
        let count = weapon.projectile_count.max(1);
        let spread = weapon.spread_degrees.to_radians();
        let first = -spread * (count - 1) as f32 / 2.0;
        for i in 0..count {
            let direction = Vec2::from_angle(first + spread * i as f32).rotate(aim);
            let mut projectile = Projectile::new(
                self.player,
                Faction::Player,
                origin,
                weapon.projectile_speed,
                weapon.pierce,
                weapon.projectile_lifetime,
            );
            projectile.fire(direction, weapon.damage, weapon.aoe_radius);
            let id = self.projectiles.insert(projectile);
            self.events.push(SessionEvent::ProjectileFired {
                id,
                faction: Faction::Player,
                position: origin,
            });
        }
    }

    fn move_enemies(&mut self, dt: f32) {
        let Some(target) = self.player().filter(|p| p.is_active()).map(|p| p.position) else {
            return;
        };
        let mut shots = Vec::new();

        for (id, actor) in self.registry.iter_mut() {
            if actor.faction() != Faction::Enemy || !actor.is_active() {
                continue;
            }
            if let Some(velocity) = actor.motion.step(dt) {
                actor.position += velocity * dt;
                continue;
            }
            let to_player = target - actor.position;
            let distance = to_player.length();
            let direction = to_player.try_normalize().unwrap_or(Vec2::ZERO);

            match actor.ranged.as_mut() {
                Some(attack) => {
                    let ready = attack.tick(dt);
                    if distance > attack.fire_range {
                        actor.position += direction * actor.stats.move_speed * dt;
                    } else if ready && direction != Vec2::ZERO {
                        attack.reset();
                        shots.push((
                            id,
                            actor.position,
                            direction,
                            attack.projectile_speed,
                            actor.stats.contact_damage,
                        ));
                    }
                }
                None => actor.position += direction * actor.stats.move_speed * dt,
            }
        }

        for (owner, position, direction, speed, damage) in shots {
            let mut bolt = Projectile::new(
                owner,
                Faction::Enemy,
                position,
                speed,
                0,
                self.config.projectile_lifetime,
            );
            bolt.fire(direction, damage, 0.0);
            let id = self.projectiles.insert(bolt);
            self.events.push(SessionEvent::ProjectileFired {
                id,
                faction: Faction::Enemy,
                position,
            });
        }
    }

    /// End of frame: account every death once, then drop the dead.
    fn settle_deaths(&mut self) {
        for notice in self.resolver.drain_deaths() {
            match notice.kind {
                ActorKind::Player => self.scheduler.on_player_died(),
                ActorKind::Enemy { .. } => {
                    self.score += notice.score_value;
                    for threshold in self.ledger.record_kill(self.store.as_mut()) {
                        self.events.push(SessionEvent::AchievementUnlocked(threshold));
                    }
                    self.scheduler.on_enemy_died();
                }
            }
            self.events.push(SessionEvent::ActorDied(notice));
        }

        for id in self.registry.dead_ids() {
            if id != self.player {
                self.registry.remove(id);
            }
        }
        for id in self.projectiles.remove_spent() {
            self.events.push(SessionEvent::ProjectileRemoved(id));
        }

        // Commands queued by death notices (gate, victory, defeat).
        self.process_commands();
    }

    // ── Scheduler commands ────────────────────────────────────────────────────

    fn process_commands(&mut self) {
        for command in self.scheduler.drain_commands() {
            match command {
                WaveCommand::WaveStarted { wave } => {
                    self.events.push(SessionEvent::WaveStarted { wave });
                }
                WaveCommand::SpawnBatch {
                    wave,
                    count,
                    strong,
                } => self.spawn_batch(wave, count, strong),
                WaveCommand::OpenGate { token, grand, .. } => self.open_upgrade_gate(token, grand),
                WaveCommand::Victory { wave } => {
                    self.finish();
                    self.events.push(SessionEvent::Victory { wave });
                }
                WaveCommand::Defeat { wave } => {
                    self.finish();
                    self.events.push(SessionEvent::Defeat { wave });
                }
            }
        }
    }

    fn spawn_batch(&mut self, wave: u32, count: u32, strong: bool) {
        self.grid.rebuild(&self.registry);
        for _ in 0..count {
            let kind = roll_enemy_kind(self.config.ranged_enemy_chance, &mut self.rng);
            let stats = self.profile.scaled_stats(wave, strong);
            let position = self
                .placer
                .place(&self.spawn_points, &self.grid, &mut self.rng);

            let mut actor = Actor::enemy(
                kind,
                strong,
                stats,
                position,
                self.config.enemy_contact_cooldown,
            );
            if kind == EnemyKind::Ranged {
                actor = actor.with_ranged(RangedAttack {
                    fire_cooldown: self.config.ranged_fire_cooldown,
                    cooldown_remaining: self.config.ranged_fire_cooldown,
                    fire_range: self.config.ranged_fire_range,
                    projectile_speed: self.config.ranged_projectile_speed,
                });
            }
            let actor_kind = actor.kind;
            let id = self.registry.spawn(actor);
            self.grid.insert(id, position, Faction::Enemy);
            self.events.push(SessionEvent::ActorSpawned {
                id,
                kind: actor_kind,
                position,
            });
        }
    }

    fn open_upgrade_gate(&mut self, token: GateToken, grand: bool) {
        match self.selector.open_gate(token, grand, &mut self.rng) {
            Ok(gate) => {
                let titles = gate.offers.iter().map(|o| o.title).collect();
                self.events.push(SessionEvent::GateOpened {
                    token,
                    grand,
                    titles,
                });
            }
            Err(e) => {
                warn!("Upgrade gate unavailable ({}); continuing automatically", e);
                if let Err(e) = self.scheduler.gate_unavailable(token) {
                    warn!("Dropping gate fallback: {}", e);
                }
            }
        }
    }

    fn finish(&mut self) {
        self.selector.cancel();
        if let Err(e) = self.store.flush() {
            warn!("Failed to flush flags: {}", e);
        }
    }

    /// Endless mode never wins.
    pub fn is_endless(&self) -> bool {
        self.scheduler.mode() == CombatMode::Endless
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::MemoryFlagStore;

    fn session(tier: DifficultyTier, style: CombatStyle) -> CombatSession {
        CombatSession::new(
            GameConfig::default(),
            SessionSelection { tier, style },
            Box::new(MemoryFlagStore::new()),
            42,
        )
    }

    #[test]
    fn start_spawns_first_batch() {
        let mut s = session(DifficultyTier::Easy, CombatStyle::Ranged);
        s.start();
        let spawned = s
            .drain_events()
            .iter()
            .filter(|e| matches!(e, SessionEvent::ActorSpawned { .. }))
            .count() as u32;
        assert_eq!(spawned, s.profile().per_batch(1));
        assert_eq!(s.scheduler().alive(), spawned);
    }

    #[test]
    fn selection_decodes_flags() {
        let mut store = MemoryFlagStore::new();
        store.set_int(SELECTED_DIFFICULTY, 2);
        store.set_int(SELECTED_COMBAT, 0);
        let sel = SessionSelection::from_flags(&store).expect("valid flags");
        assert_eq!(sel.tier, DifficultyTier::Hard);
        assert_eq!(sel.style, CombatStyle::Melee);

        store.set_int(SELECTED_DIFFICULTY, 9);
        assert!(SessionSelection::from_flags(&store).is_err());
    }

    #[test]
    fn ticks_are_ignored_before_start() {
        let mut s = session(DifficultyTier::Easy, CombatStyle::Ranged);
        s.tick(1.0);
        assert_eq!(s.resolver().now(), 0.0);
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn claimed_rewards_shape_the_loadout() {
        let mut store = MemoryFlagStore::new();
        store.set_int(Reward::PlusPower.key(), 1);
        let s = CombatSession::new(
            GameConfig::default(),
            SessionSelection {
                tier: DifficultyTier::Easy,
                style: CombatStyle::Ranged,
            },
            Box::new(store),
            1,
        );
        assert_eq!(
            s.loadout().weapon.damage,
            GameConfig::default().weapon_base_damage + 1
        );
    }
}

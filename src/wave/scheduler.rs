//! Wave director state machine.
//!
//! ```text
//! Idle → CombatSelectionPending → Spawning → AwaitingClear
//!      → (UpgradeGate | AutoContinue → Spawning)* → Victory | Defeat
//! ```
//!
//! In Wave mode a wave spawns its main batch at once and its strong sub-batch
//! after a fixed delay.  Clear detection only arms once every sub-batch is
//! out.  A cleared wave either wins the game or opens the upgrade gate, and
//! the next wave only starts when the gate token comes back.
//!
//! In Endless mode batches spawn on a timer, escalating every few batches.
//! Reaching the kill threshold opens a regular gate; each gate raises the
//! threshold.  Endless has no victory.
//!
//! The scheduler never spawns anything itself: it queues [`WaveCommand`]s that
//! the session drains and carries out.

use crate::config::GameConfig;
use crate::difficulty::{CombatMode, DifficultyProfile};
use crate::error::{CoreError, CoreResult};
use crate::upgrade::GateToken;
use bevy::log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavePhase {
    #[default]
    Idle,
    CombatSelectionPending,
    Spawning,
    AwaitingClear,
    UpgradeGate,
    /// No gate could be shown; the next wave starts after a fixed delay.
    AutoContinue,
    Victory,
    Defeat,
}

/// Work the session must carry out on the scheduler's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveCommand {
    WaveStarted { wave: u32 },
    SpawnBatch { wave: u32, count: u32, strong: bool },
    OpenGate { token: GateToken, wave: u32, grand: bool },
    Victory { wave: u32 },
    Defeat { wave: u32 },
}

/// Timing knobs, copied out of [`GameConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct WavePacing {
    pub strong_batch_delay: f32,
    pub auto_continue_delay: f32,
    pub grand_every: u32,
    pub endless_spawn_interval: f32,
    pub endless_kills_per_upgrade: u32,
    pub endless_kills_growth: u32,
    pub endless_batches_per_step: u32,
}

impl WavePacing {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            strong_batch_delay: config.strong_batch_delay,
            auto_continue_delay: config.auto_continue_delay,
            grand_every: config.grand_upgrade_every,
            endless_spawn_interval: config.endless_spawn_interval,
            endless_kills_per_upgrade: config.endless_kills_per_upgrade,
            endless_kills_growth: config.endless_kills_per_upgrade_growth,
            endless_batches_per_step: config.endless_batches_per_step,
        }
    }

    /// Every `grand_every`-th wave opens a grand gate.
    #[inline]
    pub fn is_grand(&self, wave: u32) -> bool {
        self.grand_every > 0 && wave % self.grand_every == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingBatch {
    wave: u32,
    count: u32,
    remaining: f32,
}

#[derive(Debug, Clone)]
pub struct WaveScheduler {
    phase: WavePhase,
    mode: CombatMode,
    /// Wave index in Wave mode, escalation step in Endless.
    wave: u32,
    max_waves: Option<u32>,
    alive: u32,
    strong_pending: Option<PendingBatch>,
    auto_continue_remaining: f32,
    gate: Option<GateToken>,
    next_token: u64,
    // Endless
    spawn_timer: f32,
    batches_this_step: u32,
    kills_since_upgrade: u32,
    kill_threshold: u32,
    pacing: WavePacing,
    commands: Vec<WaveCommand>,
}

impl WaveScheduler {
    pub fn new(pacing: WavePacing) -> Self {
        Self {
            phase: WavePhase::Idle,
            mode: CombatMode::Wave,
            wave: 0,
            max_waves: None,
            alive: 0,
            strong_pending: None,
            auto_continue_remaining: 0.0,
            gate: None,
            next_token: 0,
            spawn_timer: 0.0,
            batches_this_step: 0,
            kills_since_upgrade: 0,
            kill_threshold: pacing.endless_kills_per_upgrade,
            pacing,
            commands: Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn mode(&self) -> CombatMode {
        self.mode
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn max_waves(&self) -> Option<u32> {
        self.max_waves
    }

    pub fn alive(&self) -> u32 {
        self.alive
    }

    pub fn gate_token(&self) -> Option<GateToken> {
        self.gate
    }

    pub fn kills_since_upgrade(&self) -> u32 {
        self.kills_since_upgrade
    }

    pub fn kill_threshold(&self) -> u32 {
        self.kill_threshold
    }

    pub fn pacing(&self) -> &WavePacing {
        &self.pacing
    }

    /// Combat is live and the simulation clock should run.
    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            WavePhase::Spawning | WavePhase::AwaitingClear | WavePhase::AutoContinue
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, WavePhase::Victory | WavePhase::Defeat)
    }

    pub fn drain_commands(&mut self) -> Vec<WaveCommand> {
        std::mem::take(&mut self.commands)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Waiting for the player to pick a build.
    pub fn request_combat_selection(&mut self) {
        if self.phase == WavePhase::Idle {
            self.phase = WavePhase::CombatSelectionPending;
        }
    }

    /// Enter combat at wave 1 with `profile`'s mode.
    pub fn begin(&mut self, profile: &DifficultyProfile) {
        self.cancel();
        self.mode = profile.mode();
        self.max_waves = profile.max_waves();
        self.wave = 1;
        info!(
            "Combat begins: {} ({:?}), max waves {:?}",
            profile.tier.label(),
            self.mode,
            self.max_waves
        );
        match self.mode {
            CombatMode::Wave => self.start_wave(profile),
            CombatMode::Endless => {
                self.kill_threshold = self.pacing.endless_kills_per_upgrade.max(1);
                self.phase = WavePhase::Spawning;
                self.spawn_timer = 0.0;
                self.commands.push(WaveCommand::WaveStarted { wave: self.wave });
            }
        }
    }

    /// Abandon combat: pending timers and the gate token are invalidated.
    pub fn cancel(&mut self) {
        self.phase = WavePhase::Idle;
        self.alive = 0;
        self.strong_pending = None;
        self.auto_continue_remaining = 0.0;
        self.gate = None;
        self.spawn_timer = 0.0;
        self.batches_this_step = 0;
        self.kills_since_upgrade = 0;
        self.commands.clear();
    }

    // ── Per-frame ─────────────────────────────────────────────────────────────

    pub fn tick(&mut self, dt: f32, profile: &DifficultyProfile) {
        match (self.phase, self.mode) {
            (WavePhase::Spawning, CombatMode::Wave) => {
                if self.strong_pending.is_some() && !self.tick_strong_pending(dt) {
                    return;
                }
                self.phase = WavePhase::AwaitingClear;
                self.check_clear();
            }
            (WavePhase::Spawning, CombatMode::Endless) => {
                self.tick_strong_pending(dt);
                self.spawn_timer -= dt;
                if self.spawn_timer <= 0.0 {
                    self.spawn_endless_batch(profile);
                    self.spawn_timer = self.pacing.endless_spawn_interval.max(f32::EPSILON);
                }
            }
            (WavePhase::AutoContinue, _) => {
                self.auto_continue_remaining -= dt;
                if self.auto_continue_remaining <= 0.0 {
                    self.advance(profile);
                }
            }
            _ => {}
        }
    }

    // ── Notifications ─────────────────────────────────────────────────────────

    /// One enemy died.  Never called twice for the same enemy.
    pub fn on_enemy_died(&mut self) {
        if !matches!(
            self.phase,
            WavePhase::Spawning | WavePhase::AwaitingClear | WavePhase::UpgradeGate | WavePhase::AutoContinue
        ) {
            return;
        }
        self.alive = self.alive.saturating_sub(1);
        match self.mode {
            CombatMode::Wave => self.check_clear(),
            CombatMode::Endless => {
                self.kills_since_upgrade += 1;
                if self.phase == WavePhase::Spawning
                    && self.kills_since_upgrade >= self.kill_threshold
                {
                    self.open_gate(false);
                }
            }
        }
    }

    pub fn on_player_died(&mut self) {
        if self.is_finished() || matches!(self.phase, WavePhase::Idle | WavePhase::CombatSelectionPending) {
            return;
        }
        self.phase = WavePhase::Defeat;
        self.gate = None;
        self.strong_pending = None;
        info!("Defeat on wave {}", self.wave);
        self.commands.push(WaveCommand::Defeat { wave: self.wave });
    }

    /// Gate callback: the player picked an upgrade.
    pub fn resume_after_gate(&mut self, token: GateToken, profile: &DifficultyProfile) -> CoreResult<()> {
        self.take_gate(token)?;
        self.advance(profile);
        Ok(())
    }

    /// No gate could be shown for `token`; continue after the fixed delay.
    pub fn gate_unavailable(&mut self, token: GateToken) -> CoreResult<()> {
        self.take_gate(token)?;
        self.phase = WavePhase::AutoContinue;
        self.auto_continue_remaining = self.pacing.auto_continue_delay;
        Ok(())
    }

    fn take_gate(&mut self, token: GateToken) -> CoreResult<()> {
        match self.gate {
            Some(current) if current == token && self.phase == WavePhase::UpgradeGate => {
                self.gate = None;
                Ok(())
            }
            current => Err(CoreError::StaleGate {
                token: token.0,
                current: current.map_or(0, |t| t.0),
            }),
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn start_wave(&mut self, profile: &DifficultyProfile) {
        let plan = profile.plan(self.wave);
        info!(
            "Wave {} starts: {} enemies, {} strong",
            plan.wave, plan.main_count, plan.strong_count
        );
        self.commands.push(WaveCommand::WaveStarted { wave: self.wave });
        if plan.main_count > 0 {
            self.commands.push(WaveCommand::SpawnBatch {
                wave: self.wave,
                count: plan.main_count,
                strong: false,
            });
            self.alive += plan.main_count;
        }
        if plan.strong_count > 0 {
            self.strong_pending = Some(PendingBatch {
                wave: self.wave,
                count: plan.strong_count,
                remaining: self.pacing.strong_batch_delay,
            });
            self.phase = WavePhase::Spawning;
        } else {
            self.phase = WavePhase::AwaitingClear;
            self.check_clear();
        }
    }

    fn spawn_endless_batch(&mut self, profile: &DifficultyProfile) {
        let plan = profile.plan(self.wave);
        if plan.main_count > 0 {
            self.commands.push(WaveCommand::SpawnBatch {
                wave: self.wave,
                count: plan.main_count,
                strong: false,
            });
            self.alive += plan.main_count;
        }
        if plan.strong_count > 0 {
            self.strong_pending
                .get_or_insert(PendingBatch {
                    wave: self.wave,
                    count: 0,
                    remaining: self.pacing.strong_batch_delay,
                })
                .count += plan.strong_count;
        }
        self.batches_this_step += 1;
        if self.batches_this_step >= self.pacing.endless_batches_per_step.max(1) {
            self.batches_this_step = 0;
            self.wave += 1;
            info!("Endless escalates to step {}", self.wave);
            self.commands.push(WaveCommand::WaveStarted { wave: self.wave });
        }
    }

    /// Count down the strong sub-batch.  Returns true once it has been queued.
    fn tick_strong_pending(&mut self, dt: f32) -> bool {
        let Some(mut pending) = self.strong_pending.take() else {
            return false;
        };
        pending.remaining -= dt;
        if pending.remaining > 0.0 {
            self.strong_pending = Some(pending);
            return false;
        }
        self.commands.push(WaveCommand::SpawnBatch {
            wave: pending.wave,
            count: pending.count,
            strong: true,
        });
        self.alive += pending.count;
        true
    }

    fn check_clear(&mut self) {
        if self.phase != WavePhase::AwaitingClear || self.alive > 0 {
            return;
        }
        if self.max_waves.is_some_and(|max| self.wave >= max) {
            self.phase = WavePhase::Victory;
            info!("Victory after wave {}", self.wave);
            self.commands.push(WaveCommand::Victory { wave: self.wave });
            return;
        }
        let grand = self.pacing.is_grand(self.wave);
        self.open_gate(grand);
    }

    fn open_gate(&mut self, grand: bool) {
        self.next_token += 1;
        let token = GateToken(self.next_token);
        self.gate = Some(token);
        self.phase = WavePhase::UpgradeGate;
        self.commands.push(WaveCommand::OpenGate {
            token,
            wave: self.wave,
            grand,
        });
    }

    fn advance(&mut self, profile: &DifficultyProfile) {
        match self.mode {
            CombatMode::Wave => {
                self.wave += 1;
                self.start_wave(profile);
            }
            CombatMode::Endless => {
                self.kills_since_upgrade = 0;
                self.kill_threshold += self.pacing.endless_kills_growth;
                self.phase = WavePhase::Spawning;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::DifficultyTier;

    fn profile(tier: DifficultyTier) -> DifficultyProfile {
        let mut p = DifficultyProfile::from_config(tier, &GameConfig::default());
        p.settings.max_waves = 5;
        p.settings.initial_per_batch = 2;
        p.settings.increment_per_wave = 1;
        p.settings.strong_start_count = 1;
        p.settings.strong_increment_per_wave = 0;
        p
    }

    fn scheduler() -> WaveScheduler {
        WaveScheduler::new(WavePacing::from_config(&GameConfig::default()))
    }

    fn kill(s: &mut WaveScheduler, n: u32) {
        for _ in 0..n {
            s.on_enemy_died();
        }
    }

    fn gate_commands(cmds: &[WaveCommand]) -> Vec<GateToken> {
        cmds.iter()
            .filter_map(|c| match c {
                WaveCommand::OpenGate { token, .. } => Some(*token),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn wave_one_spawns_main_then_strong_after_delay() {
        let p = profile(DifficultyTier::Medium);
        let mut s = scheduler();
        s.begin(&p);
        assert_eq!(
            s.drain_commands(),
            vec![
                WaveCommand::WaveStarted { wave: 1 },
                WaveCommand::SpawnBatch { wave: 1, count: 2, strong: false },
            ]
        );
        assert_eq!(s.phase(), WavePhase::Spawning);

        s.tick(1.0, &p);
        assert!(s.drain_commands().is_empty());
        s.tick(0.5, &p);
        assert_eq!(
            s.drain_commands(),
            vec![WaveCommand::SpawnBatch { wave: 1, count: 1, strong: true }]
        );
        assert_eq!(s.phase(), WavePhase::AwaitingClear);
        assert_eq!(s.alive(), 3);
    }

    #[test]
    fn clear_detection_waits_for_strong_batch() {
        let p = profile(DifficultyTier::Medium);
        let mut s = scheduler();
        s.begin(&p);
        kill(&mut s, 2);
        assert_eq!(s.alive(), 0);
        assert_eq!(s.phase(), WavePhase::Spawning);
        assert!(gate_commands(&s.drain_commands()).is_empty());
    }

    #[test]
    fn gate_opens_once_and_blocks_next_wave() {
        let p = profile(DifficultyTier::Medium);
        let mut s = scheduler();
        s.begin(&p);
        s.tick(1.5, &p);
        kill(&mut s, 3);
        s.drain_commands();

        // Wave 2 of 5.
        let token = s.gate_token().expect("gate after wave 1");
        s.resume_after_gate(token, &p).expect("fresh token");
        s.tick(1.5, &p);
        assert_eq!(s.wave(), 2);
        s.drain_commands();

        kill(&mut s, 4);
        // Stray notices while the gate is open clamp at zero.
        kill(&mut s, 2);
        assert_eq!(s.alive(), 0);
        let cmds = s.drain_commands();
        assert_eq!(gate_commands(&cmds).len(), 1);
        assert_eq!(s.phase(), WavePhase::UpgradeGate);

        // Time passes, nothing spawns.
        s.tick(30.0, &p);
        assert!(s.drain_commands().is_empty());
        assert_eq!(s.wave(), 2);

        let token = s.gate_token().expect("gate after wave 2");
        s.resume_after_gate(token, &p).expect("fresh token");
        assert_eq!(s.wave(), 3);
        assert!(s
            .drain_commands()
            .contains(&WaveCommand::SpawnBatch { wave: 3, count: 4, strong: false }));
    }

    #[test]
    fn fifth_wave_gate_is_grand() {
        let mut p = profile(DifficultyTier::Medium);
        p.settings.max_waves = 8;
        p.settings.strong_start_count = 0;
        let mut s = scheduler();
        s.begin(&p);
        for wave in 1..=5 {
            kill(&mut s, p.per_batch(wave));
            let cmds = s.drain_commands();
            let grand = cmds.iter().find_map(|c| match c {
                WaveCommand::OpenGate { grand, .. } => Some(*grand),
                _ => None,
            });
            assert_eq!(grand, Some(wave == 5), "wave {wave}");
            let token = s.gate_token().expect("gate open");
            s.resume_after_gate(token, &p).expect("fresh token");
        }
    }

    #[test]
    fn last_wave_clear_is_victory() {
        let mut p = profile(DifficultyTier::Easy);
        p.settings.max_waves = 1;
        let mut s = scheduler();
        s.begin(&p);
        s.tick(1.5, &p);
        kill(&mut s, 3);
        assert_eq!(s.phase(), WavePhase::Victory);
        assert!(s.drain_commands().contains(&WaveCommand::Victory { wave: 1 }));
        assert!(!s.is_running());
    }

    #[test]
    fn player_death_is_defeat() {
        let p = profile(DifficultyTier::Hard);
        let mut s = scheduler();
        s.begin(&p);
        s.on_player_died();
        assert_eq!(s.phase(), WavePhase::Defeat);
        s.on_player_died();
        let defeats = s
            .drain_commands()
            .iter()
            .filter(|c| matches!(c, WaveCommand::Defeat { .. }))
            .count();
        assert_eq!(defeats, 1);
    }

    #[test]
    fn missing_gate_auto_continues_after_delay() {
        let mut p = profile(DifficultyTier::Medium);
        p.settings.strong_start_count = 0;
        let mut s = scheduler();
        s.begin(&p);
        kill(&mut s, 2);
        let token = s.gate_token().expect("gate open");
        s.gate_unavailable(token).expect("fresh token");
        assert_eq!(s.phase(), WavePhase::AutoContinue);
        s.tick(1.9, &p);
        assert_eq!(s.wave(), 1);
        s.tick(0.1, &p);
        assert_eq!(s.wave(), 2);
    }

    #[test]
    fn cancel_makes_gate_token_stale() {
        let mut p = profile(DifficultyTier::Medium);
        p.settings.strong_start_count = 0;
        let mut s = scheduler();
        s.begin(&p);
        kill(&mut s, 2);
        let token = s.gate_token().expect("gate open");
        s.cancel();
        assert!(matches!(
            s.resume_after_gate(token, &p),
            Err(CoreError::StaleGate { .. })
        ));
        assert_eq!(s.phase(), WavePhase::Idle);
    }

    #[test]
    fn cancel_drops_pending_strong_batch() {
        let p = profile(DifficultyTier::Medium);
        let mut s = scheduler();
        s.begin(&p);
        s.cancel();
        s.tick(5.0, &p);
        assert!(s.drain_commands().is_empty());
    }

    #[test]
    fn endless_spawns_on_timer_and_gates_on_kills() {
        let mut p = profile(DifficultyTier::Endless);
        p.settings.strong_start_count = 0;
        let mut s = scheduler();
        s.begin(&p);
        assert_eq!(s.max_waves(), None);

        s.tick(0.0, &p);
        let first = s.drain_commands();
        assert!(first.contains(&WaveCommand::SpawnBatch { wave: 1, count: 2, strong: false }));

        s.tick(s.pacing().endless_spawn_interval, &p);
        assert_eq!(s.drain_commands().len(), 1);

        let threshold = s.kill_threshold();
        kill(&mut s, threshold);
        assert_eq!(s.phase(), WavePhase::UpgradeGate);
        let token = s.gate_token().expect("endless gate");
        assert!(s.drain_commands().contains(&WaveCommand::OpenGate {
            token,
            wave: 1,
            grand: false
        }));

        s.resume_after_gate(token, &p).expect("fresh token");
        assert_eq!(s.phase(), WavePhase::Spawning);
        assert_eq!(s.kills_since_upgrade(), 0);
        assert_eq!(
            s.kill_threshold(),
            threshold + s.pacing().endless_kills_growth
        );
    }

    #[test]
    fn endless_strong_batch_waits_for_delay() {
        let p = profile(DifficultyTier::Endless);
        let mut s = scheduler();
        s.begin(&p);
        s.drain_commands();
        let delay = s.pacing().strong_batch_delay;

        s.tick(0.0, &p);
        let first = s.drain_commands();
        assert!(first.contains(&WaveCommand::SpawnBatch { wave: 1, count: 2, strong: false }));
        assert!(!first
            .iter()
            .any(|c| matches!(c, WaveCommand::SpawnBatch { strong: true, .. })));
        assert_eq!(s.alive(), 2);

        s.tick(delay * 0.5, &p);
        assert!(s.drain_commands().is_empty());

        s.tick(delay * 0.5, &p);
        assert_eq!(
            s.drain_commands(),
            vec![WaveCommand::SpawnBatch { wave: 1, count: 1, strong: true }]
        );
        assert_eq!(s.alive(), 3);
    }

    #[test]
    fn endless_escalates_every_few_batches() {
        let p = profile(DifficultyTier::Endless);
        let mut s = scheduler();
        s.begin(&p);
        let per_step = s.pacing().endless_batches_per_step;
        let interval = s.pacing().endless_spawn_interval;
        s.tick(0.0, &p);
        for _ in 1..per_step {
            s.tick(interval, &p);
        }
        assert_eq!(s.wave(), 2);
    }
}

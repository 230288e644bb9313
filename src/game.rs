use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::arbiter::{HitArbiter, MissReason, Verdict};
use crate::clock::{Clock, Millis};
use crate::config::{Config, Difficulty};
use crate::error::{Action, GameError};
use crate::events::GameEvent;
use crate::scheduler::{RoundScheduler, SpawnOutcome};
use crate::score::{Outcome, ScoreKeeper, ScoreState};
use crate::slot::{SlotIndex, SlotPicker};
use crate::target::{Target, Tier};
use crate::timer::{RoundId, Scheduled, Scheduler, TimerId, TimerQueue, TimerTask};

const SECOND_MS: Millis = 1_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum GameState {
    Idle,
    Running,
    Paused,
    Ended,
}

/// Per-session bookkeeping owned by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    pub state: GameState,
    pub remaining_secs: u32,
    /// Slot of the most recent target, excluded from the next pick
    pub last_slot: Option<SlotIndex>,
    /// Bumped on every start/stop; timers carry the id they were armed under
    pub round_id: RoundId,
    pub outcome: Option<Outcome>,
}

/// Result of a hit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgement {
    Hit {
        slot: SlotIndex,
        tier: Tier,
        points: u32,
    },
    Miss(MissReason),
}

impl Judgement {
    pub fn is_hit(&self) -> bool {
        matches!(self, Judgement::Hit { .. })
    }
}

/// Read-only view for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: GameState,
    pub difficulty: Difficulty,
    pub grid_size: usize,
    pub remaining_secs: u32,
    pub score: ScoreState,
    pub win_score: u32,
    pub visible: Option<Target>,
    pub outcome: Option<Outcome>,
}

/// The game state machine: Idle -> Running <-> Paused -> Ended -> Idle.
///
/// Time only moves when the driver calls [`Game::advance`] (or
/// [`Game::advance_to`]); due timers are dispatched in deadline order.
/// Control calls that do not apply in the current state return
/// [`GameError::InvalidTransition`] and change nothing.
#[derive(Debug)]
pub struct Game<C: Clock, S: Scheduler = TimerQueue> {
    config: Config,
    clock: C,
    timers: S,
    session: GameSession,
    scheduler: RoundScheduler,
    arbiter: HitArbiter,
    score: ScoreKeeper,
    countdown_timer: Option<TimerId>,
    countdown_due: Millis,
    /// Time left until the next countdown tick, frozen while paused
    countdown_left: Option<Millis>,
    events: VecDeque<GameEvent>,
}

impl<C: Clock> Game<C, TimerQueue> {
    pub fn new(config: Config, clock: C) -> Self {
        Self::with_parts(config, clock, TimerQueue::new(), StdRng::from_entropy())
    }

    /// Deterministic game: the same seed replays the same targets
    pub fn with_seed(config: Config, clock: C, seed: u64) -> Self {
        Self::with_parts(config, clock, TimerQueue::new(), StdRng::seed_from_u64(seed))
    }
}

impl<C: Clock, S: Scheduler> Game<C, S> {
    pub fn with_parts(config: Config, clock: C, timers: S, rng: StdRng) -> Self {
        let config = config.sanitized();
        let scheduler = RoundScheduler::new(
            SlotPicker::new(config.grid_size),
            config.odds,
            config.round_config(),
            config.settle_ms,
            rng,
        );
        Self {
            session: GameSession {
                state: GameState::Idle,
                remaining_secs: config.round_secs,
                last_slot: None,
                round_id: 0,
                outcome: None,
            },
            scheduler,
            arbiter: HitArbiter::new(config.grace_ms),
            score: ScoreKeeper::new(config.points),
            clock,
            timers,
            countdown_timer: None,
            countdown_due: 0,
            countdown_left: None,
            events: VecDeque::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn timers(&self) -> &S {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut S {
        &mut self.timers
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn state(&self) -> GameState {
        self.session.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.session.remaining_secs
    }

    pub fn score(&self) -> ScoreState {
        self.score.state()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.config.difficulty
    }

    pub fn win_score(&self) -> u32 {
        self.scheduler.round().win_score
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.session.outcome
    }

    pub fn scheduler(&self) -> &RoundScheduler {
        &self.scheduler
    }

    pub fn has_pending_spawn(&self) -> bool {
        self.scheduler.has_pending_timer()
    }

    pub fn has_pending_countdown(&self) -> bool {
        self.countdown_timer.is_some()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.session.state,
            difficulty: self.config.difficulty,
            grid_size: self.config.grid_size,
            remaining_secs: self.session.remaining_secs,
            score: self.score.state(),
            win_score: self.win_score(),
            visible: self.scheduler.visible_target().copied(),
            outcome: self.session.outcome,
        }
    }

    /// Take every event emitted since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    /// Change difficulty; only accepted while idle
    pub fn select_difficulty(&mut self, difficulty: Difficulty) -> Result<(), GameError> {
        if self.session.state != GameState::Idle {
            log::debug!("difficulty change to {} refused", difficulty);
            return Err(GameError::DifficultyLocked {
                state: self.session.state,
            });
        }
        self.config.difficulty = difficulty;
        self.scheduler.reset(self.config.round_config());
        Ok(())
    }

    /// Begin a round from Idle, or replay from Ended
    pub fn start(&mut self) -> Result<(), GameError> {
        self.require(Action::Start, &[GameState::Idle, GameState::Ended])?;

        let now = self.clock.now();
        self.reset_round();
        self.set_state(GameState::Running);
        log::info!(
            "round {} started: {} difficulty, {}s, target {}",
            self.session.round_id,
            self.config.difficulty,
            self.session.remaining_secs,
            self.win_score()
        );
        self.emit(GameEvent::CountdownTick {
            remaining_secs: self.session.remaining_secs,
        });

        let outcome =
            self.scheduler
                .spawn_next(now, self.session.last_slot, self.session.round_id, &mut self.timers);
        self.apply_spawn(outcome);
        self.arm_countdown(now + SECOND_MS);
        Ok(())
    }

    /// Freeze the round. Timers already due run first, so a pause that
    /// arrives after the final tick finds the round Ended.
    pub fn pause(&mut self) -> Result<(), GameError> {
        let now = self.clock.now();
        self.advance_to(now);
        self.require(Action::Pause, &[GameState::Running])?;

        if let Some(slot) = self.scheduler.pause(now, &mut self.timers) {
            self.emit(GameEvent::TargetExpired { slot });
        }
        if self.countdown_timer.is_some() {
            self.countdown_left = Some(self.countdown_due.saturating_sub(now));
            self.cancel_countdown();
        }
        self.set_state(GameState::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), GameError> {
        let now = self.clock.now();
        self.advance_to(now);
        self.require(Action::Resume, &[GameState::Paused])?;

        self.set_state(GameState::Running);
        let outcome =
            self.scheduler
                .resume(now, self.session.last_slot, self.session.round_id, &mut self.timers);
        self.apply_spawn(outcome);
        let left = self.countdown_left.take().unwrap_or(SECOND_MS);
        self.arm_countdown(now + left);
        Ok(())
    }

    /// Abort from any state back to Idle, discarding score and targets
    pub fn stop(&mut self) -> Result<(), GameError> {
        if let Some(slot) = self.scheduler.halt(&mut self.timers) {
            self.emit(GameEvent::TargetExpired { slot });
        }
        self.cancel_countdown();
        self.reset_round();
        self.set_state(GameState::Idle);
        Ok(())
    }

    /// Acknowledge a finished round and return to Idle
    pub fn dismiss(&mut self) -> Result<(), GameError> {
        self.require(Action::Dismiss, &[GameState::Ended])?;
        self.stop()
    }

    /// One countdown step. Has no effect unless Running.
    pub fn tick(&mut self) {
        if self.session.state != GameState::Running {
            return;
        }
        self.session.remaining_secs = self.session.remaining_secs.saturating_sub(1);
        self.emit(GameEvent::CountdownTick {
            remaining_secs: self.session.remaining_secs,
        });
        if self.session.remaining_secs == 0 {
            self.end_round();
        }
    }

    /// Judge a hit at `slot`, stamped at `at`. Timers due before `at`
    /// should already have been dispatched by the driver.
    pub fn hit_attempt(&mut self, slot: SlotIndex, at: Millis) -> Judgement {
        if self.session.state != GameState::Running {
            return Judgement::Miss(MissReason::NotRunning);
        }
        match self.arbiter.judge(&mut self.scheduler, slot, at) {
            Verdict::Valid(target) => {
                let points = self.score.award(target.tier);
                log::debug!("hit slot {} ({}) for {}", slot, target.tier, points);
                self.emit(GameEvent::HitResolved {
                    slot,
                    tier: target.tier,
                    points,
                });
                Judgement::Hit {
                    slot,
                    tier: target.tier,
                    points,
                }
            }
            Verdict::Invalid(reason) => {
                log::debug!("miss on slot {} at {}: {}", slot, at, reason);
                Judgement::Miss(reason)
            }
        }
    }

    /// Dispatch due timers, then judge a hit at the current instant
    pub fn whack(&mut self, slot: SlotIndex) -> Judgement {
        let now = self.clock.now();
        self.advance_to(now);
        self.hit_attempt(slot, now)
    }

    /// Dispatch every timer due by the clock's current time
    pub fn advance(&mut self) -> usize {
        let now = self.clock.now();
        self.advance_to(now)
    }

    /// Dispatch every timer due at or before `now`; returns how many fired
    pub fn advance_to(&mut self, now: Millis) -> usize {
        let mut fired = 0;
        while let Some(entry) = self.timers.pop_due(now) {
            fired += 1;
            self.dispatch(entry, now);
        }
        fired
    }

    fn dispatch(&mut self, entry: Scheduled, now: Millis) {
        if entry.round != self.session.round_id {
            let err = GameError::StaleTimer {
                scheduled_round: entry.round,
                live_round: self.session.round_id,
            };
            log::debug!("dropping {:?} timer: {}", entry.task, err);
            return;
        }
        if self.session.state != GameState::Running {
            log::debug!("dropping {:?} timer while {}", entry.task, self.session.state);
            return;
        }

        match entry.task {
            TimerTask::Spawn => {
                // stamped with the poll time so a late poll never shortens a target
                let outcome = self.scheduler.on_spawn_due(
                    entry.id,
                    now,
                    self.session.last_slot,
                    self.session.round_id,
                    &mut self.timers,
                );
                self.apply_spawn(outcome);
            }
            TimerTask::Countdown => {
                if self.countdown_timer == Some(entry.id) {
                    self.countdown_timer = None;
                }
                self.tick();
                if self.session.state == GameState::Running {
                    self.arm_countdown(entry.due_at + SECOND_MS);
                }
            }
        }
    }

    fn apply_spawn(&mut self, outcome: SpawnOutcome) {
        match outcome {
            SpawnOutcome::Spawned { target, expired } => {
                if let Some(slot) = expired {
                    self.emit(GameEvent::TargetExpired { slot });
                }
                self.session.last_slot = Some(target.slot);
                log::debug!(
                    "spawned {} target in slot {} until {}",
                    target.tier,
                    target.slot,
                    target.expires_at
                );
                self.emit(GameEvent::TargetSpawned {
                    slot: target.slot,
                    tier: target.tier,
                });
            }
            SpawnOutcome::Deferred { until } => {
                log::debug!("spawn deferred until {} for settling hit", until);
            }
            SpawnOutcome::NoSlots => {
                log::debug!("spawn skipped: {}", GameError::EmptyGrid);
            }
        }
    }

    fn end_round(&mut self) {
        if let Some(slot) = self.scheduler.halt(&mut self.timers) {
            self.emit(GameEvent::TargetExpired { slot });
        }
        self.cancel_countdown();

        let win_score = self.win_score();
        let outcome = self.score.evaluate(win_score);
        let score = self.score.state();
        self.session.outcome = Some(outcome);
        self.set_state(GameState::Ended);
        log::info!(
            "round {} ended: {} with {}/{} ({} diamonds)",
            self.session.round_id,
            outcome,
            score.points,
            win_score,
            score.diamond_hits
        );
        self.emit(GameEvent::RoundEnded {
            outcome,
            points: score.points,
            win_score,
            diamond_hits: score.diamond_hits,
        });
    }

    /// Fresh round id, score, countdown and target log
    fn reset_round(&mut self) {
        self.scheduler.cancel(&mut self.timers);
        self.cancel_countdown();
        self.session.round_id += 1;
        self.session.remaining_secs = self.config.round_secs;
        self.session.last_slot = None;
        self.session.outcome = None;
        self.countdown_left = None;
        self.score.reset();
        self.scheduler.reset(self.config.round_config());
    }

    fn arm_countdown(&mut self, due_at: Millis) {
        self.cancel_countdown();
        self.countdown_due = due_at;
        self.countdown_timer = Some(self.timers.schedule(
            due_at,
            TimerTask::Countdown,
            self.session.round_id,
        ));
    }

    fn cancel_countdown(&mut self) {
        if let Some(id) = self.countdown_timer.take() {
            self.timers.cancel(id);
        }
    }

    fn require(&self, action: Action, allowed: &[GameState]) -> Result<(), GameError> {
        if allowed.contains(&self.session.state) {
            Ok(())
        } else {
            log::debug!("ignoring {} while {}", action, self.session.state);
            Err(GameError::InvalidTransition {
                from: self.session.state,
                action,
            })
        }
    }

    fn set_state(&mut self, to: GameState) {
        let from = self.session.state;
        if from != to {
            self.session.state = to;
            self.emit(GameEvent::StateChanged { from, to });
        }
    }

    fn emit(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::target::TierOdds;
    use assert_matches::assert_matches;

    fn config() -> Config {
        Config {
            odds: TierOdds {
                diamond: 0.0,
                golden: 0.0,
            },
            ..Config::default()
        }
    }

    fn game(clock: &ManualClock) -> Game<ManualClock> {
        Game::with_seed(config(), clock.clone(), 7)
    }

    fn at(game: &mut Game<ManualClock>, clock: &ManualClock, t: Millis) {
        clock.set(t);
        game.advance();
    }

    fn visible_slot(game: &Game<ManualClock>) -> SlotIndex {
        game.snapshot().visible.expect("a target should be visible").slot
    }

    #[test]
    fn new_game_is_idle() {
        let clock = ManualClock::new(0);
        let g = game(&clock);
        assert_eq!(g.state(), GameState::Idle);
        assert_eq!(g.remaining_secs(), 30);
        assert_eq!(g.win_score(), 450);
        assert_eq!(g.timers().pending(), 0);
    }

    #[test]
    fn undefined_transitions_are_refused() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);

        assert_eq!(
            g.pause(),
            Err(GameError::InvalidTransition {
                from: GameState::Idle,
                action: Action::Pause
            })
        );
        assert_matches!(g.resume(), Err(GameError::InvalidTransition { .. }));
        assert_matches!(g.dismiss(), Err(GameError::InvalidTransition { .. }));

        g.start().unwrap();
        assert_matches!(g.start(), Err(GameError::InvalidTransition { .. }));
        assert_matches!(g.resume(), Err(GameError::InvalidTransition { .. }));
        assert_eq!(g.state(), GameState::Running);
    }

    #[test]
    fn start_spawns_and_arms_countdown() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();

        let events = g.drain_events();
        assert_eq!(
            events[0],
            GameEvent::StateChanged {
                from: GameState::Idle,
                to: GameState::Running
            }
        );
        assert_eq!(events[1], GameEvent::CountdownTick { remaining_secs: 30 });
        assert_matches!(events[2], GameEvent::TargetSpawned { tier: Tier::Normal, .. });
        assert!(g.has_pending_spawn());
        assert!(g.has_pending_countdown());
        assert_eq!(g.timers().pending_of(TimerTask::Spawn), 1);
        assert_eq!(g.timers().pending_of(TimerTask::Countdown), 1);
    }

    #[test]
    fn countdown_runs_out_and_evaluates() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();

        at(&mut g, &clock, 29_999);
        assert_eq!(g.remaining_secs(), 1);
        at(&mut g, &clock, 30_000);

        assert_eq!(g.state(), GameState::Ended);
        assert_eq!(g.outcome(), Some(Outcome::Lose));
        assert_eq!(g.timers().pending(), 0);
        assert!(g.snapshot().visible.is_none());

        let events = g.drain_events();
        assert_eq!(
            events.last(),
            Some(&GameEvent::RoundEnded {
                outcome: Outcome::Lose,
                points: 0,
                win_score: 450,
                diamond_hits: 0
            })
        );
    }

    #[test]
    fn manual_ticks_only_count_while_running() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.tick();
        assert_eq!(g.remaining_secs(), 30);

        g.start().unwrap();
        g.tick();
        assert_eq!(g.remaining_secs(), 29);

        g.pause().unwrap();
        g.tick();
        assert_eq!(g.remaining_secs(), 29);
    }

    #[test]
    fn difficulty_only_changes_while_idle() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);

        g.select_difficulty(Difficulty::Hard).unwrap();
        assert_eq!(g.difficulty(), Difficulty::Hard);
        assert_eq!(g.win_score(), 500);

        g.start().unwrap();
        assert_eq!(
            g.select_difficulty(Difficulty::Easy),
            Err(GameError::DifficultyLocked {
                state: GameState::Running
            })
        );
        assert_eq!(g.difficulty(), Difficulty::Hard);
    }

    #[test]
    fn pause_freezes_countdown_and_clears_grid() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        at(&mut g, &clock, 1_000);
        assert_eq!(g.remaining_secs(), 29);

        clock.set(1_400);
        let slot = visible_slot(&g);
        g.drain_events();
        g.pause().unwrap();

        assert_eq!(g.state(), GameState::Paused);
        assert_eq!(g.timers().pending(), 0);
        assert!(!g.has_pending_spawn());
        assert!(g.snapshot().visible.is_none());
        assert!(g.drain_events().contains(&GameEvent::TargetExpired { slot }));
        assert_eq!(g.hit_attempt(slot, 1_400), Judgement::Miss(MissReason::NotRunning));

        at(&mut g, &clock, 9_000);
        assert_eq!(g.remaining_secs(), 29);

        g.resume().unwrap();
        assert_eq!(g.remaining_secs(), 29);
        assert!(g.has_pending_spawn());

        // 600ms were left on the interrupted second
        at(&mut g, &clock, 9_599);
        assert_eq!(g.remaining_secs(), 29);
        at(&mut g, &clock, 9_600);
        assert_eq!(g.remaining_secs(), 28);
    }

    #[test]
    fn grace_window_survives_pause() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        let slot = visible_slot(&g);

        // target expires at 900; pause just before, resume 5s later
        clock.set(850);
        g.pause().unwrap();
        clock.set(5_850);
        g.resume().unwrap();

        // old target is now "previous" with its deadline shifted to 5_900 + grace
        assert_matches!(g.hit_attempt(slot, 6_250), Judgement::Hit { .. });
    }

    #[test]
    fn previous_target_within_grace_counts() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        let first = visible_slot(&g);

        at(&mut g, &clock, 900);
        assert_ne!(visible_slot(&g), first);
        assert_matches!(g.hit_attempt(first, 1_250), Judgement::Hit { points: 10, .. });
    }

    #[test]
    fn previous_target_after_grace_misses() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        let first = visible_slot(&g);

        at(&mut g, &clock, 900);
        assert_eq!(g.hit_attempt(first, 1_251), Judgement::Miss(MissReason::Late));
        assert_eq!(g.score().points, 0);
    }

    #[test]
    fn hit_defers_next_spawn_until_settled() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        let slot = visible_slot(&g);

        assert!(g.hit_attempt(slot, 800).is_hit());
        at(&mut g, &clock, 900);
        // still the whacked target; next one waits for 800 + 250
        assert_eq!(g.snapshot().visible.map(|t| (t.slot, t.resolved)), Some((slot, true)));

        at(&mut g, &clock, 1_050);
        assert_matches!(g.snapshot().visible, Some(t) if !t.resolved && t.slot != slot);
    }

    #[test]
    fn settle_deadline_shifts_across_pause() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        let slot = visible_slot(&g);

        assert!(g.hit_attempt(slot, 800).is_hit());
        // expiry at 900 is deferred to 1_050; pause in between
        at(&mut g, &clock, 950);
        g.pause().unwrap();
        clock.set(5_950);
        g.resume().unwrap();

        at(&mut g, &clock, 6_049);
        assert!(g.snapshot().visible.is_none());
        at(&mut g, &clock, 6_050);
        assert_matches!(g.snapshot().visible, Some(t) if t.spawned_at == 6_050 && !t.resolved);
    }

    #[test]
    fn hit_stamped_before_current_spawn_misses() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();

        at(&mut g, &clock, 900);
        let current = visible_slot(&g);
        assert_eq!(g.hit_attempt(current, 100), Judgement::Miss(MissReason::TooEarly));
        assert_eq!(g.score().points, 0);
        assert!(g.hit_attempt(current, 900).is_hit());
    }

    #[test]
    fn pause_runs_due_timers_first() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();

        // tick due at 1_000 was never polled
        clock.set(1_005);
        g.pause().unwrap();
        assert_eq!(g.remaining_secs(), 29);

        clock.set(2_005);
        g.resume().unwrap();
        at(&mut g, &clock, 2_999);
        assert_eq!(g.remaining_secs(), 29);
        at(&mut g, &clock, 3_000);
        assert_eq!(g.remaining_secs(), 28);
    }

    #[test]
    fn pause_after_final_tick_finds_round_ended() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();

        clock.set(30_005);
        assert_eq!(
            g.pause(),
            Err(GameError::InvalidTransition {
                from: GameState::Ended,
                action: Action::Pause
            })
        );
        assert_eq!(g.state(), GameState::Ended);
        assert_eq!(g.remaining_secs(), 0);
        assert_eq!(g.outcome(), Some(Outcome::Lose));
    }

    #[test]
    fn whack_reads_the_clock() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        let slot = visible_slot(&g);

        clock.set(100);
        assert_eq!(
            g.whack(slot),
            Judgement::Hit {
                slot,
                tier: Tier::Normal,
                points: 10
            }
        );
        assert_eq!(g.whack(slot), Judgement::Miss(MissReason::AlreadyResolved));
        assert_eq!(g.score().points, 10);
    }

    #[test]
    fn stop_discards_round_and_restart_is_clean() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        let slot = visible_slot(&g);
        g.hit_attempt(slot, 10);
        at(&mut g, &clock, 2_000);

        g.stop().unwrap();
        assert_eq!(g.state(), GameState::Idle);
        assert_eq!(g.score(), ScoreState::default());
        assert_eq!(g.remaining_secs(), 30);
        assert_eq!(g.timers().pending(), 0);
        g.drain_events();

        at(&mut g, &clock, 10_000);
        assert!(g.drain_events().is_empty());
    }

    #[test]
    fn dismiss_returns_to_idle_after_round() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        at(&mut g, &clock, 30_000);
        assert_eq!(g.state(), GameState::Ended);

        g.dismiss().unwrap();
        assert_eq!(g.state(), GameState::Idle);
        assert_eq!(g.outcome(), None);
        g.select_difficulty(Difficulty::Easy).unwrap();
    }

    #[test]
    fn replay_from_ended() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        g.start().unwrap();
        at(&mut g, &clock, 30_000);

        g.start().unwrap();
        assert_eq!(g.state(), GameState::Running);
        assert_eq!(g.remaining_secs(), 30);
        assert_eq!(g.outcome(), None);
    }

    #[test]
    fn empty_grid_times_out_to_lose() {
        let clock = ManualClock::new(0);
        let mut g = Game::with_seed(
            Config {
                grid_size: 0,
                ..config()
            },
            clock.clone(),
            1,
        );
        g.start().unwrap();
        assert!(!g.has_pending_spawn());
        assert_eq!(g.hit_attempt(0, 0), Judgement::Miss(MissReason::OutOfRange));

        at(&mut g, &clock, 30_000);
        assert_eq!(g.outcome(), Some(Outcome::Lose));
        assert!(!g
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::TargetSpawned { .. })));
    }

    /// Scheduler that forgets to cancel, so stale entries reach the game
    #[derive(Debug, Default)]
    struct LeakyQueue(TimerQueue);

    impl Scheduler for LeakyQueue {
        fn schedule(&mut self, due_at: Millis, task: TimerTask, round: RoundId) -> TimerId {
            self.0.schedule(due_at, task, round)
        }
        fn cancel(&mut self, _id: TimerId) -> bool {
            false
        }
        fn cancel_all(&mut self) -> usize {
            0
        }
        fn pop_due(&mut self, now: Millis) -> Option<Scheduled> {
            self.0.pop_due(now)
        }
        fn next_due(&self) -> Option<Millis> {
            self.0.next_due()
        }
        fn pending(&self) -> usize {
            self.0.pending()
        }
    }

    #[test]
    fn stale_timers_from_previous_round_are_ignored() {
        let clock = ManualClock::new(0);
        let mut g = Game::with_parts(
            config(),
            clock.clone(),
            LeakyQueue::default(),
            StdRng::seed_from_u64(3),
        );
        g.start().unwrap();

        clock.set(500);
        g.stop().unwrap();
        g.start().unwrap();
        g.drain_events();

        // round 1 entries at 900 and 1_000 fire and are dropped
        clock.set(1_000);
        g.advance();
        assert_eq!(g.remaining_secs(), 30);
        assert!(g.drain_events().is_empty());

        clock.set(1_500);
        g.advance();
        assert_eq!(g.remaining_secs(), 29);
    }

    #[test]
    fn no_spawn_timer_outside_running() {
        let clock = ManualClock::new(0);
        let mut g = game(&clock);
        assert!(!g.has_pending_spawn());

        g.start().unwrap();
        assert!(g.has_pending_spawn());
        g.pause().unwrap();
        assert!(!g.has_pending_spawn());
        g.resume().unwrap();
        assert!(g.has_pending_spawn());
        g.stop().unwrap();
        assert!(!g.has_pending_spawn());

        g.start().unwrap();
        at(&mut g, &clock, 30_000);
        assert!(!g.has_pending_spawn());
        assert!(!g.has_pending_countdown());
    }
}

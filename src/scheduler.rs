use rand::rngs::StdRng;

use crate::clock::Millis;
use crate::config::RoundConfig;
use crate::slot::{SlotIndex, SlotPicker};
use crate::target::{HitWindows, Target, TierOdds, Window};
use crate::timer::{RoundId, Scheduler, TimerId, TimerTask};

/// Result of asking the scheduler for the next target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned {
        target: Target,
        /// Slot whose target was taken off the grid to make room
        expired: Option<SlotIndex>,
    },
    /// A hit is still settling; the spawn was rescheduled for `until`
    Deferred { until: Millis },
    /// Empty grid: nothing to spawn, nothing scheduled
    NoSlots,
}

/// Owns the spawn/expire loop and the current/previous target log.
///
/// Each cycle is spawn, visible, expire, then (if a hit is still settling)
/// a short cooldown before the next spawn. Exactly one spawn timer is live
/// at a time; arming a new one cancels the old.
#[derive(Debug)]
pub struct RoundScheduler {
    picker: SlotPicker,
    odds: TierOdds,
    round: RoundConfig,
    settle_ms: Millis,
    rng: StdRng,
    windows: HitWindows,
    /// Whether the current target is on the grid
    visible: bool,
    settle_until: Millis,
    spawn_timer: Option<TimerId>,
    paused_at: Option<Millis>,
}

impl RoundScheduler {
    pub fn new(
        picker: SlotPicker,
        odds: TierOdds,
        round: RoundConfig,
        settle_ms: Millis,
        rng: StdRng,
    ) -> Self {
        Self {
            picker,
            odds,
            round,
            settle_ms,
            rng,
            windows: HitWindows::default(),
            visible: false,
            settle_until: 0,
            spawn_timer: None,
            paused_at: None,
        }
    }

    pub fn picker(&self) -> &SlotPicker {
        &self.picker
    }

    pub fn round(&self) -> RoundConfig {
        self.round
    }

    pub fn windows(&self) -> &HitWindows {
        &self.windows
    }

    /// The target currently shown on the grid, if any
    pub fn visible_target(&self) -> Option<&Target> {
        self.windows.current().filter(|_| self.visible)
    }

    pub fn has_pending_timer(&self) -> bool {
        self.spawn_timer.is_some()
    }

    /// Forget everything from the previous round and adopt new parameters.
    /// The caller must have cancelled the spawn timer first.
    pub fn reset(&mut self, round: RoundConfig) {
        debug_assert!(self.spawn_timer.is_none());
        self.round = round;
        self.windows.clear();
        self.visible = false;
        self.settle_until = 0;
        self.paused_at = None;
    }

    /// Retire the current target and bring up a new one.
    pub fn spawn_next(
        &mut self,
        now: Millis,
        exclude: Option<SlotIndex>,
        round_id: RoundId,
        timers: &mut dyn Scheduler,
    ) -> SpawnOutcome {
        self.cancel(timers);

        if self.picker.slots() == 0 {
            return SpawnOutcome::NoSlots;
        }

        if now < self.settle_until {
            let until = self.settle_until;
            self.spawn_timer = Some(timers.schedule(until, TimerTask::Spawn, round_id));
            return SpawnOutcome::Deferred { until };
        }

        let expired = self.take_visible();

        let Some(slot) = self.picker.pick(&mut self.rng, exclude) else {
            return SpawnOutcome::NoSlots;
        };
        let tier = self.odds.draw(&mut self.rng);
        let visible_for = self.round.visible_for(&mut self.rng);
        let target = Target::new(slot, tier, now, visible_for);

        self.windows.push(target);
        self.visible = true;
        self.spawn_timer = Some(timers.schedule(target.expires_at, TimerTask::Spawn, round_id));

        SpawnOutcome::Spawned { target, expired }
    }

    /// A spawn entry fired. Clears our handle when it is the one we armed.
    pub fn on_spawn_due(
        &mut self,
        fired: TimerId,
        now: Millis,
        exclude: Option<SlotIndex>,
        round_id: RoundId,
        timers: &mut dyn Scheduler,
    ) -> SpawnOutcome {
        if self.spawn_timer == Some(fired) {
            self.spawn_timer = None;
        }
        self.spawn_next(now, exclude, round_id, timers)
    }

    /// Mark the target in `window` as hit. Returns it if this was the first hit.
    pub fn resolve(&mut self, window: Window) -> Option<Target> {
        let target = self.windows.get_mut(window)?;
        if target.resolved {
            return None;
        }
        target.resolved = true;
        Some(*target)
    }

    /// Start the post-hit cooldown during which spawns are deferred
    pub fn on_hit_settled(&mut self, at: Millis) {
        self.settle_until = self.settle_until.max(at.saturating_add(self.settle_ms));
    }

    /// Stop the spawn loop and take the target off the grid. The hit-window
    /// log is kept; `resume` shifts it by the paused duration.
    pub fn pause(&mut self, now: Millis, timers: &mut dyn Scheduler) -> Option<SlotIndex> {
        self.cancel(timers);
        self.paused_at = Some(now);
        self.take_visible()
    }

    pub fn resume(
        &mut self,
        now: Millis,
        exclude: Option<SlotIndex>,
        round_id: RoundId,
        timers: &mut dyn Scheduler,
    ) -> SpawnOutcome {
        if let Some(paused_at) = self.paused_at.take() {
            let paused_for = now.saturating_sub(paused_at);
            self.windows.shift(paused_for);
            if self.settle_until > paused_at {
                self.settle_until = self.settle_until.saturating_add(paused_for);
            }
        }
        self.spawn_next(now, exclude, round_id, timers)
    }

    /// Cancel the pending spawn timer, if any
    pub fn cancel(&mut self, timers: &mut dyn Scheduler) {
        if let Some(id) = self.spawn_timer.take() {
            timers.cancel(id);
        }
    }

    /// Stop the loop for good and clear the grid
    pub fn halt(&mut self, timers: &mut dyn Scheduler) -> Option<SlotIndex> {
        self.cancel(timers);
        self.take_visible()
    }

    fn take_visible(&mut self) -> Option<SlotIndex> {
        if !self.visible {
            return None;
        }
        self.visible = false;
        self.windows.current().map(|t| t.slot)
    }
}

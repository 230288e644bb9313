use crate::clock::Millis;
use crate::scheduler::RoundScheduler;
use crate::slot::SlotIndex;
use crate::target::{Target, Window};

/// Why a hit attempt was not credited
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum MissReason {
    /// The game is not running
    NotRunning,
    /// Slot index outside the grid
    OutOfRange,
    /// No target has appeared yet this round
    NoTarget,
    /// Neither the current nor the previous target is in that slot
    WrongSlot,
    /// Stamped before the matching target appeared
    TooEarly,
    /// The matching target's grace deadline has passed
    Late,
    /// The matching target was already hit
    AlreadyResolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid(Target),
    Invalid(MissReason),
}

/// Decides whether an input at a slot and instant hits a target.
///
/// A slot is hittable when it holds the current or the previous target and
/// the attempt lands between that target's spawn and its expiry plus the
/// grace margin. The margin absorbs input and render latency, so a target that
/// vanished a moment ago can still be credited. Each target is credited once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitArbiter {
    grace_ms: Millis,
}

impl HitArbiter {
    pub fn new(grace_ms: Millis) -> Self {
        Self { grace_ms }
    }

    pub fn grace_ms(&self) -> Millis {
        self.grace_ms
    }

    /// Judge an attempt against the scheduler's hit windows. A valid hit is
    /// marked resolved and starts the scheduler's settle cooldown.
    pub fn judge(&self, scheduler: &mut RoundScheduler, slot: SlotIndex, at: Millis) -> Verdict {
        if !scheduler.picker().contains(slot) {
            return Verdict::Invalid(MissReason::OutOfRange);
        }

        let window = match self.find_window(scheduler, slot, at) {
            Ok(window) => window,
            Err(reason) => return Verdict::Invalid(reason),
        };

        match scheduler.resolve(window) {
            Some(target) => {
                scheduler.on_hit_settled(at);
                Verdict::Valid(target)
            }
            None => Verdict::Invalid(MissReason::AlreadyResolved),
        }
    }

    /// Current is checked before previous; the most specific failure wins
    fn find_window(
        &self,
        scheduler: &RoundScheduler,
        slot: SlotIndex,
        at: Millis,
    ) -> Result<Window, MissReason> {
        let windows = scheduler.windows();
        if windows.current().is_none() && windows.previous().is_none() {
            return Err(MissReason::NoTarget);
        }

        let mut reason = MissReason::WrongSlot;
        for window in [Window::Current, Window::Previous] {
            let Some(target) = windows.get(window) else {
                continue;
            };
            if target.slot != slot {
                continue;
            }
            if at < target.spawned_at {
                if reason == MissReason::WrongSlot {
                    reason = MissReason::TooEarly;
                }
            } else if at > target.grace_deadline(self.grace_ms) {
                if matches!(reason, MissReason::WrongSlot | MissReason::TooEarly) {
                    reason = MissReason::Late;
                }
            } else if target.resolved {
                reason = MissReason::AlreadyResolved;
            } else {
                return Ok(window);
            }
        }
        Err(reason)
    }
}

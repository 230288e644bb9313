use std::collections::BTreeMap;

use crate::clock::Millis;

/// Identifier of one round/session; bumped on every start and stop so that
/// entries scheduled by an earlier round can be recognised as stale.
pub type RoundId = u64;

/// Handle used to cancel a scheduled entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTask {
    /// Expire the visible target and spawn the next one
    Spawn,
    /// One-second countdown tick
    Countdown,
}

/// A pending timer entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub id: TimerId,
    pub task: TimerTask,
    pub round: RoundId,
    pub due_at: Millis,
}

/// Scheduled-task abstraction the game is driven by.
///
/// Entries are plain data rather than callbacks: whoever drives the game polls
/// `pop_due` and hands each entry back to the game for dispatch.
pub trait Scheduler {
    /// Enqueue `task` to fire at `due_at`, tagged with the round that owns it.
    fn schedule(&mut self, due_at: Millis, task: TimerTask, round: RoundId) -> TimerId;
    /// Remove a pending entry. Returns false if it already fired or was cancelled.
    fn cancel(&mut self, id: TimerId) -> bool;
    /// Drop every pending entry, returning how many were removed.
    fn cancel_all(&mut self) -> usize;
    /// Earliest entry due at or before `now`, in deadline then scheduling order.
    fn pop_due(&mut self, now: Millis) -> Option<Scheduled>;
    /// Deadline of the earliest pending entry
    fn next_due(&self) -> Option<Millis>;
    fn pending(&self) -> usize;
}

/// Deterministic in-memory scheduler
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: BTreeMap<(Millis, TimerId), Scheduled>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending entries of one kind
    pub fn pending_of(&self, task: TimerTask) -> usize {
        self.entries.values().filter(|s| s.task == task).count()
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, due_at: Millis, task: TimerTask, round: RoundId) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            (due_at, id),
            Scheduled {
                id,
                task,
                round,
                due_at,
            },
        );
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(_, tid), _| *tid != id);
        self.entries.len() != before
    }

    fn cancel_all(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    fn pop_due(&mut self, now: Millis) -> Option<Scheduled> {
        let key = *self.entries.keys().next()?;
        if key.0 > now {
            return None;
        }
        self.entries.remove(&key)
    }

    fn next_due(&self) -> Option<Millis> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    fn pending(&self) -> usize {
        self.entries.len()
    }
}

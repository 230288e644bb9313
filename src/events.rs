use crate::game::GameState;
use crate::score::Outcome;
use crate::slot::SlotIndex;
use crate::target::Tier;

/// Notifications for the presentation layer, queued in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    StateChanged {
        from: GameState,
        to: GameState,
    },
    TargetSpawned {
        slot: SlotIndex,
        tier: Tier,
    },
    /// The target left the grid, either by timing out or by being cleared
    TargetExpired {
        slot: SlotIndex,
    },
    HitResolved {
        slot: SlotIndex,
        tier: Tier,
        points: u32,
    },
    CountdownTick {
        remaining_secs: u32,
    },
    RoundEnded {
        outcome: Outcome,
        points: u32,
        win_score: u32,
        diamond_hits: u32,
    },
}

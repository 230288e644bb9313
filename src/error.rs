use std::fmt;

use crate::game::GameState;
use crate::timer::RoundId;

/// Control operations that can be refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Action {
    Start,
    Pause,
    Resume,
    Stop,
    Dismiss,
    SelectDifficulty,
}

/// Everything the engine can refuse or ignore. None of these are fatal:
/// state is left untouched and callers are free to drop the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    /// The action has no transition from the current state
    InvalidTransition { from: GameState, action: Action },
    /// Difficulty can only change while idle
    DifficultyLocked { state: GameState },
    /// A spawn was requested on a grid with no slots
    EmptyGrid,
    /// A timer scheduled by an earlier round fired
    StaleTimer {
        scheduled_round: RoundId,
        live_round: RoundId,
    },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::InvalidTransition { from, action } => {
                write!(f, "cannot {} while {}", action, from)
            }
            GameError::DifficultyLocked { state } => {
                write!(f, "difficulty is locked while {}", state)
            }
            GameError::EmptyGrid => write!(f, "grid has no slots"),
            GameError::StaleTimer {
                scheduled_round,
                live_round,
            } => write!(
                f,
                "timer from round {} fired during round {}",
                scheduled_round, live_round
            ),
        }
    }
}

impl std::error::Error for GameError {}

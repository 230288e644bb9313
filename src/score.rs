use serde::{Deserialize, Serialize};

use crate::target::{Tier, TierPoints};

/// Terminal result of a round
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Outcome {
    Win,
    Lose,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub points: u32,
    pub diamond_hits: u32,
}

/// Sole owner of the running score
#[derive(Debug, Clone, Default)]
pub struct ScoreKeeper {
    points_table: TierPoints,
    state: ScoreState,
}

impl ScoreKeeper {
    pub fn new(points_table: TierPoints) -> Self {
        Self {
            points_table,
            state: ScoreState::default(),
        }
    }

    pub fn state(&self) -> ScoreState {
        self.state
    }

    pub fn points(&self) -> u32 {
        self.state.points
    }

    /// Credit a validated hit; returns the points it earned
    pub fn award(&mut self, tier: Tier) -> u32 {
        let earned = self.points_table.for_tier(tier);
        self.state.points = self.state.points.saturating_add(earned);
        if tier == Tier::Diamond {
            self.state.diamond_hits += 1;
        }
        earned
    }

    /// Win iff the score reached the target (inclusive)
    pub fn evaluate(&self, win_score: u32) -> Outcome {
        if self.state.points >= win_score {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }

    pub fn reset(&mut self) {
        self.state = ScoreState::default();
    }
}

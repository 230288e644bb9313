use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Difficulty;
use crate::events::GameEvent;
use crate::score::{Outcome, ScoreState};

/// One finished round as written to the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub date: DateTime<Local>,
    pub difficulty: Difficulty,
    pub round_secs: u32,
    pub points: u32,
    pub win_score: u32,
    pub diamond_hits: u32,
    pub outcome: Outcome,
}

impl RoundRecord {
    pub fn new(
        difficulty: Difficulty,
        round_secs: u32,
        score: ScoreState,
        win_score: u32,
        outcome: Outcome,
    ) -> Self {
        Self {
            date: Local::now(),
            difficulty,
            round_secs,
            points: score.points,
            win_score,
            diamond_hits: score.diamond_hits,
            outcome,
        }
    }

    /// Record exactly what a `RoundEnded` event announced; `None` for other events
    pub fn from_event(difficulty: Difficulty, round_secs: u32, event: &GameEvent) -> Option<Self> {
        match *event {
            GameEvent::RoundEnded {
                outcome,
                points,
                win_score,
                diamond_hits,
            } => Some(Self::new(
                difficulty,
                round_secs,
                ScoreState {
                    points,
                    diamond_hits,
                },
                win_score,
                outcome,
            )),
            _ => None,
        }
    }
}

/// Append-only CSV log of finished rounds
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &RoundRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet, emit a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()
    }

    pub fn load(&self) -> io::Result<Vec<RoundRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize::<RoundRecord>() {
            records.push(row?);
        }
        Ok(records)
    }

    /// Highest score logged for a difficulty
    pub fn best_for(&self, difficulty: Difficulty) -> Option<u32> {
        self.load()
            .ok()?
            .into_iter()
            .filter(|r| r.difficulty == difficulty)
            .map(|r| r.points)
            .max()
    }
}

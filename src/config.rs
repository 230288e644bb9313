use clap::ValueEnum;
use directories::ProjectDirs;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::clock::Millis;
use crate::target::{TierOdds, TierPoints};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Next level in the selector cycle
    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Normal,
            Difficulty::Normal => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }
}

/// Per-difficulty round parameters, fixed for the duration of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub min_visible_ms: Millis,
    pub max_visible_ms: Millis,
    pub win_score: u32,
}

impl RoundConfig {
    /// How long the next target stays up: fixed when the bounds coincide,
    /// otherwise uniform over the inclusive range.
    pub fn visible_for<R: Rng + ?Sized>(&self, rng: &mut R) -> Millis {
        if self.min_visible_ms >= self.max_visible_ms {
            self.min_visible_ms
        } else {
            rng.gen_range(self.min_visible_ms..=self.max_visible_ms)
        }
    }

    fn sanitized(self) -> Self {
        if self.min_visible_ms > self.max_visible_ms {
            Self {
                min_visible_ms: self.max_visible_ms,
                max_visible_ms: self.min_visible_ms,
                ..self
            }
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundTable {
    pub easy: RoundConfig,
    pub normal: RoundConfig,
    pub hard: RoundConfig,
}

impl Default for RoundTable {
    fn default() -> Self {
        Self {
            easy: RoundConfig {
                min_visible_ms: 1100,
                max_visible_ms: 1100,
                win_score: 350,
            },
            normal: RoundConfig {
                min_visible_ms: 900,
                max_visible_ms: 900,
                win_score: 450,
            },
            hard: RoundConfig {
                min_visible_ms: 650,
                max_visible_ms: 850,
                win_score: 500,
            },
        }
    }
}

impl RoundTable {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> RoundConfig {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
        }
    }
}

/// Largest grid the keyboard can address (digits 1-9 then 0)
pub const MAX_GRID: usize = 10;

/// Every tunable of the game, persisted as JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub difficulty: Difficulty,
    pub grid_size: usize,
    pub round_secs: u32,
    /// Extra time after expiry during which a hit still counts
    pub grace_ms: Millis,
    /// Pause after a credited hit before the next target may appear
    pub settle_ms: Millis,
    pub odds: TierOdds,
    pub points: TierPoints,
    pub rounds: RoundTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            grid_size: 9,
            round_secs: 30,
            grace_ms: 350,
            settle_ms: 250,
            odds: TierOdds::default(),
            points: TierPoints::default(),
            rounds: RoundTable::default(),
        }
    }
}

impl Config {
    pub fn round_config(&self) -> RoundConfig {
        self.rounds.for_difficulty(self.difficulty)
    }

    /// Repair values a hand-edited file could get wrong
    pub fn sanitized(self) -> Self {
        Self {
            grid_size: self.grid_size.min(MAX_GRID),
            odds: self.odds.sanitized(),
            rounds: RoundTable {
                easy: self.rounds.easy.sanitized(),
                normal: self.rounds.normal.sanitized(),
                hard: self.rounds.hard.sanitized(),
            },
            ..self
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "whackamole") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("whackamole_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg.sanitized(),
                Err(e) => log::warn!("ignoring unreadable config {}: {}", self.path.display(), e),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

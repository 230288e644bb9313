// Library surface: the game engine plus the terminal pieces the binary
// and the headless integration tests share.
pub mod app_dirs;
pub mod arbiter;
pub mod clock;
pub mod config;
pub mod controls;
pub mod error;
pub mod events;
pub mod game;
pub mod history;
pub mod runtime;
pub mod scheduler;
pub mod score;
pub mod slot;
pub mod target;
pub mod timer;
pub mod ui;

pub use config::{Config, Difficulty};
pub use error::GameError;
pub use events::GameEvent;
pub use game::{Game, GameState, Judgement};

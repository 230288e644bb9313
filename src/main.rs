use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    time::Duration,
};

use whackamole::{
    app_dirs::AppDirs,
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, Difficulty, FileConfigStore, MAX_GRID},
    controls::{command_for, Command},
    events::GameEvent,
    game::{Game, GameState, Judgement},
    history::{HistoryLog, RoundRecord},
    runtime::{CrosstermEventSource, FixedTicker, Runner, TermEvent},
    timer::Scheduler,
    ui::GameView,
};

const TICK_RATE_MS: u64 = 20;

/// terminal whack-a-mole: hit the targets before they duck back down
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// difficulty level
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// round length in seconds
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// number of slots on the grid (keys 1-9 and 0)
    #[clap(short = 'g', long, value_parser = clap::value_parser!(u16).range(0..=MAX_GRID as i64))]
    grid: Option<u16>,

    /// seed for a reproducible sequence of targets
    #[clap(long)]
    seed: Option<u64>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Apply command line overrides on top of the stored config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(seconds) = self.seconds {
            config.round_secs = seconds;
        }
        if let Some(grid) = self.grid {
            config.grid_size = grid as usize;
        }
        config
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    // the terminal belongs to the game, so logs go to a file
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .target(env_logger::Target::Pipe(Box::new(file)))
            .try_init();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    if cli.save_config {
        store.save(&config)?;
    }

    let mut game = match cli.seed {
        Some(seed) => Game::with_seed(config, SystemClock::new(), seed),
        None => Game::new(config, SystemClock::new()),
    };
    let history = AppDirs::history_path().map(HistoryLog::with_path);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut game, history.as_ref());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    game: &mut Game<SystemClock>,
    history: Option<&HistoryLog>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut best = history.and_then(|h| h.best_for(game.difficulty()));
    let mut last: Option<Judgement> = None;

    loop {
        game.advance();
        for event in game.drain_events() {
            match event {
                GameEvent::RoundEnded { points, .. } => {
                    let record =
                        RoundRecord::from_event(game.difficulty(), game.config().round_secs, &event);
                    if let (Some(h), Some(record)) = (history, record) {
                        if let Err(e) = h.append(&record) {
                            log::warn!("could not write {}: {}", h.path().display(), e);
                        }
                    }
                    best = Some(best.map_or(points, |b| b.max(points)));
                }
                GameEvent::StateChanged {
                    to: GameState::Running,
                    from: GameState::Idle | GameState::Ended,
                } => last = None,
                _ => {}
            }
        }

        let snapshot = game.snapshot();
        terminal.draw(|f| {
            f.render_widget(
                GameView {
                    snapshot: &snapshot,
                    best,
                    last,
                },
                f.area(),
            )
        })?;

        // wake for the next spawn or countdown even between frames
        let wait = game.timers().next_due().map_or(Duration::MAX, |due| {
            Duration::from_millis(due.saturating_sub(game.clock().now()))
        });
        let key = match runner.step_within(wait) {
            TermEvent::Key(key) => key,
            TermEvent::Tick | TermEvent::Resize => continue,
        };

        match command_for(key, game.config().grid_size) {
            Some(Command::Quit) => break,
            Some(Command::Hit(slot)) => last = Some(game.whack(slot)),
            Some(Command::Start) => {
                let _ = game.start();
            }
            Some(Command::TogglePause) => {
                let _ = if game.state() == GameState::Paused {
                    game.resume()
                } else {
                    game.pause()
                };
            }
            Some(Command::Stop) => {
                let _ = game.stop();
            }
            Some(Command::Dismiss) => {
                let _ = game.dismiss();
            }
            Some(Command::CycleDifficulty) => {
                if game.select_difficulty(game.difficulty().next()).is_ok() {
                    best = history.and_then(|h| h.best_for(game.difficulty()));
                }
            }
            None => {}
        }
    }

    Ok(())
}

mod app;
mod audio;
mod cycle;
mod history;
mod settings;
mod store;
mod ui;
mod voice;

use app::{AppState, SpeakerFactory, handle_input};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use cycle::TICK_RATE;
use history::History;
use ratatui::prelude::*;
use settings::{Settings, ThemeName};
use std::{fs, io, path::PathBuf, sync::Mutex, time::Instant};
use store::{HISTORY_FILE, LOG_FILE, SETTINGS_FILE, Store};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Type Aliases
// ============================================================================

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "ninjaflow - box breathing in your terminal")]
struct Args {
    /// Seconds per phase (2-10)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(2..=10))]
    phase: Option<u64>,
    /// Daily goal in minutes (1-60)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=60))]
    goal: Option<u64>,
    #[arg(short = 't', long)]
    theme: Option<ThemeName>,
    /// Audio file looped in the background during sessions
    #[arg(long)]
    soundscape: Option<PathBuf>,
    #[arg(long)]
    no_voice: bool,
    /// Where settings, history and the log live
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Log filter, e.g. `debug` or `ninjaflow=trace`. Falls back to RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(p) = self.phase { settings.phase_duration = p; }
        if let Some(g) = self.goal { settings.goal_duration = g; }
        if let Some(t) = self.theme { settings.theme = t; }
        if let Some(s) = &self.soundscape {
            settings.soundscape = Some(s.clone());
            settings.soundscape_enabled = true;
        }
        if self.no_voice { settings.voice_enabled = false; }
        settings
    }
}

// ============================================================================
// Logging
// ============================================================================

/// The TUI owns the terminal, so logs go to a file in the data directory.
/// The file holds the current run only.
fn init_logging(store: &Store, level: Option<&str>) -> Result<()> {
    let log_file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(store.path(LOG_FILE))?;

    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

fn main() -> Result<()> {
    let args = Args::parse();
    let store = Store::open(args.data_dir.clone().unwrap_or_else(Store::default_root))?;
    init_logging(&store, args.log_level.as_deref())?;
    tracing::info!(data_dir = %store.root().display(), "starting");

    let stored: Settings = store.load_or_default(SETTINGS_FILE);
    let settings = args.apply(stored.clamped());
    let loaded = store.load_or_backup::<History>(HISTORY_FILE);

    let make_speaker: SpeakerFactory = Box::new(voice::speaker_for);
    let mut app = match loaded {
        Ok(history) => AppState::new(settings, history, store, make_speaker),
        Err(e) => {
            tracing::error!("{e}; history will not be saved this run");
            AppState::new(settings, History::default(), store, make_speaker).with_read_only_history()
        }
    };

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        default_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, &mut app);

    app.save_on_quit(Instant::now());
    restore_terminal();
    terminal.show_cursor()?;

    if let Err(e) = &res {
        tracing::error!("exiting with error: {e}");
    } else {
        tracing::info!("bye");
    }
    res
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut AppState) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::render_ui(f, app))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_input(key, app, Instant::now()) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.update(Instant::now());
            last_tick = Instant::now();
        }
    }
}

//! `crewboard`: committee task board for event staff.
//!
//! Connects to a `crewboard-store` server and shows the board behind an
//! admin password. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/crewboard/config.toml`).
//!
//! ```bash
//! # Offline demo data
//! cargo run --bin crewboard -- --offline
//!
//! # Against a store
//! CREWBOARD_STORE_URL=ws://127.0.0.1:9400/ws cargo run --bin crewboard
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use crewboard::app::{self, App, BoardEvent};
use crewboard::board::{BoardCache, TaskController};
use crewboard::config::{CliArgs, ClientConfig};
use crewboard::gate::PasswordGate;
use crewboard::store::TaskStore;
use crewboard::store::memory::MemoryStore;
use crewboard::store::remote::RemoteStore;
use crewboard::ui;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Logs go to a file, since ratatui owns the terminal.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("crewboard starting");

    // Connect before taking over the terminal so failures stay readable.
    let remote = if config.offline {
        tracing::info!("offline mode, using demo data");
        None
    } else {
        match RemoteStore::connect(&config.store_url, config.connect_timeout).await {
            Ok(store) => Some(store),
            Err(e) => {
                eprintln!("Error: could not reach store at {}: {e}", config.store_url);
                std::process::exit(1);
            }
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = match remote {
        Some(store) => run_app(&mut terminal, Arc::new(store), &config).await,
        None => run_app(&mut terminal, Arc::new(MemoryStore::demo()), &config).await,
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("crewboard exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("crewboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
async fn run_app<S: TaskStore>(
    terminal: &mut Term,
    store: Arc<S>,
    config: &ClientConfig,
) -> io::Result<()> {
    let board = BoardCache::shared();
    let controller = TaskController::new(store, Arc::clone(&board), config.board_settings());
    let gate = PasswordGate::new(config.admin_password.clone());
    let mut app = App::new(board, gate);

    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<BoardEvent>();

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.apply_event(event);
        }

        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if let Some(command) = app.handle_key_event(key) {
                tracing::debug!(?command, "dispatching");
                app::spawn_command(&controller, command, evt_tx.clone());
            }
        }

        if app.should_quit {
            return Ok(());
        }

        // Keep the runtime's other tasks moving between frames.
        tokio::task::yield_now().await;
    }
}

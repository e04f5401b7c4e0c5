//! Rankboard TUI: four-panel terminal interface for stock return rankings.
//!
//! Panels:
//! 1. Query: frequency, date window, top N, include negatives
//! 2. Rankings: sortable, filterable table with export
//! 3. Charts: top and bottom performers by latest return
//! 4. Help: keyboard shortcuts and error history

mod app;
mod input;
mod logging;
mod persistence;
mod theme;
mod ui;
mod worker;

#[cfg(test)]
mod test_helpers;

use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use rankboard_core::AppConfig;

use crate::app::{AppState, Overlay, QueryTrigger};
use crate::worker::{QueryGeneration, WorkerCommand};

/// Environment variable that overrides the config file location.
const CONFIG_ENV: &str = "RANKBOARD_CONFIG";

fn main() -> Result<()> {
    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    // Paths
    let app_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rankboard");
    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| app_dir.join("config.toml"));
    let state_path = app_dir.join("state.json");
    let log_path = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rankboard")
        .join("rankboard.log");

    if let Err(e) = logging::init(&log_path) {
        eprintln!("warning: logging disabled: {e:#}");
    }

    let config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;
    tracing::info!(
        config = %config_path.display(),
        database = %config.database.path.display(),
        "starting rankboard-tui"
    );

    // Load persisted state
    let persisted = persistence::load(&state_path);

    // Worker channels
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let generation = QueryGeneration::new();

    // Spawn worker
    let worker_handle = worker::spawn_worker(cmd_rx, resp_tx, generation.clone())
        .context("spawn query worker")?;

    // Build app state
    let database_exists = config.database.path.exists();
    let mut app = AppState::new(config, cmd_tx.clone(), resp_rx, generation);

    // Apply persisted state; a first run shows the welcome overlay.
    match persisted {
        Some(state) => persistence::apply(&mut app, state),
        None => app.overlay = Overlay::Welcome,
    }

    if database_exists {
        app.start_query(QueryTrigger::Manual);
    } else {
        app.set_warning(format!(
            "Database {} not found; run `rankboard init-db --demo` to create one",
            app.config.database.path.display()
        ));
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the main event loop
    let result = run_app(&mut terminal, &mut app);

    // Save state before exit
    let persisted = persistence::extract(&app);
    if let Err(e) = persistence::save(&state_path, &persisted) {
        tracing::warn!(error = %e, "failed to save state");
    }

    // Shutdown worker
    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("rankboard-tui stopped");
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Drain worker responses (non-blocking)
        app.drain_worker();

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Auto-refresh timer
        app.tick(Instant::now());

        // 5. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}

//! cefscreen TUI: closed-end fund screen in the terminal.
//!
//! Layout:
//! 1. Control panel: minimum market cap, main group, Reload / Refresh
//! 2. Results: color-scaled grid, scrollable both ways
//! 3. Log: activity log, warnings and errors highlighted
//!
//! Traces go to the file named by `CEFSCREEN_LOG`, if set.

mod app;
mod input;
mod theme;
mod ui;

use std::fs::File;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use cefscreen_runner::dashboard::{Action, Dashboard};
use cefscreen_runner::{Screener, ScreenerConfig};

use crate::app::App;

const LOG_ENV: &str = "CEFSCREEN_LOG";

#[derive(Parser)]
#[command(name = "cefscreen-tui", about = "Closed-end fund screen dashboard")]
struct Args {
    /// Configuration file (defaults to ./cefscreen.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Screen the built-in synthetic universe with the local engine.
    #[arg(long, default_value_t = false)]
    demo: bool,
}

fn init_tracing() -> Result<()> {
    let Some(path) = std::env::var_os(LOG_ENV) else {
        return Ok(());
    };
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", PathBuf::from(&path).display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let config = ScreenerConfig::load(args.config.as_deref()).context("failed to load config")?;
    let client = config.client(args.demo)?;
    tracing::info!(client = client.name(), demo = args.demo, "starting dashboard");
    let screener = Screener::new(client, config.query_builder());
    let dashboard = Dashboard::new(screener, config.initial_params(), config.display.log_capacity);
    let mut app = App::new(dashboard);

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!(ok = result.is_ok(), "dashboard closed");
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Populate the group dropdown before the first screen.
    if app.dashboard.groups().len() <= 1 {
        app.trigger(Action::ReloadGroups);
    }

    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. A queued action runs once its busy frame is on screen.
        if app.dashboard.is_busy() {
            app.run_pending();
            continue;
        }

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}

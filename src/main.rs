//! Tickerdash - a terminal dashboard for a single equity's price trend and volume.

mod api;
mod app;
mod cli;
mod config;
mod fetch;
mod models;
mod store;
mod ui;

use anyhow::{Context, Result};
use api::{MarketData, YahooClient};
use app::{App, Mode};
use cli::Args;
use config::Config;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use models::{AlertDirection, Period};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();

    if args.sample_config {
        println!("{}", config::sample_config());
        return Ok(());
    }

    // Load configuration
    let config = if let Some(ref path) = args.config {
        Config::load(path)?
    } else {
        Config::load_or_default()
    };

    // The TUI owns the terminal, so logs roll to a file under the data dir.
    let data_dir = config::resolve_data_dir(&args, &config);
    let _log_guard = init_logging(&data_dir)?;
    info!(data_dir = %data_dir.display(), "starting");

    let client = YahooClient::new(args.timeout.unwrap_or(config.general.timeout))?;
    let mut app = App::new(client, &args, &config)?;

    // Query the startup symbol right away.
    app.request_fetch(true);

    run_interactive(&mut app).await
}

/// Initialize tracing with a daily-rolling file appender.
///
/// `RUST_LOG` controls the filter; the default keeps our own crate at info.
fn init_logging(data_dir: &Path) -> Result<WorkerGuard> {
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, "tickerdash.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "tickerdash=info".into()),
        )
        .init();

    Ok(guard)
}

/// Run the TUI, restoring the terminal however the loop ends.
async fn run_interactive<P: MarketData + 'static>(app: &mut App<P>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop.
async fn run_app<P: MarketData + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<P>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        // Draw UI
        terminal.draw(|f| ui::render(f, app))?;

        // Handle events with timeout
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Some platforms deliver both press and release events.
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, key.code, key.modifiers);
                }
            }
        }

        // Apply any completed fetch, then let the refresh timer fire.
        app.poll_fetch();
        app.tick_auto_refresh();

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

/// Handle keyboard input according to the current input mode.
fn handle_key_event<P: MarketData + 'static>(
    app: &mut App<P>,
    code: KeyCode,
    modifiers: KeyModifiers,
) {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    // Close help overlay on any key
    if app.show_help {
        app.show_help = false;
        return;
    }

    // A modal notice swallows the next key
    if app.notice.is_some() {
        app.dismiss_notice();
        return;
    }

    match app.mode {
        Mode::Normal => handle_normal_key(app, code),
        Mode::EditSymbol => handle_symbol_entry_key(app, code),
        Mode::AlertPrice => handle_alert_price_key(app, code),
        Mode::AlertDirection => handle_alert_direction_key(app, code),
    }
}

fn handle_normal_key<P: MarketData + 'static>(app: &mut App<P>, code: KeyCode) {
    match code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Search
        KeyCode::Char('/') | KeyCode::Char('s') => app.start_symbol_entry(),
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('R') => app.request_fetch(true),

        // Periods
        KeyCode::Char('1') => app.set_period(Period::Day),
        KeyCode::Char('2') => app.set_period(Period::Week),
        KeyCode::Char('3') => app.set_period(Period::Month),
        KeyCode::Char('4') => app.set_period(Period::Quarter),
        KeyCode::Char('5') => app.set_period(Period::Year),

        // Favorites and alerts
        KeyCode::Char('f') => app.toggle_favorite(),
        KeyCode::Tab => app.select_next_favorite(),
        KeyCode::Char('a') => app.open_alert_dialog(),

        // Refresh timer
        KeyCode::Char('r') => app.toggle_auto_refresh(),

        // Help
        KeyCode::Char('h') | KeyCode::Char('?') => app.show_help = true,

        _ => {}
    }
}

fn handle_symbol_entry_key<P: MarketData + 'static>(app: &mut App<P>, code: KeyCode) {
    match code {
        KeyCode::Esc => app.cancel_dialog(),
        KeyCode::Enter => app.submit_symbol(),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) if is_symbol_char(c) => app.input.push(c),
        _ => {}
    }
}

fn handle_alert_price_key<P: MarketData + 'static>(app: &mut App<P>, code: KeyCode) {
    match code {
        KeyCode::Esc => app.cancel_dialog(),
        KeyCode::Enter => app.submit_alert_price(),
        KeyCode::Backspace => {
            app.alert_price_input.pop();
        }
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => app.alert_price_input.push(c),
        _ => {}
    }
}

fn handle_alert_direction_key<P: MarketData + 'static>(app: &mut App<P>, code: KeyCode) {
    match code {
        KeyCode::Esc => app.cancel_dialog(),
        KeyCode::Char('a') | KeyCode::Up => app.choose_alert_direction(AlertDirection::Above),
        KeyCode::Char('b') | KeyCode::Down => app.choose_alert_direction(AlertDirection::Below),
        _ => {}
    }
}

/// Characters accepted in the ticker input.
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')
}

mod api;
mod app;
mod config;
mod convert;
mod db;
mod error;
mod history;
mod poll;
mod theme;
mod types;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{error, info};

use api::CoinGeckoClient;
use app::App;
use config::Config;
use db::Db;
use poll::Poller;
use types::InputMode;

#[derive(Debug, Parser)]
#[command(name = "btcbrl", version, about = "Live Bitcoin to Brazilian Real converter")]
struct Cli {
    /// Config file (default: <config dir>/btcbrl/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for the local store and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let data_dir = cli.data_dir.unwrap_or_else(Config::data_dir);
    init_logging(&data_dir)?;

    let db = Db::open(&data_dir.join("btcbrl.db"))?;
    let client = CoinGeckoClient::new(&config.api_base_url, config.request_timeout())?;
    let poller = Poller::start(config.refresh_interval(), Instant::now());
    let mut app = App::new(db, client, poller);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        error!(error = %e, "fatal");
        eprintln!("Error: {}", e);
    }

    Ok(())
}

/// Daily-rotated log file under `<data_dir>/logs`. Filter with `RUST_LOG`.
fn init_logging(data_dir: &Path) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "btcbrl.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "btcbrl=debug,info".into()),
        )
        .init();

    info!(?log_dir, "logging initialised");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);

    app.spawn_fetch();

    loop {
        app.on_tick(Instant::now());

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
                Event::FocusLost => app.set_visible(false, Instant::now()),
                Event::FocusGained => app.set_visible(true, Instant::now()),
                _ => {}
            }
        }

        if app.quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        app.quit = true;
        return;
    }

    match app.input_mode {
        InputMode::ConfirmClearHistory => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.resolve_clear_history(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.resolve_clear_history(false)
            }
            _ => {}
        },
        InputMode::Normal => match key.code {
            KeyCode::Enter => {
                // shown through app.input_error
                let _ = app.convert();
            }
            KeyCode::Esc => app.clear_input(),
            KeyCode::Backspace => {
                app.input_buf.pop();
            }
            KeyCode::Char('x') if ctrl => app.request_clear_history(),
            KeyCode::Char('t') if ctrl => app.toggle_theme(),
            KeyCode::Char('r') if ctrl => {
                app.spawn_fetch();
            }
            KeyCode::Char(c) if !ctrl => app.input_buf.push(c),
            _ => {}
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use crate::types::Rate;

    fn app() -> App {
        let db = Db::open_in_memory().unwrap();
        let client = CoinGeckoClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let mut app = App::new(db, client, Poller::start(Duration::from_secs(30), Instant::now()));
        app.apply_fetch(Ok(Rate::new(350_000.0).unwrap()), Local::now());
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App, c: char) {
        handle_key(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn enter_converts_typed_amount() {
        let mut app = app();
        type_str(&mut app, "0,5");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.result.as_ref().map(|r| r.amount_fiat), Some(175_000.0));
        assert_eq!(app.history.len(), 1);
    }

    #[test]
    fn backspace_and_escape_edit_input() {
        let mut app = app();
        type_str(&mut app, "12");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input_buf, "1");
        press(&mut app, KeyCode::Esc);
        assert!(app.input_buf.is_empty());
    }

    #[test]
    fn ctrl_x_asks_before_clearing() {
        let mut app = app();
        type_str(&mut app, "1");
        press(&mut app, KeyCode::Enter);

        ctrl(&mut app, 'x');
        assert_eq!(app.input_mode, InputMode::ConfirmClearHistory);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.history.len(), 1);

        ctrl(&mut app, 'x');
        press(&mut app, KeyCode::Char('y'));
        assert!(app.history.is_empty());
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn ctrl_t_toggles_theme_without_typing() {
        let mut app = app();
        let before = app.theme_pref;
        ctrl(&mut app, 't');
        assert_eq!(app.theme_pref, before.toggled());
        assert!(app.input_buf.is_empty());
    }

    #[test]
    fn ctrl_q_quits() {
        let mut app = app();
        ctrl(&mut app, 'q');
        assert!(app.quit);
    }

    #[test]
    fn cli_flags() {
        let cli = Cli::try_parse_from(["btcbrl", "--data-dir", "/tmp/x", "--config", "c.yaml"])
            .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
    }
}

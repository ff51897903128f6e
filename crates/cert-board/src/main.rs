mod state;
mod theme;
mod ui;

use anyhow::{Context as _, Result};
use cert_storage::{load_config, resolve_data_dir, KeyValueStore, Store, DATABASE_FILE};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::{self, OpenOptions},
    io,
    path::Path,
    sync::mpsc::{self, Receiver},
    sync::Mutex,
    time::Duration,
    time::Instant,
};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "board.log";
const USAGE: &str = "usage: certdash-board [CERTIFICATION_ID | DARP_KEY]";

fn main() -> Result<()> {
    let target = std::env::args().nth(1);
    if matches!(target.as_deref(), Some("-h" | "--help")) {
        println!("{USAGE}");
        return Ok(());
    }

    let root = std::env::current_dir()?;
    let config = load_config(&root);
    let data_dir = resolve_data_dir(&root, &config);
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    init_logging(&data_dir);

    let store = Store::open(&data_dir)
        .with_context(|| format!("Failed to open store in {}", data_dir.display()))?;
    let mut app = state::App::new(store, target);
    app.refresh();

    let (watcher, watch_rx) = setup_watcher(&data_dir);
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, watch_rx);
    restore_terminal(&mut terminal)?;
    drop(watcher);

    if let Err(err) = result {
        tracing::error!(error = %err, "board exited with an error");
        eprintln!("certdash-board: {err}");
    }

    Ok(())
}

/// Logs go to a file so they never draw over the board.
fn init_logging(data_dir: &Path) {
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))
    else {
        return;
    };
    let level = std::env::var("CERTDASH_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app<B: KeyValueStore>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut state::App<B>,
    watch_rx: Option<Receiver<()>>,
) -> Result<()> {
    // Without a watcher the board polls the store instead.
    let poll_rate = Duration::from_secs(2);
    let input_poll = Duration::from_millis(100);
    let mut last_poll = Instant::now();

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(input_poll)? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                    app.handle_key(key);
                }
            }
        }

        match &watch_rx {
            Some(rx) => {
                let mut changed = false;
                while rx.try_recv().is_ok() {
                    changed = true;
                }
                if changed {
                    tracing::debug!("data directory changed, reloading");
                    app.refresh();
                }
            }
            None if last_poll.elapsed() >= poll_rate => {
                app.refresh();
                last_poll = Instant::now();
            }
            None => {}
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

fn setup_watcher(data_dir: &Path) -> (Option<RecommendedWatcher>, Option<Receiver<()>>) {
    let (tx, rx) = mpsc::sync_channel(1);
    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else {
                return;
            };
            // board.log lives in the same directory
            let touches_db = event.paths.iter().any(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(DATABASE_FILE))
            });
            if touches_db && !event.kind.is_access() {
                let _ = tx.try_send(());
            }
        },
        Config::default(),
    ) {
        Ok(watcher) => watcher,
        Err(err) => {
            tracing::warn!(error = %err, "file watcher unavailable, polling instead");
            return (None, None);
        }
    };

    if let Err(err) = watcher.watch(data_dir, RecursiveMode::NonRecursive) {
        tracing::warn!(error = %err, "failed to watch data directory, polling instead");
        return (None, None);
    }

    (Some(watcher), Some(rx))
}

//! pagewatch: watches a public page and alerts on new posts.
//!
//! ## Architecture overview
//!
//! ```text
//!                      MonitorCommand              ┌──────────┐
//!   ┌──────────┐  ◄────────────────────────────── │  app.rs  │ ◄── input.rs
//!   │monitor.rs│                                   │  ui.rs   │
//!   │  (task)  │  ──────────────────────────────► │ (TUI)    │
//!   └────┬─────┘      ServiceStatus (watch)        └──────────┘
//!        │                                          ┌──────────┐
//!        │ run()                        ◄─────────► │ http.rs  │
//!   ┌────▼─────┐   fetch()   ┌──────────┐           └──────────┘
//!   │ cycle.rs │ ──────────► │ source/  │
//!   └────┬─────┘             └──────────┘
//!        │ partition / load / save / notify
//!   detector.rs  store.rs  notify/
//! ```
//!
//! * **`source/`**: the `PostSource` trait, the Graph API and scraping
//!   sources, and the `Post` type.
//! * **`fingerprint`** / **`detector`**: deciding which posts are new.
//! * **`store`**: the JSON file of already-seen posts.
//! * **`cycle`**: one fetch → detect → notify → persist pass.
//! * **`monitor`**: the background task that schedules cycles.
//! * **`app`** / **`ui`** / **`input`**: the terminal dashboard.
//! * **`http`**: the optional status/control API.
//! * **`main`**: wires everything together: config, logging, runtime, and
//!   either the terminal UI or headless mode.

mod app;
mod config;
mod cycle;
mod detector;
mod error;
mod fingerprint;
mod http;
mod input;
mod monitor;
mod notify;
mod source;
mod status;
mod store;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use app::App;
use config::Settings;
use cycle::CheckCycle;
use error::SourceError;
use monitor::{MonitorCommand, MonitorHandle};
use notify::NotifierMux;
use source::{GraphApiSource, PostSource, ScrapeSource, SourceSet};
use status::ServiceStatus;
use store::SeenStore;

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// The terminal belongs to the UI, so TUI mode logs to a file.
fn init_logging(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    if settings.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.log_file)
            .with_context(|| format!("opening log file {}", settings.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Build whichever sources the configuration allows.  A source that cannot
/// be built is left out; starting it later reports why.
fn build_sources(settings: &Settings) -> SourceSet {
    let api = settings
        .access_token
        .as_deref()
        .ok_or_else(|| SourceError::NotConfigured("FACEBOOK_ACCESS_TOKEN is not set".into()))
        .and_then(|token| {
            GraphApiSource::new(
                &settings.graph_api_url,
                &settings.page_id,
                token,
                settings.posts_limit,
                settings.request_timeout(),
            )
        });
    let scrape = ScrapeSource::new(
        &settings.scrape_base_url,
        &settings.page_id,
        settings.posts_limit as usize,
        settings.request_timeout(),
    );

    SourceSet {
        api: keep_source("api", api.map(|s| Arc::new(s) as Arc<dyn PostSource>)),
        scrape: keep_source("scrape", scrape.map(|s| Arc::new(s) as Arc<dyn PostSource>)),
    }
}

fn keep_source(
    kind: &str,
    built: Result<Arc<dyn PostSource>, SourceError>,
) -> Option<Arc<dyn PostSource>> {
    built
        .map_err(|e| warn!(source = kind, error = %e, "source unavailable"))
        .ok()
}

async fn start_monitor(settings: &Settings) -> (MonitorHandle, JoinHandle<()>) {
    let store = SeenStore::new(&settings.storage_file);
    let interval_secs = settings.check_interval().as_secs();
    let mut status = ServiceStatus::new(&settings.page_id, interval_secs);
    match store.load().await {
        Ok(state) => {
            info!(records = state.records.len(), path = %store.path().display(), "loaded seen posts");
            status = status.with_history(&state);
        }
        Err(e) => warn!(error = %e, "could not read seen posts; the first check will retry"),
    }

    let notifier = NotifierMux::from_settings(settings.webhook_url.as_deref(), settings.request_timeout_secs);
    info!(notifiers = notifier.len(), "notifiers configured");

    let cycle = CheckCycle::new(store, Arc::new(notifier));
    monitor::spawn(cycle, build_sources(settings), settings.check_interval(), status)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let settings = config::load_config();
    init_logging(&settings)?;
    info!(page_id = %settings.page_id, headless = settings.headless, "starting pagewatch");

    let runtime = Runtime::new().context("building tokio runtime")?;
    let (handle, monitor_task) = runtime.block_on(start_monitor(&settings));

    if let Some(addr) = settings.http_addr {
        let handle = handle.clone();
        let default_source = settings.source;
        runtime.spawn(async move {
            if let Err(e) = http::serve(addr, handle, default_source).await {
                error!(error = %e, "dashboard API stopped");
            }
        });
    }

    if settings.headless {
        runtime.block_on(run_headless(&settings, handle, monitor_task))
    } else {
        run_tui(&runtime, &settings, handle, monitor_task)
    }
}

async fn run_headless(settings: &Settings, handle: MonitorHandle, monitor_task: JoinHandle<()>) -> Result<()> {
    handle
        .send(MonitorCommand::Start(settings.source))
        .context("starting monitor")?;

    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    info!("interrupt received, finishing current check");

    // The monitor may already be gone; waiting on the task covers both cases.
    let _ = handle.send(MonitorCommand::Shutdown);
    monitor_task.await.context("monitor task panicked")?;
    info!("stopped");
    Ok(())
}

fn run_tui(runtime: &Runtime, settings: &Settings, handle: MonitorHandle, monitor_task: JoinHandle<()>) -> Result<()> {
    install_panic_hook();

    // -- terminal setup (RAII: Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(handle.status(), settings.source);
    let mut status_rx = handle.subscribe();

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Pick up the latest monitor status.
    //   2. Forward queued commands.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        if status_rx.has_changed().unwrap_or(false) {
            let status = status_rx.borrow_and_update().clone();
            app.sync(status);
        }

        for cmd in app.take_commands() {
            if let Err(e) = handle.send(cmd) {
                app.notice = Some(e.to_string());
            }
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    // Restore the terminal before waiting on a possibly slow in-flight check.
    drop(guard);
    let _ = handle.send(MonitorCommand::Shutdown);
    runtime
        .block_on(monitor_task)
        .context("monitor task panicked")?;
    Ok(())
}

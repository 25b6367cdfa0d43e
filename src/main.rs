//! statusboard — a live service status dashboard for the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌────────────┐  fetch   ┌─────────────┐ RefreshState ┌──────────┐  draw()  ┌──────────┐
//! │ source/    │ ◄─────── │ refresh.rs  │ ───────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (HTTP GET) │          │ (tokio task)│  (channel)   │ (state)  │          │ (render) │
//! └────────────┘          └─────────────┘              └──────────┘          └──────────┘
//!                                ▲ refetch()                 ▲
//!                                └──────── main loop ────────┤ handle_key_event()
//!                                                       ┌──────────┐
//!                                                       │ input.rs │
//!                                                       └──────────┘
//! ```
//!
//! * **`source/`** — the `DataSource` trait, the service data model, and the
//!   HTTP implementation that talks to the status backend.
//! * **`refresh`** — the refresh controller: immediate fetch, fixed-interval
//!   polling, single-flight suppression, and teardown.
//! * **`config`** — environment configuration and the static incident list.
//! * **`app`** — owns presentation state (latest snapshot, selection, etc.).
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` mutations.
//! * **`main`** — wires everything together: read config, start the
//!   controller, set up the terminal, and run the event loop.

mod app;
mod config;
mod input;
mod refresh;
mod source;
mod ui;

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{mpsc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use config::Config;
use refresh::{RefreshController, RefreshState};
use source::HttpSource;

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
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

/// Send tracing output to `log_file`, if one is configured.
///
/// The terminal belongs to the UI, so without a file nothing is logged.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("statusboard=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // -- configuration -------------------------------------------------------
    let mut config = Config::from_env()?;
    if let Some(url) = std::env::args().nth(1) {
        config = config.with_base_url(url)?;
    }
    init_tracing(config.log_file.as_deref())?;
    info!(base_url = %config.base_url, "starting {}", env!("CARGO_PKG_NAME"));

    // -- async runtime -------------------------------------------------------
    // One worker: all refresh work runs cooperatively on a single thread.
    // Entering the runtime lets the UI thread call `refetch()`, which spawns.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    // -- data source ---------------------------------------------------------
    let source = HttpSource::new(config.base_url.as_str());
    let probe = source.clone();
    runtime.spawn(async move {
        match probe.check_health().await {
            Ok(status) => info!(%status, "backend health"),
            Err(e) => warn!(error = %e, "backend health check failed"),
        }
    });

    // -- refresh controller --------------------------------------------------
    let mut controller = RefreshController::new(source, config.poll_interval);
    let (tx, rx) = mpsc::channel::<RefreshState>();
    controller.subscribe(move |state| {
        // If the receiver is gone the UI has exited; nothing to do.
        let _ = tx.send(state.clone());
    });

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    install_panic_hook();
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(config::incidents(), config.poll_interval);

    controller.start();
    app.apply(controller.state());

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Apply any state published by the controller.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to tick_rate).
    //   4. Forward a pending manual refresh.
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Process state updates
        while let Ok(state) = rx.try_recv() {
            app.apply(state);
        }

        // 2. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 3. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        // 4. Manual refresh (suppressed by the controller while loading)
        if app.take_refetch_request() && !controller.refetch() {
            info!("manual refresh ignored; a fetch is already in flight");
        }

        if app.quit {
            break;
        }
    }

    controller.stop();
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}

//! Pricewall TUI: live price wall with category tabs and a virtualized tile grid.
//!
//! Layout:
//! 1. Tab bar: All plus one tab per category, with metadata counts
//! 2. Grid: source headers, subcategory headers, rows of price tiles
//! 3. Status bar: load stage, counts, freshness, last message
//!
//! Only the rows in the virtual window are drawn. Fetches run on the
//! loader's background worker; this thread owns all state.

mod app;
mod input;
mod theme;
mod ui;

use std::fs::{self, File};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use pricewall_core::classify::Classifier;
use pricewall_core::config::PricewallConfig;
use pricewall_loader::{FetchWorker, LiveClock, LoaderSettings, ViewModel};

use crate::app::AppState;

#[derive(Parser, Debug)]
#[command(name = "pricewall", about = "Live price wall in the terminal")]
struct Args {
    /// Config file. Defaults to <config dir>/pricewall/config.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let default_path = dirs::config_dir().map(|d| d.join("pricewall").join("config.toml"));
    let config = PricewallConfig::load_or_default(args.config.as_deref(), default_path.as_deref())
        .context("loading configuration")?;
    let catalog = Arc::new(config.load_catalog().context("loading catalog")?);
    let classifier = Classifier::new(&catalog).context("compiling catalog keyword rules")?;
    let provider = config.build_provider(&catalog).context("building snapshot provider")?;
    tracing::info!(provider = provider.name(), "starting pricewall");

    let mut worker = FetchWorker::spawn(provider, config.loader.worker_threads)?;
    let clock = LiveClock::start(config.clock_interval())?;

    let vm = ViewModel::new(
        Arc::clone(&catalog),
        classifier,
        LoaderSettings {
            freshness: config.freshness(),
            prefetch_stagger: config.prefetch_stagger(),
        },
        config.view.size_model(),
        config.view.overscan,
    );
    let mut app = AppState::new(vm, config.view.clone());

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

    let now = Instant::now();
    let size = terminal.size()?;
    let grid = ui::grid_area(ratatui::layout::Rect::new(0, 0, size.width, size.height), &app);
    app.resize(grid.width, grid.height, now);
    app.mount(&config.loader.default_category, now);

    let result = run_app(&mut terminal, &mut app, &worker, &clock);

    worker.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("pricewall stopped");
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    worker: &FetchWorker,
    clock: &LiveClock,
) -> Result<()> {
    let mut ticks = clock.subscribe();
    let mut dirty = true;
    loop {
        let now = Instant::now();

        // 1. Release due prefetches, refreshes and retries; hand jobs to the worker.
        app.poll(now);
        worker.submit(app.take_outbox());

        // 2. Drain worker responses (non-blocking)
        while let Some(resp) = worker.try_recv() {
            dirty |= app.handle_response(resp, now);
        }
        worker.submit(app.take_outbox());

        // 3. Relative-time labels move on clock ticks only.
        dirty |= ticks.poll();

        // 4. Render
        if dirty {
            terminal.draw(|f| ui::draw(f, app))?;
            dirty = false;
        }

        // 5. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    input::handle_key(app, key, Instant::now());
                    dirty = true;
                }
                Event::Resize(width, height) => {
                    let grid = ui::grid_area(ratatui::layout::Rect::new(0, 0, width, height), app);
                    app.resize(grid.width, grid.height, Instant::now());
                    dirty = true;
                }
                _ => {}
            }
        }

        if !app.running {
            break;
        }
    }
    Ok(())
}

/// Log to a file so the terminal stays clean. `RUST_LOG` overrides the level.
fn init_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pricewall");
    fs::create_dir_all(&dir).with_context(|| format!("creating log directory {}", dir.display()))?;
    let file = File::create(dir.join("pricewall.log")).context("creating log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod data;
mod events;
mod export;
mod poll;
mod source;
mod ui;

use app::App;
use config::Settings;
use data::FleetSummary;
use poll::MonitorSession;
use source::{DeviceService, ServiceClient, SimulatedFleet};

#[derive(Parser, Debug)]
#[command(name = "gpuwatch")]
#[command(about = "Live GPU fleet telemetry with rolling history")]
struct Args {
    /// Path to a TOML config file (default: gpuwatch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device service base URL
    #[arg(short = 'u', long)]
    api_url: Option<String>,

    /// Bearer token for the device service
    #[arg(short, long)]
    token: Option<String>,

    /// Poll interval in milliseconds
    #[arg(short, long)]
    refresh_ms: Option<u64>,

    /// Points kept per metric series
    #[arg(long)]
    history_capacity: Option<usize>,

    /// Drop devices missing from this many consecutive polls
    #[arg(long)]
    evict_after_missed: Option<u32>,

    /// Minimum free memory (MB) for the optimal-device query
    #[arg(long)]
    min_free_memory_mb: Option<u64>,

    /// Write logs to this file (filtered by RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Fetch once, export the fleet state to a JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Use a simulated fleet of N devices instead of the service
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "4")]
    demo: Option<u32>,
}

impl Args {
    /// Command-line flags win over file and environment settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.api_url {
            settings.api_url = url.clone();
        }
        if let Some(token) = &self.token {
            settings.token = Some(token.clone());
        }
        if let Some(ms) = self.refresh_ms {
            settings.refresh_ms = ms;
        }
        if let Some(capacity) = self.history_capacity {
            settings.history_capacity = capacity;
        }
        if let Some(missed) = self.evict_after_missed {
            settings.evict_after_missed = Some(missed);
        }
        if let Some(min) = self.min_free_memory_mb {
            settings.min_free_memory_mb = Some(min);
        }
        if let Some(path) = &self.log_file {
            settings.log_file = Some(path.clone());
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;

    if let Some(path) = &settings.log_file {
        init_logging(path)?;
    }

    let rt = tokio::runtime::Runtime::new()?;
    // Session tasks are spawned onto this runtime from the UI thread
    let _guard = rt.enter();

    let service = build_service(&settings, args.demo)?;

    // Handle export mode (non-interactive)
    if let Some(export_path) = &args.export {
        return export_to_file(&rt, service.as_ref(), export_path);
    }

    let session = MonitorSession::builder(service)
        .history_capacity(settings.history_capacity)
        .retention(settings.retention())
        .timestamp_format(settings.timestamp_format.clone())
        .build()?;

    let mut app = App::new(session, settings.poll_config()?);
    app.start()?;

    run_tui(app)
}

/// Install the file-backed tracing subscriber. Stdout belongs to the TUI.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gpuwatch=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

fn build_service(settings: &Settings, demo: Option<u32>) -> Result<Arc<dyn DeviceService>> {
    if let Some(devices) = demo {
        let mut fleet = SimulatedFleet::new(devices);
        if let Some(min) = settings.min_free_memory_mb {
            fleet = fleet.with_min_free_memory_mb(min as f64);
        }
        return Ok(Arc::new(fleet));
    }

    let mut builder = ServiceClient::builder()
        .base_url(settings.api_url.clone())
        .timeout(settings.request_timeout())
        .min_free_memory_mb(settings.min_free_memory_mb);
    if let Some(token) = &settings.token {
        builder = builder.token(token.clone());
    }
    Ok(Arc::new(builder.build()?))
}

/// Run the TUI until the user quits
fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, &mut app);

    // Stop polling before the runtime goes away
    app.session.stop();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    while app.running {
        // Apply finished fetches before drawing
        app.update();

        terminal.draw(|frame| ui::draw(frame, app))?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    events::handle_mouse_event(app, mouse, ui::CONTENT_START_ROW);
                }
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Fetch once and export the fleet state to a JSON file
fn export_to_file(
    rt: &tokio::runtime::Runtime,
    service: &dyn DeviceService,
    export_path: &Path,
) -> Result<()> {
    let snapshots = rt
        .block_on(service.fetch())
        .with_context(|| format!("Failed to fetch from {}", service.description()))?;

    let summary = FleetSummary::from_snapshots(&snapshots);
    let document = export::report(&snapshots, &summary, None);
    export::write_json(export_path, &document)?;

    println!("Exported fleet state to: {}", export_path.display());
    Ok(())
}

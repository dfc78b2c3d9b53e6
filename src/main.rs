#![forbid(unsafe_code)]

mod app;
mod config;
mod constants;
mod discovery;
mod editor;
mod error;
mod grid;
mod rule;
mod ui;

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use config::{ConfigStore, PrefsStore};
use constants::discovery::{DRM_ROOT, HELPER_TIMEOUT, OUTPUT_HELPER, OUTPUT_HELPER_ARG};
use constants::grid::TERM_ASPECT;
use constants::logging;
use discovery::SystemDiscovery;
use editor::Editor;
use grid::GridRenderer;

/// Terminal editor for compositor monitor rules
#[derive(Parser, Debug)]
#[command(name = "mangomon")]
#[command(version, about = "Arrange monitors and edit monitorrule= lines", long_about = None)]
struct Args {
    /// Monitor config file (default: ~/.config/mango/config.conf)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding DRM connector entries
    #[arg(long, default_value = DRM_ROOT)]
    drm_root: PathBuf,

    /// Program that lists connected outputs (run with -O)
    #[arg(long, default_value = OUTPUT_HELPER)]
    helper: String,

    /// Give up on the output helper after this many milliseconds
    #[arg(long, default_value_t = HELPER_TIMEOUT.as_millis() as u64)]
    helper_timeout: u64,

    /// Height-to-width ratio of one terminal cell
    #[arg(long, default_value_t = TERM_ASPECT)]
    term_aspect: f64,

    /// Log level (trace|debug|info|warn|error); overrides LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_level(name: &str) -> TraceLevel {
    match name.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn log_path() -> PathBuf {
    let mut path = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
    path.push(logging::APP_DIR);
    path.push(logging::FILENAME);
    path
}

/// Log to a file; the terminal belongs to the UI
///
/// When the file cannot be opened no subscriber is installed at all.
fn init_logging(level: Option<&str>) -> Result<()> {
    let level = match level {
        Some(level) => parse_level(level),
        None => parse_level(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())),
    };

    let path = log_path();
    let file = match path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| File::options().create(true).append(true).open(&path))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("mangomon: logging disabled, cannot open {}: {e}", path.display());
            return Ok(());
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "mangomon starting");

    let config_path = args.config.unwrap_or_else(ConfigStore::default_path);
    let discovery = SystemDiscovery::new()
        .with_helper(args.helper, [OUTPUT_HELPER_ARG])
        .with_drm_root(args.drm_root)
        .with_timeout(Duration::from_millis(args.helper_timeout));
    if args.helper_timeout == 0 {
        warn!("Helper timeout of 0 ms, output discovery will always fall back");
    }

    let editor = Editor::bootstrap(
        ConfigStore::open(&config_path),
        PrefsStore::default_location(),
        Box::new(discovery),
    )
    .with_context(|| format!("Failed to load monitor config {}", config_path.display()))?;

    let renderer = if args.term_aspect.is_finite() && args.term_aspect > 0.0 {
        GridRenderer::with_term_aspect(args.term_aspect)
    } else {
        warn!(term_aspect = args.term_aspect, "Invalid cell aspect, using default");
        GridRenderer::default()
    };

    app::run(editor, renderer)
}

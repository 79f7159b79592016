//! Logging configuration
//!
//! Structured logging with tracing. Console output goes to stderr; when a
//! log file is configured every event is also appended to it, giving a
//! per-run transcript.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Plain-text layer appending to the transcript file
pub type FileLayer<S> = fmt::Layer<S, DefaultFields, Format, Mutex<File>>;

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::new(format!("sysmend={}", level))
}

/// Open transcript; logs a closing line when dropped
#[derive(Debug)]
pub struct Transcript {
    path: Option<PathBuf>,
}

impl Transcript {
    /// Log the opening line for `path`, if any
    fn start(path: Option<&Path>) -> Self {
        if let Some(path) = path {
            info!(
                "Transcript started: {} (sysmend v{})",
                path.display(),
                env!("CARGO_PKG_VERSION")
            );
        }
        Self {
            path: path.map(Path::to_path_buf),
        }
    }
}

impl Drop for Transcript {
    fn drop(&mut self) {
        if let Some(ref path) = self.path {
            info!("Transcript stopped: {}", path.display());
        }
    }
}

/// Build the transcript layer, appending to `path`
pub fn file_layer<S>(path: &Path) -> Result<FileLayer<S>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    Ok(fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file)))
}

/// Initialize logging with environment-based filtering and optional transcript file
pub fn init(level: Level, log_file: Option<&Path>) -> Result<Transcript> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));
    let file_layer = log_file.map(file_layer).transpose()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(Transcript::start(log_file))
}

/// Map a level name from configuration
pub fn parse_level(name: &str) -> Level {
    match name.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

//! Logging initialization for samples-flow.
//!
//! Logs go to stderr unless `logging.to_file` is set, in which case they are
//! written to `{state}/logs/samples-flow-{datetime}.log`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Keeps the session log alive
pub struct LoggingHandle {
    /// Flushes buffered file output when dropped; hold it until exit
    pub _guard: Option<WorkerGuard>,

    /// Session log file, when `logging.to_file` is on
    pub log_file_path: Option<PathBuf>,
}

/// Filter directive: `--debug` wins over the configured level
fn level_directive(config: &Config, debug_override: bool) -> String {
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

fn log_file_name(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    format!("samples-flow-{}.log", timestamp.format("%Y%m%dT%H%M%SZ"))
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the configured level. Can only be called
/// once per process.
pub fn init_logging(config: &Config, debug_override: bool) -> Result<LoggingHandle> {
    let directive = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| level_directive(config, debug_override));
    let to_file = config.logging.to_file;

    let (writer, handle) = if to_file {
        let logs_dir = config.logs_path();
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

        let file_name = log_file_name(&chrono::Utc::now());
        let (writer, guard) = file_writer(&logs_dir, &file_name);
        let handle = LoggingHandle {
            _guard: Some(guard),
            log_file_path: Some(logs_dir.join(file_name)),
        };
        (BoxMakeWriter::new(writer), handle)
    } else {
        let handle = LoggingHandle {
            _guard: None,
            log_file_path: None,
        };
        (BoxMakeWriter::new(std::io::stderr), handle)
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(directive))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(!to_file)
                .with_writer(writer),
        )
        .init();

    Ok(handle)
}

/// Non-blocking writer appending to `dir/file_name`
fn file_writer(dir: &Path, file_name: &str) -> (NonBlocking, WorkerGuard) {
    tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
}

//! Tracing subscriber setup
//!
//! Standard output carries the event stream, so logs go to stderr or to a
//! file, never to stdout.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `level`. When logging to a file the
/// returned guard must be held until exit so buffered lines are flushed.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))?,
    };

    match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path {} has no file name", path.display()))?;
            let directory = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(directory).context("Failed to create log directory")?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

            Ok(None)
        }
    }
}

//! Logging setup
//!
//! Logs go to stderr through a `fmt` layer. When a log file is configured the
//! same events are mirrored to it through a non-blocking writer; the returned
//! guard must be kept alive until the program exits so buffered lines are
//! flushed.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{RawToDepthError, Result};

/// Build the filter: `RUST_LOG` wins over the configured directive
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| RawToDepthError::Config(format!("Invalid log filter {:?}: {}", level, e))),
    }
}

/// Install the global subscriber
///
/// Returns the file writer guard when a log file is configured.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(&config.level)?;
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| RawToDepthError::Config(format!("Failed to install logger: {}", e)))?;

    if let Some(path) = &config.log_file {
        tracing::debug!("Mirroring logs to {:?}", path);
    }
    Ok(guard)
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RawToDepthError::Config(format!("Failed to open log file {:?}: {}", path, e)))
}

//! Logging setup
//!
//! One [`LogSession`] is created per process. It installs the global
//! subscriber (timestamped, leveled lines on stderr, plus an optional plain
//! text file) and owns the background writer guard, so buffered file output
//! is flushed when the session is dropped.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{AppError, ConfigError, Result};

/// Build the filter: `RUST_LOG` if set, else `level` for this crate
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)).map_err(|e| {
        ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            value: level.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Active logging configuration; keep it alive for the whole run
pub struct LogSession {
    _file_guard: Option<WorkerGuard>,
}

impl LogSession {
    /// Install the global subscriber
    ///
    /// When `log_file` is given, the same events are appended to it without
    /// ANSI colours.
    pub fn init(level: &str, log_file: Option<&Path>) -> Result<Self> {
        let filter = build_filter(level)?;

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        let (file_layer, guard) = match log_file {
            Some(path) => {
                let file_name = path.file_name().ok_or_else(|| ConfigError::InvalidValue {
                    field: "logging.log_file".to_string(),
                    value: path.display().to_string(),
                    reason: "Log file path must name a file".to_string(),
                })?;
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                std::fs::create_dir_all(dir)?;

                let appender = tracing_appender::rolling::never(dir, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| AppError::generic(format!("Failed to initialize logging: {}", e)))?;

        Ok(Self { _file_guard: guard })
    }
}

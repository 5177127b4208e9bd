//! Logging setup

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Handle returned by [`init`]
///
/// Keep it alive for as long as logs should reach the log file: dropping it
/// flushes and stops the background writer.
#[must_use = "dropping the handle stops file logging"]
pub struct Telemetry {
    /// `false` when a subscriber was already installed
    pub installed: bool,
    _guard: Option<WorkerGuard>,
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Calling this more than
/// once is harmless; later calls report `installed == false`.
pub fn init(config: &LogConfig) -> anyhow::Result<Telemetry> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match &config.file {
        Some(path) => {
            let appender = file_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let installed = builder
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .is_ok();
            Ok(Telemetry {
                installed,
                _guard: Some(guard),
            })
        }
        None => Ok(Telemetry {
            installed: builder.try_init().is_ok(),
            _guard: None,
        }),
    }
}

/// Single, never-rotated log file at `path`
fn file_appender(path: &str) -> anyhow::Result<RollingFileAppender> {
    let path = Path::new(path);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path '{}' has no file name", path.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .with_context(|| format!("Failed to open log file '{}'", path.display()))
}

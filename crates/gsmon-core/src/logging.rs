//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem.
///
/// Logs are written to the platform data directory (e.g.
/// `~/.local/share/gsmon/logs/`); stdout stays clean for terminal output.
/// Log level is controlled by the `GSMON_LOG` environment variable.
///
/// # Examples
/// ```bash
/// GSMON_LOG=debug gsmon attach mc-vanilla
/// ```
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "gsmon.log");

    // Default to info, allow override via GSMON_LOG
    let env_filter =
        EnvFilter::try_from_env("GSMON_LOG").unwrap_or_else(|_| EnvFilter::new("gsmon=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("gsmon starting, log directory: {}", log_dir.display());

    Ok(())
}

/// Get the log directory path
fn log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("gsmon").join("logs")
}

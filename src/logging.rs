//! Global tracing subscriber setup.
//!
//! Writes to a daily-rolling file under `logging.directory` via
//! `tracing-appender`, honoring `logging.level` as an `EnvFilter` directive.
//! Falls back to `info` if the configured level string doesn't parse.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global subscriber. The returned [`WorkerGuard`] must be kept
/// alive for the lifetime of the process — dropping it stops the background
/// writer thread and truncates any buffered log lines.
pub fn init(config: &LogConfig) -> WorkerGuard {
    let file_appender = rolling::daily(&config.directory, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .init();

    guard
}

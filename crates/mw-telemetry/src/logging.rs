use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Timestamp layout of every `watch.log` line. `WatchLog` parses the first
/// `LOG_TIMESTAMP_LEN` bytes of each line with this format.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const LOG_TIMESTAMP_LEN: usize = 19;

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize logging with human-readable output format.
///
/// Uses the `RUST_LOG` environment variable if set, otherwise falls back
/// to `default_level` (e.g. "info", "debug", "mw_daemon=debug,warn").
///
/// Safe to call multiple times (e.g. in tests) -- subsequent calls are no-ops.
pub fn init_logging(service_name: &str, default_level: &str) {
    fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    tracing::debug!(service = service_name, "logging initialised (console)");
}

/// Initialize daemon logging: stderr plus an append-mode file at `path`.
///
/// File lines carry no ANSI escapes and start with a local
/// `YYYY-MM-DD HH:MM:SS` timestamp so retention cleanup can age them.
/// Fails only if the log file cannot be opened.
pub fn init_file_logging(
    service_name: &str,
    default_level: &str,
    path: &Path,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(LOG_TIMESTAMP_FORMAT.to_string()))
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(console)
        .with(file_layer)
        .try_init()
        .ok();

    tracing::info!(service = service_name, log = %path.display(), "logging initialised (file)");
    Ok(())
}

//! mergewatch daemon: polls watched PRs and moves tickets of merged ones.

use std::sync::Arc;

use anyhow::{Context, Result};
use mw_core::config::Config;
use mw_core::paths::DataPaths;
use mw_core::process::SignalProbe;
use mw_daemon::bootstrap::build_cycle;
use mw_daemon::daemon::WatchDaemon;
use mw_daemon::scheduler::Scheduler;
use mw_daemon::signals::spawn_signal_listener;
use tracing::{error, info};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let paths = DataPaths::resolve();
    paths
        .ensure()
        .with_context(|| format!("failed to create {}", paths.root().display()))?;

    mw_telemetry::logging::init_file_logging("mw-daemon", "info", &paths.log())
        .with_context(|| format!("failed to open {}", paths.log().display()))?;
    info!(version = env!("CARGO_PKG_VERSION"), data_dir = %paths.root().display(), "mergewatch daemon starting");

    let config = Config::load(paths.config()).context("failed to load config.toml")?;
    let cycle = build_cycle(&paths, &config).context("cannot start watch daemon")?;

    let mut daemon = WatchDaemon::new(cycle, Scheduler::from_config(&config.watch), Arc::new(SignalProbe))
        .with_config_path(paths.config());
    let signals = spawn_signal_listener(daemon.handle());

    let result = daemon.run().await;
    signals.abort();

    if let Err(e) = &result {
        error!(error = %e, "watch daemon exited with error");
    }
    result.context("watch daemon failed")
}

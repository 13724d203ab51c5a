pub mod daemon;
pub mod history;
pub mod log;
pub mod mapping;
pub mod watch;

use std::path::PathBuf;

use anyhow::Context;
use mw_core::config::Config;
use mw_core::credentials::CredentialProvider;
use mw_core::ledger::Ledger;
use mw_core::paths::DataPaths;
use mw_core::status_mapping::StatusMappingStore;
use mw_core::watch_registry::WatchRegistry;
use mw_daemon::scheduler::Scheduler;
use mw_telemetry::log_file::WatchLog;

/// Data directory and configuration shared by every subcommand.
pub struct CliContext {
    pub paths: DataPaths,
    pub config: Config,
}

impl CliContext {
    pub fn load() -> anyhow::Result<Self> {
        let paths = DataPaths::resolve();
        paths
            .ensure()
            .with_context(|| format!("failed to create {}", paths.root().display()))?;
        let config = Config::load(paths.config())
            .with_context(|| format!("invalid {}", paths.config().display()))?;
        Ok(Self { paths, config })
    }

    /// Tokens from the environment, then `<data_dir>/env`.
    pub fn credentials(&self) -> anyhow::Result<CredentialProvider> {
        CredentialProvider::load(self.paths.env_file())
            .with_context(|| format!("invalid {}", self.paths.env_file().display()))
    }

    pub fn registry(&self) -> WatchRegistry {
        WatchRegistry::open(self.paths.watch_list())
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::open(self.paths.ledger())
    }

    pub fn mappings(&self) -> StatusMappingStore {
        StatusMappingStore::open(self.paths.status_mappings())
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::from_config(&self.config.watch)
    }

    pub fn log(&self) -> WatchLog {
        WatchLog::new(self.paths.log())
    }
}

/// The `mw-daemon` binary installed next to `mw`.
pub fn daemon_executable() -> anyhow::Result<PathBuf> {
    let current = std::env::current_exe().context("cannot locate the mw executable")?;
    let daemon = current.with_file_name(format!("mw-daemon{}", std::env::consts::EXE_SUFFIX));
    if !daemon.exists() {
        anyhow::bail!(
            "mw-daemon not found at {} (install both binaries side by side)",
            daemon.display()
        );
    }
    Ok(daemon)
}

/// Split `OWNER/REPO`.
pub fn parse_repo(value: &str) -> anyhow::Result<(String, String)> {
    match value.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => anyhow::bail!("expected OWNER/REPO, got {value:?}"),
    }
}

#[cfg(test)]
pub(crate) fn test_context(dir: &std::path::Path) -> CliContext {
    CliContext {
        paths: DataPaths::new(dir),
        config: Config::default(),
    }
}

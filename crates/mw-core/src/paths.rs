use std::path::{Path, PathBuf};

/// Env var that overrides the data directory.
pub const HOME_ENV: &str = "MERGEWATCH_HOME";

pub const CONFIG_FILE: &str = "config.toml";
pub const WATCH_LIST_FILE: &str = "watching-prs.json";
pub const LEDGER_FILE: &str = "watch-state.json";
pub const STATUS_MAPPING_FILE: &str = "jira-status.json";
pub const LOG_FILE: &str = "watch.log";
/// `KEY=value` secrets for the daemon, written by `mw watch install`.
pub const ENV_FILE: &str = "env";

/// Locations of every file the watcher reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// `$MERGEWATCH_HOME`, else `~/.mergewatch`.
    pub fn resolve() -> Self {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Self::new(PathBuf::from(dir));
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".mergewatch"))
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn watch_list(&self) -> PathBuf {
        self.root.join(WATCH_LIST_FILE)
    }

    pub fn ledger(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    pub fn status_mappings(&self) -> PathBuf {
        self.root.join(STATUS_MAPPING_FILE)
    }

    pub fn log(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(ENV_FILE)
    }

    pub fn service_stdout(&self) -> PathBuf {
        self.root.join("watch.stdout.log")
    }

    pub fn service_stderr(&self) -> PathBuf {
        self.root.join("watch.stderr.log")
    }
}

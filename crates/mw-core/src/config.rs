use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration loaded from `<data_dir>/config.toml`.
///
/// **Security**: tokens are never stored here. Each integration names the
/// variable that holds its secret; see
/// [`CredentialProvider`](crate::credentials::CredentialProvider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub jira: JiraConfig,
}

impl Config {
    /// Load from `path`, falling back to defaults when the file does not
    /// exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path. A missing file is an error.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watch.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

/// Polling schedule and retention windows.
///
/// Night bounds are fractional hours of the local day (`8.5` is 08:30).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub daytime_interval_mins: u32,
    pub night_start: f64,
    pub night_end: f64,
    /// Whole local hours inside the night window at which a check runs.
    pub night_checks: Vec<u32>,
    pub ledger_retention_days: u32,
    pub log_retention_days: u32,
    pub watch_retention_days: u32,
    /// Window used by `watch status` and `watch history`.
    pub history_days: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            daytime_interval_mins: 15,
            night_start: 0.0,
            night_end: 8.5,
            night_checks: vec![2, 6],
            ledger_retention_days: 7,
            log_retention_days: 7,
            watch_retention_days: 30,
            history_days: 7,
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daytime_interval_mins == 0 {
            return Err(ConfigError::Validation(
                "watch.daytime_interval_mins must be greater than 0".into(),
            ));
        }
        let in_day = |h: f64| h.is_finite() && (0.0..=24.0).contains(&h);
        if !in_day(self.night_start) || !in_day(self.night_end) {
            return Err(ConfigError::Validation(format!(
                "watch night window [{}, {}] must lie within [0, 24]",
                self.night_start, self.night_end
            )));
        }
        if self.night_start > self.night_end {
            return Err(ConfigError::Validation(format!(
                "watch.night_start ({}) must not be after watch.night_end ({})",
                self.night_start, self.night_end
            )));
        }
        for &hour in &self.night_checks {
            let h = f64::from(hour);
            if h < self.night_start || h >= self.night_end {
                return Err(ConfigError::Validation(format!(
                    "watch.night_checks hour {hour} is outside the night window [{}, {})",
                    self.night_start, self.night_end
                )));
            }
        }
        Ok(())
    }
}

/// GitHub connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API root for GitHub Enterprise, e.g. `https://ghe.acme.io/api/v3`.
    /// Empty means api.github.com.
    pub base_url: String,
    /// Env var holding the personal access token (default: `GITHUB_TOKEN`).
    pub token_env: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token_env: "GITHUB_TOKEN".into(),
        }
    }
}

impl GitHubConfig {
    pub fn api_base_url(&self) -> Option<&str> {
        Some(self.base_url.trim()).filter(|u| !u.is_empty())
    }
}

/// Jira connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    /// e.g. `https://acme.atlassian.net`
    pub base_url: String,
    pub email: String,
    /// Env var holding the API token (default: `JIRA_API_TOKEN`).
    pub token_env: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            email: String::new(),
            token_env: "JIRA_API_TOKEN".into(),
        }
    }
}

impl JiraConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.email.trim().is_empty()
    }
}

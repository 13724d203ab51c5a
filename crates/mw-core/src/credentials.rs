//! Secret lookup for the GitHub and Jira integrations.
//!
//! Tokens come from the process environment first, then from the
//! `<data_dir>/env` file that `mw watch install` writes for the supervised
//! daemon. launchd and systemd both start the daemon without the user's
//! shell environment, so the file is the only channel they share.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::config::{ConfigError, GitHubConfig, JiraConfig};

#[derive(Debug, Clone, Default)]
pub struct CredentialProvider {
    file: HashMap<String, String>,
}

impl CredentialProvider {
    /// Process environment only.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Process environment backed by the `KEY=value` file at `path`.
    /// A missing file is treated as empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let iter = match dotenv::from_path_iter(path) {
            Ok(iter) => iter,
            Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(format!("{}: {e}", path.display()))),
        };

        let mut file = HashMap::new();
        for item in iter {
            let (key, value) =
                item.map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
            file.insert(key, value);
        }
        tracing::debug!(path = %path.display(), vars = file.len(), "loaded env file");
        Ok(Self { file })
    }

    /// Resolve `var`; blank values count as unset.
    pub fn get(&self, var: &str) -> Option<String> {
        std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.file.get(var).filter(|v| !v.trim().is_empty()).cloned())
    }

    pub fn github_token(&self, cfg: &GitHubConfig) -> Option<String> {
        self.get(&cfg.token_env)
    }

    pub fn jira_token(&self, cfg: &JiraConfig) -> Option<String> {
        self.get(&cfg.token_env)
    }
}

/// Write `vars` to `path` as single-quoted `KEY='value'` lines, readable by
/// the owner only. Both dotenv and systemd's `EnvironmentFile=` parse this
/// form.
pub fn write_env_file(path: impl AsRef<Path>, vars: &[(&str, &str)]) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let mut body = String::new();
    for (key, value) in vars {
        if value.contains('\'') || value.contains('\n') {
            return Err(ConfigError::Validation(format!(
                "{key} contains a quote or newline and cannot be written to the env file"
            )));
        }
        body.push_str(&format!("{key}='{value}'\n"));
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let io_err = |e: std::io::Error| ConfigError::Io(format!("{}: {e}", path.display()));
    let mut file = options.open(path).map_err(io_err)?;
    // `mode` only applies on create; tighten a pre-existing file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
    }
    file.write_all(body.as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_environment_only() {
        let dir = tempfile::tempdir().unwrap();
        let creds = CredentialProvider::load(dir.path().join("env")).unwrap();
        assert_eq!(creds.get("MW_TEST_SURELY_UNSET_VAR"), None);
    }

    #[test]
    fn tokens_resolve_from_written_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env");
        write_env_file(
            &path,
            &[("MW_TEST_FILE_GH_TOKEN", "ghp_abc=123"), ("MW_TEST_FILE_JIRA_TOKEN", "j tok")],
        )
        .unwrap();

        let creds = CredentialProvider::load(&path).unwrap();
        let github = GitHubConfig {
            token_env: "MW_TEST_FILE_GH_TOKEN".into(),
            ..GitHubConfig::default()
        };
        let jira = JiraConfig {
            token_env: "MW_TEST_FILE_JIRA_TOKEN".into(),
            ..JiraConfig::default()
        };
        assert_eq!(creds.github_token(&github).as_deref(), Some("ghp_abc=123"));
        assert_eq!(creds.jira_token(&jira).as_deref(), Some("j tok"));
    }

    #[cfg(unix)]
    #[test]
    fn env_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env");
        std::fs::write(&path, "stale\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_env_file(&path, &[("MW_TEST_MODE_TOKEN", "x")]).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "MW_TEST_MODE_TOKEN='x'\n");
    }

    #[test]
    fn blank_file_values_count_as_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env");
        std::fs::write(&path, "MW_TEST_BLANK_TOKEN='  '\n").unwrap();
        let creds = CredentialProvider::load(&path).unwrap();
        assert_eq!(creds.get("MW_TEST_BLANK_TOKEN"), None);
    }

    #[test]
    fn refuses_values_that_break_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_env_file(dir.path().join("env"), &[("T", "a'b")]).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}

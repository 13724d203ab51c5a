//! Wiring of stores and remote clients from config and credentials.

use std::sync::Arc;

use mw_core::config::{Config, GitHubConfig};
use mw_core::credentials::CredentialProvider;
use mw_core::ledger::Ledger;
use mw_core::paths::DataPaths;
use mw_core::status_mapping::StatusMappingStore;
use mw_core::watch_registry::WatchRegistry;
use mw_integrations::github::GitHubClient;
use mw_integrations::jira::JiraClient;
use mw_integrations::IntegrationError;
use mw_telemetry::log_file::WatchLog;

use crate::cycle::{Retention, WatchCycle};
use crate::error::DaemonError;

/// GitHub client for `config`, honouring an enterprise `base_url`.
pub fn github_client(config: &GitHubConfig, token: &str) -> Result<GitHubClient, IntegrationError> {
    match config.api_base_url() {
        Some(url) => GitHubClient::with_base_url(token, url),
        None => GitHubClient::new(token),
    }
}

/// Build a [`WatchCycle`] over the files in `paths`.
///
/// Tokens resolve from the environment, then from `<data_dir>/env`. Fails
/// when a credential or Jira setting is missing; the daemon must not start
/// without both remote clients. Must run inside a tokio runtime.
pub fn build_cycle(paths: &DataPaths, config: &Config) -> Result<WatchCycle, DaemonError> {
    let credentials = CredentialProvider::load(paths.env_file())?;
    let github_token = credentials.github_token(&config.github).ok_or_else(|| {
        DaemonError::MissingCredential(format!("GitHub token (set {})", config.github.token_env))
    })?;
    let jira_token = credentials.jira_token(&config.jira).ok_or_else(|| {
        DaemonError::MissingCredential(format!("Jira API token (set {})", config.jira.token_env))
    })?;
    if !config.jira.is_configured() {
        return Err(DaemonError::MissingCredential(format!(
            "Jira base_url and email (set [jira] in {})",
            paths.config().display()
        )));
    }

    let code_host = Arc::new(github_client(&config.github, &github_token)?);
    let tracker = Arc::new(JiraClient::new(
        &config.jira.base_url,
        &config.jira.email,
        &jira_token,
    )?);

    Ok(WatchCycle::new(
        Arc::new(WatchRegistry::open(paths.watch_list())),
        Arc::new(Ledger::open(paths.ledger())),
        Arc::new(StatusMappingStore::open(paths.status_mappings())),
        code_host,
        tracker,
    )
    .with_log(WatchLog::new(paths.log()))
    .with_retention(Retention::from(&config.watch)))
}

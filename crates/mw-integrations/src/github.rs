use async_trait::async_trait;
use octocrab::Octocrab;
use tracing::debug;

use crate::error::{IntegrationError, Result};
use crate::types::PullRequestInfo;
use crate::CodeHost;

/// GitHub REST client. Owner and repo are supplied per call because one
/// watcher tracks PRs across any number of repositories.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Build a client authenticated with a personal access token.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(token: &str) -> Result<Self> {
        Self::build(token, None)
    }

    /// Same as [`GitHubClient::new`] against a non-default API root
    /// (GitHub Enterprise).
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        Self::build(token, Some(base_url))
    }

    fn build(token: &str, base_url: Option<&str>) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(IntegrationError::MissingCredential("GitHub token".into()));
        }
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(url) = base_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| IntegrationError::Transport(e.to_string()))?;
        }
        let octocrab = builder.build().map_err(map_octocrab_error)?;
        Ok(Self { octocrab })
    }
}

#[async_trait]
impl CodeHost for GitHubClient {
    async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequestInfo> {
        debug!(owner, repo, pr = number, "fetching pull request");
        let pr = self
            .octocrab
            .pulls(owner, repo)
            .get(number)
            .await
            .map_err(map_octocrab_error)?;
        Ok(octocrab_pr_to_info(pr))
    }
}

fn map_octocrab_error(e: octocrab::Error) -> IntegrationError {
    match e {
        octocrab::Error::GitHub { source, .. } => {
            IntegrationError::from_status(source.status_code.as_u16(), source.message)
        }
        octocrab::Error::Serde { source, .. } => IntegrationError::Serde(source),
        other => IntegrationError::Transport(other.to_string()),
    }
}

fn octocrab_pr_to_info(pr: octocrab::models::pulls::PullRequest) -> PullRequestInfo {
    let state = match pr.state {
        Some(octocrab::models::IssueState::Closed) => "closed",
        _ => "open",
    };
    PullRequestInfo {
        number: pr.number,
        title: pr.title.unwrap_or_default(),
        url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
        head_branch: pr.head.ref_field.clone(),
        base_branch: pr.base.ref_field.clone(),
        state: state.to_string(),
        merged_at: pr.merged_at.map(|t| t.to_rfc3339()),
        merged_by: pr.merged_by.map(|u| u.login).unwrap_or_default(),
    }
}

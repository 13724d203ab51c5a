//! Remote collaborators of the watcher: the code host that reports merges
//! and the issue tracker whose tickets get transitioned.
//!
//! The daemon only sees the [`CodeHost`] and [`IssueTracker`] traits, so
//! tests substitute in-process fakes for the HTTP clients.

pub mod error;
pub mod github;
pub mod jira;
pub mod types;

use async_trait::async_trait;

pub use error::{IntegrationError, Result};
pub use types::{IssueInfo, PullRequestInfo};

/// Read access to pull requests.
#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequestInfo>;
}

/// Ticket lookups and workflow transitions.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_issue(&self, key: &str) -> Result<IssueInfo>;

    /// Move `key` to `status` using whichever available transition is named
    /// `status` or leads to it (case-insensitive).
    async fn update_status(&self, key: &str, status: &str) -> Result<()>;
}

use serde::{Deserialize, Serialize};

/// The subset of a pull request the watcher inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub head_branch: String,
    pub base_branch: String,
    pub state: String,
    /// RFC 3339 merge time; `None` (or empty) while unmerged.
    pub merged_at: Option<String>,
    pub merged_by: String,
}

impl PullRequestInfo {
    pub fn is_merged(&self) -> bool {
        self.merged_at.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueInfo {
    pub key: String,
    pub summary: String,
    pub status: String,
}

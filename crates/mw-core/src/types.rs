use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Watched pull requests
// ---------------------------------------------------------------------------

/// A pull request registered for merge tracking.
///
/// Identity is `(owner, repo, pr_number)`; the registry holds at most one
/// entry per identity. `created_at` is an RFC 3339 string so that hand-edited
/// or legacy entries with a malformed timestamp still load (they are kept by
/// the age-based cleanup rather than dropped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedPr {
    pub pr_number: u64,
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pr_url: String,
    #[serde(default)]
    pub jira_tickets: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

impl WatchedPr {
    /// Whether this entry has the given identity.
    pub fn is(&self, owner: &str, repo: &str, number: u64) -> bool {
        self.pr_number == number && self.owner == owner && self.repo == repo
    }

    /// Parsed creation timestamp, `None` when missing or malformed.
    pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// On-disk shape of `watching-prs.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchList {
    #[serde(default)]
    pub prs: Vec<WatchedPr>,
}

/// A watched PR that the code host reports as merged.
///
/// Tickets come from the [`WatchedPr`] captured at registration time, never
/// from re-parsing the title or branch at check time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedPr {
    pub number: u64,
    pub owner: String,
    pub repo: String,
    pub title: String,
    pub url: String,
    pub branch: String,
    /// Merge timestamp exactly as reported by the code host.
    pub merged_at: String,
    pub merged_by: String,
    pub jira_tickets: Vec<String>,
}

// ---------------------------------------------------------------------------
// Ledger records
// ---------------------------------------------------------------------------

/// Result of trying to move one ticket to its merged status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketUpdateOutcome {
    pub ticket: String,
    #[serde(default)]
    pub old_status: String,
    #[serde(default)]
    pub new_status: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TicketUpdateOutcome {
    pub fn failed(ticket: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
            old_status: String::new(),
            new_status: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn succeeded(
        ticket: impl Into<String>,
        old_status: impl Into<String>,
        new_status: impl Into<String>,
    ) -> Self {
        Self {
            ticket: ticket.into(),
            old_status: old_status.into(),
            new_status: new_status.into(),
            success: true,
            error: None,
        }
    }
}

/// Immutable audit entry for a merged PR whose tickets have been handled.
///
/// Records written before `owner`/`repo` were tracked carry them empty and
/// are matched through `pr_url` instead; see [`ProcessedRecord::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub pr_number: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    #[serde(default)]
    pub pr_title: String,
    #[serde(default)]
    pub pr_url: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub jira_tickets: Vec<String>,
    pub merged_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_by: String,
    pub processed_at: DateTime<Utc>,
    #[serde(default)]
    pub jira_updates: Vec<TicketUpdateOutcome>,
}

/// How a ledger record relates to a watched PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedMatch {
    /// Not processed; the PR must be checked.
    None,
    /// Same owner, repo and number (or same URL on a legacy record).
    Exact,
    /// A legacy record with this number that cannot be told apart from
    /// another repository's PR.
    Ambiguous,
}

impl ProcessedRecord {
    pub fn matches(&self, pr: &WatchedPr) -> ProcessedMatch {
        if self.pr_number != pr.pr_number {
            return ProcessedMatch::None;
        }
        if !self.owner.is_empty() || !self.repo.is_empty() {
            return if self.owner == pr.owner && self.repo == pr.repo {
                ProcessedMatch::Exact
            } else {
                ProcessedMatch::None
            };
        }
        match (self.pr_url.as_str(), pr.pr_url.as_str()) {
            ("", _) | (_, "") => ProcessedMatch::Ambiguous,
            (a, b) if a == b => ProcessedMatch::Exact,
            _ => ProcessedMatch::None,
        }
    }

    pub fn succeeded_updates(&self) -> usize {
        self.jira_updates.iter().filter(|u| u.success).count()
    }

    pub fn failed_updates(&self) -> usize {
        self.jira_updates.iter().filter(|u| !u.success).count()
    }
}

/// Timestamp plus message of the most recent failed ticket update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub time: DateTime<Utc>,
    pub message: String,
}

/// Cumulative counters kept alongside the processed records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub total_prs_processed: u64,
    #[serde(default)]
    pub total_jira_updated: u64,
    #[serde(default)]
    pub total_errors: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorInfo>,
}

/// On-disk shape of `watch-state.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub last_check_time: Option<DateTime<Utc>>,
    /// PID of the running daemon, `0` when none.
    #[serde(default)]
    pub daemon_pid: u32,
    #[serde(default)]
    pub daemon_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_prs: Vec<ProcessedRecord>,
    #[serde(default)]
    pub stats: Statistics,
}

/// Daemon bookkeeping as seen by status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonMetadata {
    pub pid: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub last_check_time: Option<DateTime<Utc>>,
    pub stats: Statistics,
}

impl DaemonMetadata {
    pub fn is_recorded(&self) -> bool {
        self.pid != 0
    }
}

// ---------------------------------------------------------------------------
// Status mappings
// ---------------------------------------------------------------------------

/// Which tracker status to apply per project on PR-created / PR-merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMapping {
    pub project_key: String,
    #[serde(default)]
    pub pr_created_status: String,
    #[serde(default)]
    pub pr_merged_status: String,
}

/// On-disk shape of `jira-status.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMappingFile {
    #[serde(default)]
    pub mappings: std::collections::BTreeMap<String, StatusMapping>,
}

/// `0001-01-01T00:00:00Z`, used when a merge timestamp cannot be parsed.
pub fn zero_time() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

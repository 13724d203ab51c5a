//! Moves the tickets of merged PRs to their configured merged status.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mw_core::ledger::Ledger;
use mw_core::status_mapping::StatusMappingStore;
use mw_core::tickets::project_key;
use mw_core::types::{zero_time, MergedPr, ProcessedRecord, TicketUpdateOutcome};
use mw_core::watch_registry::WatchRegistry;
use mw_integrations::IssueTracker;
use tracing::{error, info, warn};

/// Whether tracker mutations are performed or only described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Live,
    DryRun,
}

impl RunMode {
    pub fn is_dry_run(self) -> bool {
        self == RunMode::DryRun
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Live => write!(f, "live"),
            RunMode::DryRun => write!(f, "dry-run"),
        }
    }
}

pub struct Processor {
    tracker: Arc<dyn IssueTracker>,
    mappings: Arc<StatusMappingStore>,
    mode: RunMode,
}

impl Processor {
    pub fn new(tracker: Arc<dyn IssueTracker>, mappings: Arc<StatusMappingStore>, mode: RunMode) -> Self {
        Self {
            tracker,
            mappings,
            mode,
        }
    }

    /// Update every linked ticket of `pr` and build its ledger record.
    ///
    /// Never fails: each ticket problem becomes a failed outcome and the
    /// remaining tickets are still handled. `processed_at` is left for the
    /// ledger to stamp.
    pub async fn apply(&self, pr: &MergedPr) -> ProcessedRecord {
        let mut updates = Vec::with_capacity(pr.jira_tickets.len());
        for ticket in &pr.jira_tickets {
            let outcome = self.update_ticket(pr.number, ticket).await;
            if let Some(err) = &outcome.error {
                warn!(pr = pr.number, ticket = %ticket, error = %err, "ticket update failed");
            }
            updates.push(outcome);
        }

        ProcessedRecord {
            pr_number: pr.number,
            owner: pr.owner.clone(),
            repo: pr.repo.clone(),
            pr_title: pr.title.clone(),
            pr_url: pr.url.clone(),
            branch: pr.branch.clone(),
            jira_tickets: pr.jira_tickets.clone(),
            merged_at: parse_merged_at(pr.number, &pr.merged_at),
            merged_by: pr.merged_by.clone(),
            processed_at: zero_time(),
            jira_updates: updates,
        }
    }

    async fn update_ticket(&self, pr_number: u64, ticket: &str) -> TicketUpdateOutcome {
        let Some(project) = project_key(ticket) else {
            return TicketUpdateOutcome::failed(ticket, "invalid ticket format");
        };

        let mapping = match self.mappings.get(project) {
            Ok(Some(mapping)) => mapping,
            Ok(None) => {
                return TicketUpdateOutcome::failed(
                    ticket,
                    format!("no status mapping configured for project {project}"),
                )
            }
            Err(e) => {
                return TicketUpdateOutcome::failed(ticket, format!("failed to get status mapping: {e}"))
            }
        };

        let target = mapping.pr_merged_status.trim();
        if target.is_empty() {
            return TicketUpdateOutcome::failed(ticket, "PR merged status not configured");
        }

        let issue = match self.tracker.get_issue(ticket).await {
            Ok(issue) => issue,
            Err(e) => return TicketUpdateOutcome::failed(ticket, format!("failed to get issue: {e}")),
        };

        if issue.status.eq_ignore_ascii_case(target) {
            info!(pr = pr_number, ticket = %ticket, status = %issue.status, "ticket already in target status");
            return TicketUpdateOutcome::succeeded(ticket, &issue.status, target);
        }

        if self.mode.is_dry_run() {
            info!("would update {ticket}: {} -> {target}", issue.status);
            return TicketUpdateOutcome::succeeded(ticket, &issue.status, target);
        }

        match self.tracker.update_status(ticket, target).await {
            Ok(()) => {
                info!(
                    pr = pr_number,
                    ticket = %ticket,
                    from = %issue.status,
                    to = %target,
                    outcome = "success",
                    "ticket transitioned"
                );
                TicketUpdateOutcome::succeeded(ticket, &issue.status, target)
            }
            Err(e) => TicketUpdateOutcome {
                ticket: ticket.to_string(),
                old_status: issue.status,
                new_status: target.to_string(),
                success: false,
                error: Some(format!("failed to update status: {e}")),
            },
        }
    }

    /// Process each PR, then record it in the ledger before removing it from
    /// the registry. A persistence failure for one PR is logged and the batch
    /// moves on. Returns the records that reached the ledger.
    pub async fn apply_batch(
        &self,
        prs: &[MergedPr],
        ledger: &Ledger,
        registry: &WatchRegistry,
    ) -> Vec<ProcessedRecord> {
        let mut recorded = Vec::with_capacity(prs.len());
        for pr in prs {
            let mut record = self.apply(pr).await;
            record.processed_at = Utc::now();
            let (ok, failed) = (record.succeeded_updates(), record.failed_updates());

            if let Err(e) = ledger.append_processed(record.clone()) {
                error!(pr = pr.number, error = %e, "failed to record processed PR");
                continue;
            }
            if let Err(e) = registry.remove(&pr.owner, &pr.repo, pr.number) {
                warn!(pr = pr.number, error = %e, "failed to remove PR from watch list, it will be swept next cycle");
            }

            info!(pr = pr.number, updated = ok, failed, "processed merged PR");
            recorded.push(record);
        }
        recorded
    }
}

fn parse_merged_at(pr_number: u64, raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => t.with_timezone(&Utc),
        Err(e) => {
            warn!(pr = pr_number, merged_at = raw, error = %e, "unparsable merge timestamp, using zero time");
            zero_time()
        }
    }
}

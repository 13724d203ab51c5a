//! Finds watched PRs that have merged since the last cycle.

use std::sync::Arc;

use mw_core::ledger::Ledger;
use mw_core::store::StoreError;
use mw_core::types::{MergedPr, ProcessedMatch, WatchedPr};
use mw_core::watch_registry::WatchRegistry;
use mw_integrations::CodeHost;
use tracing::{debug, info, warn};

/// Result of one pass over the watch registry.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    /// Merged PRs whose tickets still need updating, in registry order.
    pub merged: Vec<MergedPr>,
    /// Entries with an exact ledger record. They were never queried and only
    /// need sweeping from the registry.
    pub already_processed: Vec<WatchedPr>,
    /// Entries whose PR lookup failed this cycle.
    pub lookup_failures: usize,
}

pub struct Checker {
    code_host: Arc<dyn CodeHost>,
}

impl Checker {
    pub fn new(code_host: Arc<dyn CodeHost>) -> Self {
        Self { code_host }
    }

    /// Walk the registry sequentially and report merged PRs.
    ///
    /// Only a failure to read the registry itself is returned as an error.
    /// Every per-entry problem is logged and the walk continues.
    pub async fn find_merged(
        &self,
        registry: &WatchRegistry,
        ledger: &Ledger,
    ) -> Result<CheckOutcome, StoreError> {
        let watched = registry.list()?;
        debug!(count = watched.len(), "checking watched PRs");

        let mut outcome = CheckOutcome::default();
        for pr in watched {
            match ledger.processed_match(&pr) {
                Ok(ProcessedMatch::Exact) => {
                    info!(pr = pr.pr_number, repo = %pr.repo, "PR already processed, skipping");
                    outcome.already_processed.push(pr);
                    continue;
                }
                Ok(ProcessedMatch::Ambiguous) => {
                    // A legacy record may or may not be this PR: neither update
                    // tickets again nor drop the entry.
                    warn!(pr = pr.pr_number, owner = %pr.owner, repo = %pr.repo, "ledger has an unqualified record for this PR number, skipping");
                    continue;
                }
                Ok(ProcessedMatch::None) => {}
                Err(e) => {
                    // Without the ledger we cannot rule out a duplicate update.
                    warn!(pr = pr.pr_number, error = %e, "cannot read ledger, skipping PR this cycle");
                    continue;
                }
            }

            let info = match self
                .code_host
                .get_pull_request(&pr.owner, &pr.repo, pr.pr_number)
                .await
            {
                Ok(info) => info,
                Err(e) => {
                    warn!(pr = pr.pr_number, owner = %pr.owner, repo = %pr.repo, error = %e, "failed to fetch PR");
                    outcome.lookup_failures += 1;
                    continue;
                }
            };

            if !info.is_merged() {
                debug!(pr = pr.pr_number, state = %info.state, "not merged yet");
                continue;
            }

            if pr.jira_tickets.is_empty() {
                warn!(pr = pr.pr_number, repo = %pr.repo, "merged PR has no linked tickets, nothing to sync");
                continue;
            }

            info!(pr = pr.pr_number, repo = %pr.repo, merged_by = %info.merged_by, "PR merged");
            outcome.merged.push(MergedPr {
                number: pr.pr_number,
                owner: pr.owner,
                repo: pr.repo,
                title: info.title,
                url: info.url,
                branch: info.head_branch,
                merged_at: info.merged_at.unwrap_or_default(),
                merged_by: info.merged_by,
                jira_tickets: pr.jira_tickets,
            });
        }
        Ok(outcome)
    }
}

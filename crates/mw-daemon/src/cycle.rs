//! One check-and-process pass, shared by the daemon loop and `mw watch check`.

use std::sync::Arc;

use mw_core::config::WatchConfig;
use mw_core::ledger::Ledger;
use mw_core::status_mapping::StatusMappingStore;
use mw_core::store::StoreError;
use mw_core::types::{MergedPr, ProcessedRecord};
use mw_core::watch_registry::WatchRegistry;
use mw_integrations::{CodeHost, IssueTracker};
use mw_telemetry::log_file::WatchLog;
use tracing::{info, warn};

use crate::checker::Checker;
use crate::processor::{Processor, RunMode};

/// Age limits applied after each live cycle. Zero disables a cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub ledger_days: u32,
    pub watch_days: u32,
    pub log_days: u32,
}

impl From<&WatchConfig> for Retention {
    fn from(config: &WatchConfig) -> Self {
        Self {
            ledger_days: config.ledger_retention_days,
            watch_days: config.watch_retention_days,
            log_days: config.log_retention_days,
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Retention::from(&WatchConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub mode: RunMode,
    pub watched: usize,
    pub merged: Vec<MergedPr>,
    /// Live: records appended to the ledger. Dry run: what would have been
    /// recorded.
    pub records: Vec<ProcessedRecord>,
    /// Already-processed entries removed from the registry.
    pub swept: usize,
    pub lookup_failures: usize,
}

impl CycleReport {
    pub fn ticket_failures(&self) -> usize {
        self.records.iter().map(ProcessedRecord::failed_updates).sum()
    }
}

pub struct WatchCycle {
    registry: Arc<WatchRegistry>,
    ledger: Arc<Ledger>,
    mappings: Arc<StatusMappingStore>,
    code_host: Arc<dyn CodeHost>,
    tracker: Arc<dyn IssueTracker>,
    log: Option<WatchLog>,
    retention: Retention,
}

impl WatchCycle {
    pub fn new(
        registry: Arc<WatchRegistry>,
        ledger: Arc<Ledger>,
        mappings: Arc<StatusMappingStore>,
        code_host: Arc<dyn CodeHost>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Self {
        Self {
            registry,
            ledger,
            mappings,
            code_host,
            tracker,
            log: None,
            retention: Retention::default(),
        }
    }

    /// Also age out lines of this log file after each live cycle.
    pub fn with_log(mut self, log: WatchLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    pub fn set_retention(&mut self, retention: Retention) {
        self.retention = retention;
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<WatchRegistry> {
        &self.registry
    }

    /// Run one pass.
    ///
    /// Errors only when the watch registry cannot be read; a live pass still
    /// records its check time in that case. In dry-run mode nothing is
    /// written: no tracker transitions, no ledger or registry changes, no
    /// cleanup.
    pub async fn run(&self, mode: RunMode) -> Result<CycleReport, StoreError> {
        info!(%mode, "starting check cycle");
        let checker = Checker::new(self.code_host.clone());
        let (watched, outcome) = match self.registry.count() {
            Ok(watched) => match checker.find_merged(&self.registry, &self.ledger).await {
                Ok(outcome) => (watched, outcome),
                Err(e) => return Err(self.abort(mode, e)),
            },
            Err(e) => return Err(self.abort(mode, e)),
        };
        let processor = Processor::new(self.tracker.clone(), self.mappings.clone(), mode);

        let mut report = CycleReport {
            mode,
            watched,
            merged: outcome.merged,
            records: Vec::new(),
            swept: 0,
            lookup_failures: outcome.lookup_failures,
        };

        if mode.is_dry_run() {
            for pr in &report.merged {
                report.records.push(processor.apply(pr).await);
            }
            for pr in &outcome.already_processed {
                info!(pr = pr.pr_number, "would remove already processed PR from watch list");
            }
            info!(
                watched,
                merged = report.merged.len(),
                "dry run complete, nothing was changed"
            );
            return Ok(report);
        }

        for pr in &outcome.already_processed {
            match self.registry.remove(&pr.owner, &pr.repo, pr.pr_number) {
                Ok(()) => report.swept += 1,
                Err(e) => warn!(pr = pr.pr_number, error = %e, "failed to sweep processed PR"),
            }
        }

        report.records = processor
            .apply_batch(&report.merged, &self.ledger, &self.registry)
            .await;

        if let Err(e) = self.ledger.update_last_check_time() {
            warn!(error = %e, "failed to record last check time");
        }
        self.clean_up();

        info!(
            watched,
            merged = report.merged.len(),
            processed = report.records.len(),
            ticket_failures = report.ticket_failures(),
            "check cycle complete"
        );
        Ok(report)
    }

    fn abort(&self, mode: RunMode, err: StoreError) -> StoreError {
        warn!(error = %err, "cannot read watch list, aborting cycle");
        if !mode.is_dry_run() {
            if let Err(e) = self.ledger.update_last_check_time() {
                warn!(error = %e, "failed to record last check time");
            }
        }
        err
    }

    fn clean_up(&self) {
        if let Err(e) = self.ledger.clean_old_records(self.retention.ledger_days) {
            warn!(error = %e, "failed to clean ledger");
        }
        if let Err(e) = self.registry.clean(self.retention.watch_days) {
            warn!(error = %e, "failed to clean watch list");
        }
        if let Some(log) = &self.log {
            match log.clean_old_entries(self.retention.log_days) {
                Ok(0) => {}
                Ok(removed) => info!(removed, "trimmed watch log"),
                Err(e) => warn!(error = %e, "failed to clean watch log"),
            }
        }
    }
}

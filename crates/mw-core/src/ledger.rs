//! Durable record of processed pull requests plus daemon metadata.
//!
//! The ledger is the idempotency gate: a PR recorded here is never queried or
//! transitioned again, regardless of what the watch registry says.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::store::{DocumentStore, JsonFileStore, StoreError};
use crate::types::{DaemonMetadata, ErrorInfo, LedgerState, ProcessedMatch, ProcessedRecord, WatchedPr};

/// Ledger backed by `watch-state.json`.
pub struct Ledger {
    store: Box<dyn DocumentStore<LedgerState>>,
}

impl Ledger {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_store(JsonFileStore::new(path.as_ref()))
    }

    pub fn with_store(store: impl DocumentStore<LedgerState> + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> Result<R, StoreError> {
        let mut state = self.store.load()?;
        let out = f(&mut state);
        self.store.save(&state)?;
        Ok(out)
    }

    /// Strongest match between `pr` and any stored record. An exact match
    /// wins over an ambiguous legacy one.
    pub fn processed_match(&self, pr: &WatchedPr) -> Result<ProcessedMatch, StoreError> {
        let mut found = ProcessedMatch::None;
        for record in &self.store.load()?.processed_prs {
            match record.matches(pr) {
                ProcessedMatch::Exact => return Ok(ProcessedMatch::Exact),
                ProcessedMatch::Ambiguous => found = ProcessedMatch::Ambiguous,
                ProcessedMatch::None => {}
            }
        }
        Ok(found)
    }

    /// Whether `pr` has an exact record.
    pub fn is_processed(&self, pr: &WatchedPr) -> Result<bool, StoreError> {
        Ok(self.processed_match(pr)? == ProcessedMatch::Exact)
    }

    /// Stamp `processed_at`, append the record and fold its outcomes into the
    /// running statistics.
    pub fn append_processed(&self, mut record: ProcessedRecord) -> Result<(), StoreError> {
        let now = Utc::now();
        record.processed_at = now;
        self.update(|state| {
            state.stats.total_prs_processed += 1;
            for outcome in &record.jira_updates {
                if outcome.success {
                    state.stats.total_jira_updated += 1;
                } else {
                    state.stats.total_errors += 1;
                    state.stats.last_error = Some(ErrorInfo {
                        time: now,
                        message: outcome.error.clone().unwrap_or_default(),
                    });
                }
            }
            state.processed_prs.push(record);
        })
    }

    /// Drop records processed more than `retention_days` ago. Zero retention
    /// keeps everything. Returns the number of records removed.
    pub fn clean_old_records(&self, retention_days: u32) -> Result<usize, StoreError> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let removed = self.update(|state| {
            let before = state.processed_prs.len();
            state.processed_prs.retain(|r| r.processed_at > cutoff);
            before - state.processed_prs.len()
        })?;
        if removed > 0 {
            info!(removed, retention_days, "pruned processed PR records");
        }
        Ok(removed)
    }

    pub fn update_last_check_time(&self) -> Result<(), StoreError> {
        self.update(|state| state.last_check_time = Some(Utc::now()))
    }

    pub fn set_daemon_info(&self, pid: u32) -> Result<(), StoreError> {
        self.update(|state| {
            state.daemon_pid = pid;
            state.daemon_start_time = Some(Utc::now());
        })
    }

    pub fn clear_daemon_info(&self) -> Result<(), StoreError> {
        self.update(|state| {
            state.daemon_pid = 0;
            state.daemon_start_time = None;
        })
    }

    /// Records processed within the last `days` days; `0` means all.
    pub fn recent_records(&self, days: u32) -> Result<Vec<ProcessedRecord>, StoreError> {
        let records = self.store.load()?.processed_prs;
        if days == 0 {
            return Ok(records);
        }
        let cutoff: DateTime<Utc> = Utc::now() - Duration::days(i64::from(days));
        Ok(records
            .into_iter()
            .filter(|r| r.processed_at > cutoff)
            .collect())
    }

    pub fn records(&self) -> Result<Vec<ProcessedRecord>, StoreError> {
        Ok(self.store.load()?.processed_prs)
    }

    pub fn metadata(&self) -> Result<DaemonMetadata, StoreError> {
        let state = self.store.load()?;
        Ok(DaemonMetadata {
            pid: state.daemon_pid,
            start_time: state.daemon_start_time,
            last_check_time: state.last_check_time,
            stats: state.stats,
        })
    }
}

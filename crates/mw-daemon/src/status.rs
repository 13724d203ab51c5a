//! `mw watch status` report.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use mw_core::ledger::Ledger;
use mw_core::process::ProcessProbe;
use mw_core::store::StoreError;
use mw_core::types::ErrorInfo;
use mw_core::watch_registry::WatchRegistry;

use crate::scheduler::{format_duration, format_until, Mode, Scheduler};

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub running: bool,
    pub pid: Option<u32>,
    pub uptime: Option<std::time::Duration>,
    pub last_check: Option<DateTime<Utc>>,
    /// Only known while the daemon runs.
    pub next_check: Option<DateTime<Local>>,
    pub mode: Mode,
    pub watched: usize,
    pub history_days: u32,
    pub recent_processed: usize,
    pub recent_tickets_updated: usize,
    pub recent_ticket_failures: usize,
    pub total_errors: u64,
    pub last_error: Option<ErrorInfo>,
}

impl StatusReport {
    pub fn collect(
        ledger: &Ledger,
        registry: &WatchRegistry,
        scheduler: &Scheduler,
        probe: &dyn ProcessProbe,
        history_days: u32,
        now: DateTime<Local>,
    ) -> Result<Self, StoreError> {
        let meta = ledger.metadata()?;
        let running = meta.is_recorded() && probe.is_alive(meta.pid);

        let uptime = match (running, meta.start_time) {
            (true, Some(start)) => (now.with_timezone(&Utc) - start).to_std().ok(),
            _ => None,
        };
        let next_check = running.then(|| {
            let from = meta
                .last_check_time
                .map(|t| t.with_timezone(&Local))
                .unwrap_or(now);
            scheduler.next_check_time(&from)
        });

        let recent = ledger.recent_records(history_days)?;
        Ok(Self {
            running,
            pid: running.then_some(meta.pid),
            uptime,
            last_check: meta.last_check_time,
            next_check,
            mode: scheduler.current_mode(&now),
            watched: registry.count()?,
            history_days,
            recent_processed: recent.len(),
            recent_tickets_updated: recent.iter().map(|r| r.succeeded_updates()).sum(),
            recent_ticket_failures: recent.iter().map(|r| r.failed_updates()).sum(),
            total_errors: meta.stats.total_errors,
            last_error: meta.stats.last_error,
        })
    }

    /// Multi-line human-readable form.
    pub fn render(&self, now: DateTime<Local>) -> String {
        let mut out = String::new();
        match self.pid {
            Some(pid) => {
                let _ = writeln!(out, "Status:        running (pid {pid})");
            }
            None => {
                let _ = writeln!(out, "Status:        stopped");
            }
        }
        if let Some(uptime) = self.uptime {
            let _ = writeln!(out, "Uptime:        {}", format_duration(uptime));
        }
        let _ = writeln!(out, "Mode:          {}", self.mode);
        match self.last_check {
            Some(t) => {
                let _ = writeln!(
                    out,
                    "Last check:    {}",
                    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                );
            }
            None => {
                let _ = writeln!(out, "Last check:    never");
            }
        }
        if let Some(next) = self.next_check {
            let _ = writeln!(
                out,
                "Next check:    {} ({})",
                next.format("%Y-%m-%d %H:%M"),
                format_until(&next, &now)
            );
        }
        let _ = writeln!(out, "Watching:      {} PR(s)", self.watched);
        let _ = writeln!(
            out,
            "Last {} days:   {} PR(s) processed, {} ticket(s) updated, {} failed",
            self.history_days, self.recent_processed, self.recent_tickets_updated, self.recent_ticket_failures
        );
        let _ = writeln!(out, "Total errors:  {}", self.total_errors);
        if let Some(err) = &self.last_error {
            let _ = writeln!(
                out,
                "Last error:    {} ({})",
                err.message,
                err.time.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
        }
        out
    }
}

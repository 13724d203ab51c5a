use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use mw_core::config::Config;
use mw_core::ledger::Ledger;
use mw_core::process::ProcessProbe;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::cycle::{CycleReport, Retention, WatchCycle};
use crate::error::DaemonError;
use crate::lifecycle::{DaemonEvent, DaemonState, Lifecycle};
use crate::processor::RunMode;
use crate::scheduler::{format_until, Scheduler};
use crate::shutdown::{DaemonHandle, ShutdownSignal};

/// The background watcher.
///
/// Runs a [`WatchCycle`] immediately on start, then sleeps until the
/// scheduler's next check time. The sleep races shutdown and reload
/// requests; a cycle already in flight always runs to completion.
pub struct WatchDaemon {
    cycle: WatchCycle,
    scheduler: Scheduler,
    ledger: Arc<Ledger>,
    probe: Arc<dyn ProcessProbe>,
    config_path: Option<PathBuf>,
    pid: u32,
    lifecycle: Lifecycle,
    shutdown: ShutdownSignal,
    reload_tx: mpsc::UnboundedSender<()>,
    reload_rx: mpsc::UnboundedReceiver<()>,
}

impl WatchDaemon {
    pub fn new(cycle: WatchCycle, scheduler: Scheduler, probe: Arc<dyn ProcessProbe>) -> Self {
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        Self {
            ledger: cycle.ledger().clone(),
            cycle,
            scheduler,
            probe,
            config_path: None,
            pid: std::process::id(),
            lifecycle: Lifecycle::new(),
            shutdown: ShutdownSignal::new(),
            reload_tx,
            reload_rx,
        }
    }

    /// Config file re-read on reload. Without one, reload is a no-op.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Record a PID other than this process's (tests).
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle::new(self.shutdown.clone(), self.reload_tx.clone())
    }

    pub fn state(&self) -> DaemonState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run a single cycle without entering the loop.
    pub async fn check_once(&self, mode: RunMode) -> Result<CycleReport, DaemonError> {
        Ok(self.cycle.run(mode).await?)
    }

    /// Start, loop until shutdown, stop.
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        self.start()?;
        self.run_loop().await;
        self.stop()
    }

    fn start(&mut self) -> Result<(), DaemonError> {
        self.lifecycle.transition(DaemonEvent::Start)?;

        if let Err(e) = self.claim_instance() {
            self.lifecycle.transition(DaemonEvent::Abort)?;
            return Err(e);
        }

        self.lifecycle.transition(DaemonEvent::Started)?;
        info!(pid = self.pid, "watch daemon started");
        Ok(())
    }

    /// Refuse if a live process holds the recorded PID, then record ours.
    fn claim_instance(&self) -> Result<(), DaemonError> {
        let meta = self.ledger.metadata()?;
        if meta.is_recorded() && meta.pid != self.pid {
            if self.probe.is_alive(meta.pid) {
                return Err(DaemonError::AlreadyRunning { pid: meta.pid });
            }
            info!(stale_pid = meta.pid, "ignoring stale daemon PID");
        }
        self.ledger.set_daemon_info(self.pid)?;
        Ok(())
    }

    async fn run_loop(&mut self) {
        loop {
            if self.shutdown.is_shutting_down() {
                break;
            }
            if let Err(e) = self.cycle.run(RunMode::Live).await {
                error!(error = %e, "check cycle failed");
            }
            if !self.wait_for_next_check().await {
                break;
            }
        }
    }

    /// Sleep until the next scheduled check. Returns `false` on shutdown.
    async fn wait_for_next_check(&mut self) -> bool {
        loop {
            let now = Local::now();
            let next = self.scheduler.next_check_time(&now);
            let wait = self.scheduler.sleep_duration(&now);
            info!(
                mode = %self.scheduler.current_mode(&now),
                next_check = %next.format("%Y-%m-%d %H:%M"),
                "next check {}",
                format_until(&next, &now)
            );

            tokio::select! {
                biased;
                _ = self.shutdown.wait() => return false,
                Some(()) = self.reload_rx.recv() => {
                    self.reload();
                }
                _ = tokio::time::sleep(wait) => return true,
            }
        }
    }

    /// Re-read the config and rebuild schedule and retention. An unreadable
    /// or invalid config keeps the current settings.
    fn reload(&mut self) {
        if let Err(e) = self.lifecycle.transition(DaemonEvent::Reload) {
            warn!(error = %e, "reload ignored");
            return;
        }
        let Some(path) = &self.config_path else {
            info!("reload requested, no config file in use");
            return;
        };
        match Config::load(path) {
            Ok(config) => {
                self.scheduler = Scheduler::from_config(&config.watch);
                self.cycle.set_retention(Retention::from(&config.watch));
                info!(config = %path.display(), "configuration reloaded");
            }
            Err(e) => warn!(config = %path.display(), error = %e, "reload failed, keeping previous configuration"),
        }
    }

    fn stop(&mut self) -> Result<(), DaemonError> {
        self.lifecycle.transition(DaemonEvent::Stop)?;
        info!("watch daemon stopping");
        if let Err(e) = self.ledger.clear_daemon_info() {
            error!(error = %e, "failed to clear daemon metadata");
        }
        self.lifecycle.transition(DaemonEvent::Finish)?;
        info!("watch daemon stopped");
        Ok(())
    }
}

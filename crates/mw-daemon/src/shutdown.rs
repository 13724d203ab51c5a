use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Broadcast-based shutdown coordinator.
///
/// Cloned freely; every clone triggers and observes the same signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    trigger: broadcast::Sender<()>,
    shutting_down: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (trigger, _) = broadcast::channel(1);
        Self {
            trigger,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.trigger.subscribe()
    }

    /// Check if shutdown has been triggered (non-blocking).
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        if self
            .shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            info!("shutdown signal triggered");
            let _ = self.trigger.send(());
        } else {
            warn!("shutdown already triggered");
        }
    }

    /// Resolve once shutdown has been triggered, including before the call.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutting_down() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Control surface of a running daemon, used by the OS signal task and by
/// tests.
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    shutdown: ShutdownSignal,
    reload: mpsc::UnboundedSender<()>,
}

impl DaemonHandle {
    pub(crate) fn new(shutdown: ShutdownSignal, reload: mpsc::UnboundedSender<()>) -> Self {
        Self { shutdown, reload }
    }

    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Ask the daemon to re-read its configuration.
    pub fn reload(&self) {
        if self.reload.send(()).is_err() {
            warn!("reload requested but daemon loop has exited");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_shutting_down()
    }
}

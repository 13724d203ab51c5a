//! OS signal wiring: SIGTERM/SIGINT stop the daemon, SIGHUP reloads it.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::shutdown::DaemonHandle;

/// Forward OS signals to `handle` until shutdown is requested.
pub fn spawn_signal_listener(handle: DaemonHandle) -> JoinHandle<()> {
    tokio::spawn(async move { listen(handle).await })
}

#[cfg(unix)]
async fn listen(handle: DaemonHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let streams = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
        signal(SignalKind::hangup()),
    );
    let (mut term, mut int, mut hup) = match streams {
        (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
        _ => {
            warn!("failed to install unix signal handlers, falling back to ctrl-c");
            ctrl_c_only(handle).await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = term.recv() => {
                info!(signal = "SIGTERM", "received shutdown signal");
                handle.shutdown();
                return;
            }
            _ = int.recv() => {
                info!(signal = "SIGINT", "received shutdown signal");
                handle.shutdown();
                return;
            }
            _ = hup.recv() => {
                info!(signal = "SIGHUP", "received reload signal");
                handle.reload();
            }
        }
    }
}

#[cfg(not(unix))]
async fn listen(handle: DaemonHandle) {
    ctrl_c_only(handle).await;
}

async fn ctrl_c_only(handle: DaemonHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("received ctrl-c");
            handle.shutdown();
        }
        Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
    }
}

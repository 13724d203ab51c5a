//! Process liveness for the single-instance daemon check.
//!
//! The ledger records the daemon PID. A recorded PID only counts as running
//! if a no-op signal (`kill(pid, 0)`) reaches it; anything else is a stale
//! entry left by a crash or SIGKILL.

/// Answers "is this PID a live process?".
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probe backed by `kill(pid, 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalProbe;

impl ProcessProbe for SignalProbe {
    fn is_alive(&self, pid: u32) -> bool {
        pid_alive(pid)
    }
}

/// Check if a process with the given PID is alive.
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: kill with signal 0 checks existence without sending a signal.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
pub fn pid_alive(_pid: u32) -> bool {
    // On non-Unix platforms, assume alive (conservative: never start a second daemon).
    true
}

/// Ask the process to terminate (SIGTERM). Returns `false` if the signal
/// could not be delivered.
#[cfg(unix)]
pub fn send_terminate(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: plain signal delivery to a PID we recorded ourselves.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
pub fn send_terminate(_pid: u32) -> bool {
    false
}

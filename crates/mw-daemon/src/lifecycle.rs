use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DaemonState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DaemonState::Stopped => "Stopped",
            DaemonState::Starting => "Starting",
            DaemonState::Running => "Running",
            DaemonState::Stopping => "Stopping",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// DaemonEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonEvent {
    Start,
    Started,
    /// Startup refused (another instance alive, metadata unwritable).
    Abort,
    Reload,
    Stop,
    Finish,
}

impl fmt::Display for DaemonEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DaemonEvent::Start => "Start",
            DaemonEvent::Started => "Started",
            DaemonEvent::Abort => "Abort",
            DaemonEvent::Reload => "Reload",
            DaemonEvent::Stop => "Stop",
            DaemonEvent::Finish => "Finish",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid transition: cannot apply {event} in state {state}")]
pub struct InvalidTransition {
    pub state: DaemonState,
    pub event: DaemonEvent,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Daemon lifecycle, independent of how signals reach the process.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    current: DaemonState,
    history: Vec<(DaemonState, DaemonEvent, DaemonState)>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            current: DaemonState::Stopped,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> DaemonState {
        self.current
    }

    pub fn history(&self) -> &[(DaemonState, DaemonEvent, DaemonState)] {
        &self.history
    }

    /// Valid transitions:
    /// - Stopped  + Start   -> Starting
    /// - Starting + Started -> Running
    /// - Starting + Abort   -> Stopped
    /// - Running  + Reload  -> Running
    /// - Running  + Stop    -> Stopping
    /// - Stopping + Finish  -> Stopped
    pub fn transition(&mut self, event: DaemonEvent) -> Result<DaemonState, InvalidTransition> {
        let next = match (self.current, event) {
            (DaemonState::Stopped, DaemonEvent::Start) => DaemonState::Starting,
            (DaemonState::Starting, DaemonEvent::Started) => DaemonState::Running,
            (DaemonState::Starting, DaemonEvent::Abort) => DaemonState::Stopped,
            (DaemonState::Running, DaemonEvent::Reload) => DaemonState::Running,
            (DaemonState::Running, DaemonEvent::Stop) => DaemonState::Stopping,
            (DaemonState::Stopping, DaemonEvent::Finish) => DaemonState::Stopped,
            _ => {
                return Err(InvalidTransition {
                    state: self.current,
                    event,
                });
            }
        };

        let from = self.current;
        self.current = next;
        self.history.push((from, event, next));
        tracing::debug!(from = %from, event = %event, to = %next, "daemon state transition");
        Ok(next)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lifecycle() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.transition(DaemonEvent::Start).unwrap(), DaemonState::Starting);
        assert_eq!(lc.transition(DaemonEvent::Started).unwrap(), DaemonState::Running);
        assert_eq!(lc.transition(DaemonEvent::Reload).unwrap(), DaemonState::Running);
        assert_eq!(lc.transition(DaemonEvent::Stop).unwrap(), DaemonState::Stopping);
        assert_eq!(lc.transition(DaemonEvent::Finish).unwrap(), DaemonState::Stopped);
        assert_eq!(lc.history().len(), 5);
    }

    #[test]
    fn aborted_start_returns_to_stopped() {
        let mut lc = Lifecycle::new();
        lc.transition(DaemonEvent::Start).unwrap();
        assert_eq!(lc.transition(DaemonEvent::Abort).unwrap(), DaemonState::Stopped);
    }

    #[test]
    fn reload_is_only_valid_while_running() {
        let mut lc = Lifecycle::new();
        let err = lc.transition(DaemonEvent::Reload).unwrap_err();
        assert_eq!(err.state, DaemonState::Stopped);
        assert_eq!(
            err.to_string(),
            "invalid transition: cannot apply Reload in state Stopped"
        );
        assert_eq!(lc.state(), DaemonState::Stopped);
    }

    #[test]
    fn cannot_stop_twice() {
        let mut lc = Lifecycle::new();
        lc.transition(DaemonEvent::Start).unwrap();
        lc.transition(DaemonEvent::Started).unwrap();
        lc.transition(DaemonEvent::Stop).unwrap();
        assert!(lc.transition(DaemonEvent::Stop).is_err());
    }
}

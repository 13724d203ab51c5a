//! The mergewatch background watcher.
//!
//! - **Scheduling**: day/night polling policy ([`scheduler`])
//! - **Cycle**: find merged PRs, transition their tickets, record them
//!   ([`checker`], [`processor`], [`cycle`])
//! - **Lifecycle**: single-instance start, signal-driven stop and reload
//!   ([`daemon`], [`lifecycle`], [`shutdown`], [`signals`])
//! - **Operations**: status report and OS service install ([`status`],
//!   [`service`])

pub mod bootstrap;
pub mod checker;
pub mod cycle;
pub mod daemon;
pub mod error;
pub mod lifecycle;
pub mod processor;
pub mod scheduler;
pub mod service;
pub mod shutdown;
pub mod signals;
pub mod status;

pub use error::DaemonError;

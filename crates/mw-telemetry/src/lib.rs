//! Logging for mergewatch binaries.
//!
//! - **Logging**: console subscriber for the CLI, console + `watch.log` file
//!   sink for the daemon, both driven by `tracing-subscriber` and `RUST_LOG`.
//! - **Log file**: retention cleanup and tailing of `watch.log`.

pub mod log_file;
pub mod logging;

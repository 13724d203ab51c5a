use mw_core::config::ConfigError;
use mw_core::store::StoreError;
use mw_integrations::IntegrationError;

use crate::lifecycle::InvalidTransition;
use crate::service::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("watch daemon already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("state store: {0}")]
    Store(#[from] StoreError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("service: {0}")]
    Service(#[from] ServiceError),
}

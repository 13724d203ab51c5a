use thiserror::Error;

/// Failures talking to GitHub or Jira.
///
/// The watcher never matches on the variant to decide control flow beyond
/// logging; each error becomes a per-PR warning or a per-ticket failure
/// string via its `Display` text.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The PR or issue does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Credentials were rejected (HTTP 401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No available workflow transition reaches the requested status.
    #[error("transition to status '{status}' not found for issue {key}")]
    TransitionNotFound { key: String, status: String },

    /// Connection, TLS, timeout or body decoding failures.
    #[error("transport error: {0}")]
    Transport(String),

    /// A required token or setting is absent.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<reqwest::Error> for IntegrationError {
    fn from(e: reqwest::Error) -> Self {
        IntegrationError::Transport(e.to_string())
    }
}

impl IntegrationError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => IntegrationError::Unauthorized(message),
            404 => IntegrationError::NotFound(message),
            _ => IntegrationError::Api { status, message },
        }
    }
}

pub type Result<T> = std::result::Result<T, IntegrationError>;

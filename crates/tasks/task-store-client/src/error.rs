//! Task store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a task store call.
///
/// Callers are expected to treat every variant as "the call did not
/// succeed"; the variants only exist so log lines say something useful.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Task store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode task store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid task store URL: {0}")]
    InvalidUrl(String),

    #[error("Task has no id")]
    MissingId,

    #[error("Task store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True when the failure came from talking to the store, as opposed to
    /// a local usage error caught before any request was made.
    pub fn is_remote_failure(&self) -> bool {
        !matches!(self, StoreError::MissingId | StoreError::InvalidUrl(_))
    }
}

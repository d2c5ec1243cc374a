//! Error types for the Earth Engine and Drive clients.

use thiserror::Error;

/// Errors produced by the remote clients.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("export {name} ended in state {state}: {message}")]
    TaskFailed {
        name: String,
        state: String,
        message: String,
    },

    #[error("export {0} produced no file in Drive")]
    MissingOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] geefetch_core::Error),
}

impl CloudError {
    /// Whether a request failing with this error may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            CloudError::Http(e) => e.is_timeout() || e.is_connect(),
            CloudError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;

//! Nacos client error types.

use thiserror::Error;

/// Errors returned by the Nacos sub-services.
#[derive(Debug, Error)]
pub enum NacosError {
    /// Transport-level failure talking to every known server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Nacos server returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The server answered with a non-zero result code.
    #[error("Nacos API error {code}: {message}")]
    Api {
        /// Nacos result code.
        code: i64,
        /// Message from the server.
        message: String,
    },

    /// Authentication was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// No server address could be resolved.
    #[error("No Nacos server available: {0}")]
    NoServer(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service was closed.
    #[error("Service is closed")]
    Closed,
}

impl NacosError {
    /// Whether another server might succeed where this one failed.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for Nacos operations.
pub type NacosResult<T> = Result<T, NacosError>;

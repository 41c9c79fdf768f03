//! Error types for registries and card resolvers.

use nacos_a2a_client::NacosError;
use nacos_a2a_pool::PoolError;
use thiserror::Error;

/// Errors raised while registering an agent.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An endpoint URL could not be interpreted.
    #[error("Invalid endpoint URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// What is wrong with it.
        message: String,
    },

    /// The pooled Nacos service could not be obtained.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A Nacos call failed.
    #[error(transparent)]
    Nacos(#[from] NacosError),

    /// The agent card could not be serialized.
    #[error("Failed to serialize agent card: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    pub(crate) fn invalid_url(url: &str, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while resolving an agent card.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No card is published for the agent.
    #[error("Agent card not found: {0}")]
    NotFound(String),

    /// The card URL could not be built.
    #[error("Invalid card URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Fetching the card failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The card document is not a valid agent card.
    #[error("Invalid agent card: {0}")]
    Json(#[from] serde_json::Error),

    /// The pooled Nacos service could not be obtained.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A Nacos call failed.
    #[error(transparent)]
    Nacos(#[from] NacosError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RegistryError::invalid_url("ftp//x", "missing host");
        assert_eq!(err.to_string(), "Invalid endpoint URL 'ftp//x': missing host");
        assert_eq!(
            ResolveError::NotFound("friday".into()).to_string(),
            "Agent card not found: friday"
        );
    }
}

//! Pool error types.

use nacos_a2a_core::{ConfigError, ConfigIdentity, ConnectionConfig};
use thiserror::Error;

use crate::kind::ServiceKind;

/// Boxed error returned by service factories and close calls.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`ServiceManager`](crate::ServiceManager).
#[derive(Debug, Error)]
pub enum PoolError {
    /// No usable connection configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The factory failed to construct a sub-service.
    #[error("Failed to create {kind} service for config {identity}: {source}")]
    Creation {
        /// Requested kind.
        kind: ServiceKind,
        /// Identity of the configuration.
        identity: ConfigIdentity,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// The factory does not know how to build this kind.
    #[error("Unsupported service kind: {0}")]
    UnsupportedKind(ServiceKind),
}

impl PoolError {
    /// Wrap a factory failure for `kind` under `config`.
    pub fn creation(
        kind: &ServiceKind,
        config: &ConnectionConfig,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Creation {
            kind: kind.clone(),
            identity: config.identity(),
            source: source.into(),
        }
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_from() {
        let err: PoolError = ConfigError::missing("NACOS_SERVER_ADDR", "set it").into();
        assert!(matches!(err, PoolError::Configuration(_)));
        assert!(err.to_string().contains("NACOS_SERVER_ADDR"));
    }

    #[test]
    fn test_unsupported_kind_display() {
        let err = PoolError::UnsupportedKind(ServiceKind::new("lock"));
        assert_eq!(err.to_string(), "Unsupported service kind: lock");
    }
}

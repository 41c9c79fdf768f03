//! Error types for connection configuration.

use thiserror::Error;

/// Errors raised while building or resolving a [`ConnectionConfig`](crate::ConnectionConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable or config value was not provided.
    #[error("Missing required environment variable: {name}. {hint}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
        /// How to fix it.
        hint: String,
    },

    /// A value was present but could not be used.
    #[error("Invalid configuration value for {field}: {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        message: String,
    },
}

impl ConfigError {
    /// Create a missing-variable error.
    pub fn missing(name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingVariable {
            name: name.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid-value error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias using ConfigError.
pub type Result<T> = std::result::Result<T, ConfigError>;

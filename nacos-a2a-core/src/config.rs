//! Connection configuration for a Nacos backend.
//!
//! A [`ConnectionConfig`] describes how to reach a registry: the server
//! addresses (or a discovery endpoint), the namespace, an optional context path
//! and optional credentials. Secret material is never printed by `Debug` and
//! never serialized.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::{ConfigError, Result};
use crate::identity::{ConfigIdentity, IdentityFields};

/// Default namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "public";

/// Default HTTP context path of a Nacos server.
pub const DEFAULT_CONTEXT_PATH: &str = "nacos";

/// Default log level reported to the client.
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Credentials used to authenticate against the registry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Access-key / secret-key pair (Alibaba Cloud MSE).
    AccessKey {
        /// Access key identifier.
        access_key: String,
        /// Secret key.
        #[serde(skip_serializing, default)]
        secret_key: String,
    },
    /// Username / password pair (self-hosted Nacos).
    Basic {
        /// Username.
        username: String,
        /// Password.
        #[serde(skip_serializing, default)]
        password: String,
    },
}

impl Credentials {
    /// Create an access-key credential.
    pub fn access_key(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self::AccessKey {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Create a username/password credential.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The access key identifier, if this is an AK/SK credential.
    pub fn access_key_id(&self) -> Option<&str> {
        match self {
            Self::AccessKey { access_key, .. } => Some(access_key),
            Self::Basic { .. } => None,
        }
    }

    /// The username, if this is a basic credential.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Basic { username, .. } => Some(username),
            Self::AccessKey { .. } => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessKey { access_key, .. } => f
                .debug_struct("AccessKey")
                .field("access_key", access_key)
                .field("secret_key", &"***")
                .finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// How to reach a Nacos backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server addresses, `host:port` each.
    #[serde(default)]
    pub server_addresses: Vec<String>,
    /// Discovery endpoint serving the server list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Namespace identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    /// HTTP context path of the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_path: Option<String>,
    /// Optional credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    /// Client log level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Request timeout.
    #[serde(skip, default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_addresses: Vec::new(),
            endpoint: None,
            namespace_id: None,
            context_path: None,
            credentials: None,
            log_level: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Start building a configuration.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// The namespace, defaulting to `public`.
    pub fn namespace(&self) -> &str {
        self.namespace_id.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// The context path without surrounding slashes, defaulting to `nacos`.
    pub fn context_path(&self) -> &str {
        self.context_path
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .unwrap_or(DEFAULT_CONTEXT_PATH)
    }

    /// Human-readable summary of where this config points.
    pub fn address_summary(&self) -> String {
        if !self.server_addresses.is_empty() {
            self.server_addresses.join(",")
        } else {
            self.endpoint.clone().unwrap_or_default()
        }
    }

    /// Derive the pooling identity of this configuration.
    pub fn identity(&self) -> ConfigIdentity {
        ConfigIdentity::derive(self)
    }

    /// Whether two configurations route to the same backend identity.
    ///
    /// Secret fields are not compared.
    pub fn is_equivalent(&self, other: &ConnectionConfig) -> bool {
        IdentityFields::from_config(self) == IdentityFields::from_config(other)
    }
}

/// Fluent builder for [`ConnectionConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Set the server address list from a comma-separated string.
    #[must_use]
    pub fn server_address(mut self, addresses: impl AsRef<str>) -> Self {
        self.config.server_addresses = addresses
            .as_ref()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Add a single server address.
    #[must_use]
    pub fn add_server(mut self, address: impl Into<String>) -> Self {
        self.config.server_addresses.push(address.into());
        self
    }

    /// Set the discovery endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Set the namespace.
    #[must_use]
    pub fn namespace_id(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace_id = Some(namespace.into());
        self
    }

    /// Set the context path.
    #[must_use]
    pub fn context_path(mut self, path: impl Into<String>) -> Self {
        self.config.context_path = Some(path.into());
        self
    }

    /// Use access-key / secret-key authentication.
    #[must_use]
    pub fn access_key(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::access_key(access_key, secret_key));
        self
    }

    /// Use username / password authentication.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::basic(username, password));
        self
    }

    /// Set the client log level.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = Some(level.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Finish the configuration.
    ///
    /// Fails when neither a server address nor an endpoint was given.
    pub fn build(self) -> Result<ConnectionConfig> {
        if self.config.server_addresses.is_empty() && self.config.endpoint.is_none() {
            return Err(ConfigError::invalid(
                "server_addresses",
                "either a server address or an endpoint is required",
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_splits_addresses() {
        let config = ConnectionConfig::builder()
            .server_address("h1:8848, h2:8848,,")
            .namespace_id("dev")
            .build()
            .unwrap();

        assert_eq!(config.server_addresses, vec!["h1:8848", "h2:8848"]);
        assert_eq!(config.namespace(), "dev");
        assert_eq!(config.context_path(), "nacos");
    }

    #[test]
    fn test_builder_requires_address_or_endpoint() {
        let err = ConnectionConfig::builder().namespace_id("x").build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let config = ConnectionConfig::builder()
            .endpoint("acm.example.com:8080")
            .build()
            .unwrap();
        assert_eq!(config.address_summary(), "acm.example.com:8080");
    }

    #[test]
    fn test_context_path_trims_slashes() {
        let config = ConnectionConfig::builder()
            .server_address("h1:8848")
            .context_path("/custom/")
            .build()
            .unwrap();
        assert_eq!(config.context_path(), "custom");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ConnectionConfig::builder()
            .server_address("h1:8848")
            .basic_auth("nacos", "hunter2")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("nacos"));
        assert!(!debug.contains("hunter2"));

        let ak = Credentials::access_key("ak-id", "sk-secret");
        assert!(!format!("{:?}", ak).contains("sk-secret"));
    }

    #[test]
    fn test_serialize_skips_secrets() {
        let config = ConnectionConfig::builder()
            .server_address("h1:8848")
            .access_key("ak-id", "sk-secret")
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("ak-id"));
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_equivalence_ignores_secrets_and_order() {
        let a = ConnectionConfig::builder()
            .server_address("h1:8848,h2:8848")
            .basic_auth("u", "p1")
            .build()
            .unwrap();
        let b = ConnectionConfig::builder()
            .server_address("h2:8848,h1:8848")
            .basic_auth("u", "p2")
            .build()
            .unwrap();
        let c = ConnectionConfig::builder()
            .server_address("h1:8848,h2:8848")
            .basic_auth("other", "p1")
            .build()
            .unwrap();

        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }
}

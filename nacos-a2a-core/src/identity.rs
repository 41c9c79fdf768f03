//! Pooling identity of a connection configuration.
//!
//! The identity is derived from the fields that decide where a connection is
//! routed: server addresses (sorted), endpoint, namespace, context path,
//! access-key id and username. Password and secret key never take part.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::config::ConnectionConfig;

const IDENTITY_LEN: usize = 16;

/// Fixed-width fingerprint of a [`ConnectionConfig`], used as a pool key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigIdentity(String);

impl ConfigIdentity {
    /// Derive the identity of a configuration.
    pub fn derive(config: &ConnectionConfig) -> Self {
        let fields = IdentityFields::from_config(config);
        let digest = Sha256::digest(fields.joined().as_bytes());
        let mut hex = format!("{:x}", digest);
        hex.truncate(IDENTITY_LEN);

        tracing::debug!(
            identity = %hex,
            servers = %config.address_summary(),
            namespace = %fields.namespace,
            "Derived config identity"
        );

        Self(hex)
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConfigIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The routing-relevant subset of a configuration.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct IdentityFields<'a> {
    servers: Vec<&'a str>,
    endpoint: &'a str,
    namespace: &'a str,
    context_path: &'a str,
    access_key: &'a str,
    username: &'a str,
}

impl<'a> IdentityFields<'a> {
    pub(crate) fn from_config(config: &'a ConnectionConfig) -> Self {
        let mut servers: Vec<&str> = config.server_addresses.iter().map(String::as_str).collect();
        servers.sort_unstable();

        let credentials = config.credentials.as_ref();
        Self {
            servers,
            endpoint: config.endpoint.as_deref().unwrap_or(""),
            namespace: config.namespace_id.as_deref().unwrap_or(""),
            context_path: config.context_path.as_deref().unwrap_or(""),
            access_key: credentials.and_then(|c| c.access_key_id()).unwrap_or(""),
            username: credentials.and_then(|c| c.username()).unwrap_or(""),
        }
    }

    fn joined(&self) -> String {
        [
            self.servers.join(",").as_str(),
            self.endpoint,
            self.namespace,
            self.context_path,
            self.access_key,
            self.username,
        ]
        .join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(servers: &str) -> ConnectionConfig {
        ConnectionConfig::builder()
            .server_address(servers)
            .namespace_id("public")
            .basic_auth("u", "p")
            .build()
            .unwrap()
    }

    #[test]
    fn test_identity_is_fixed_width_hex() {
        let id = config("h1:8848").identity();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_server_order_does_not_matter() {
        assert_eq!(
            config("h1:8848,h2:8848").identity(),
            config("h2:8848,h1:8848").identity()
        );
    }

    #[test]
    fn test_secrets_do_not_matter() {
        let a = ConnectionConfig::builder()
            .server_address("h1:8848")
            .access_key("ak", "secret-one")
            .build()
            .unwrap();
        let b = ConnectionConfig::builder()
            .server_address("h1:8848")
            .access_key("ak", "secret-two")
            .build()
            .unwrap();
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_secret_not_in_identity_input() {
        let cfg = ConnectionConfig::builder()
            .server_address("h1:8848")
            .basic_auth("user", "topsecret")
            .build()
            .unwrap();
        let joined = IdentityFields::from_config(&cfg).joined();
        assert_eq!(joined, "h1:8848|||||user");
        assert!(!joined.contains("topsecret"));
    }

    #[test]
    fn test_routing_fields_change_identity() {
        let base = config("h1:8848");

        let other_ns = ConnectionConfig::builder()
            .server_address("h1:8848")
            .namespace_id("dev")
            .basic_auth("u", "p")
            .build()
            .unwrap();
        let other_user = ConnectionConfig::builder()
            .server_address("h1:8848")
            .namespace_id("public")
            .basic_auth("v", "p")
            .build()
            .unwrap();
        let other_ctx = ConnectionConfig::builder()
            .server_address("h1:8848")
            .namespace_id("public")
            .context_path("custom")
            .basic_auth("u", "p")
            .build()
            .unwrap();

        assert_ne!(base.identity(), other_ns.identity());
        assert_ne!(base.identity(), other_user.identity());
        assert_ne!(base.identity(), other_ctx.identity());
    }

    #[test]
    fn test_missing_optionals_are_empty() {
        let cfg = ConnectionConfig::builder().endpoint("ep:8080").build().unwrap();
        assert_eq!(IdentityFields::from_config(&cfg).joined(), "|ep:8080||||");
    }
}

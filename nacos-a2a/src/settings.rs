//! Registry settings from the environment.
//!
//! | variable | meaning |
//! |---|---|
//! | `A2A_REGISTRY_ENABLED` | registry toggle, default `true` |
//! | `A2A_REGISTRY_TYPE` | comma-separated registry types, e.g. `nacos` |
//! | `NACOS_SERVER_ADDR` | Nacos address, default `localhost:8848` |
//! | `NACOS_USERNAME` / `NACOS_PASSWORD` | Nacos credentials; used only when both are set |

use nacos_a2a_core::env::{env_var, load_dotenv, NACOS_PASSWORD, NACOS_SERVER_ADDR, NACOS_USERNAME};
use nacos_a2a_core::{ConfigError, ConnectionConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::nacos::NacosRegistry;
use crate::registry::{A2aRegistry, Registries};

/// Registry toggle.
pub const A2A_REGISTRY_ENABLED: &str = "A2A_REGISTRY_ENABLED";
/// Registry types.
pub const A2A_REGISTRY_TYPE: &str = "A2A_REGISTRY_TYPE";

/// Nacos address used when none is configured.
pub const DEFAULT_NACOS_SERVER_ADDR: &str = "localhost:8848";

/// Settings controlling which registries an agent is published to.
#[derive(Clone, PartialEq, Eq)]
pub struct A2aRegistrySettings {
    /// Whether registration is enabled at all.
    pub enabled: bool,
    /// Requested registry types, lower-cased.
    pub registry_types: Vec<String>,
    /// Nacos server address list.
    pub nacos_server_addr: String,
    /// Nacos username.
    pub nacos_username: Option<String>,
    /// Nacos password.
    pub nacos_password: Option<String>,
}

impl std::fmt::Debug for A2aRegistrySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("A2aRegistrySettings")
            .field("enabled", &self.enabled)
            .field("registry_types", &self.registry_types)
            .field("nacos_server_addr", &self.nacos_server_addr)
            .field("nacos_username", &self.nacos_username)
            .field("nacos_password", &self.nacos_password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for A2aRegistrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            registry_types: Vec::new(),
            nacos_server_addr: DEFAULT_NACOS_SERVER_ADDR.to_string(),
            nacos_username: None,
            nacos_password: None,
        }
    }
}

impl A2aRegistrySettings {
    /// Load settings from the process environment (and `.env`).
    pub fn from_env() -> Self {
        load_dotenv();
        Self::from_lookup(env_var)
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let enabled = match get(A2A_REGISTRY_ENABLED) {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Invalid {}, keeping registry enabled", A2A_REGISTRY_ENABLED);
                true
            }),
            None => defaults.enabled,
        };

        Self {
            enabled,
            registry_types: get(A2A_REGISTRY_TYPE)
                .map(|raw| split_registry_types(&raw))
                .unwrap_or_default(),
            nacos_server_addr: get(NACOS_SERVER_ADDR).unwrap_or(defaults.nacos_server_addr),
            nacos_username: get(NACOS_USERNAME),
            nacos_password: get(NACOS_PASSWORD),
        }
    }

    /// Whether both Nacos credentials are set.
    pub fn has_nacos_auth(&self) -> bool {
        self.nacos_username.is_some() && self.nacos_password.is_some()
    }

    /// Connection configuration for the Nacos registry.
    pub fn nacos_config(&self) -> Result<ConnectionConfig, ConfigError> {
        let mut builder = ConnectionConfig::builder().server_address(&self.nacos_server_addr);
        if let (Some(username), Some(password)) = (&self.nacos_username, &self.nacos_password) {
            builder = builder.basic_auth(username, password);
        }
        builder.build()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_registry_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Build the registries requested by the environment.
pub fn create_registry_from_env() -> Registries {
    create_registries(&A2aRegistrySettings::from_env())
}

/// Build the registries requested by `settings`.
///
/// Unknown registry types and registries that cannot be configured are
/// logged and skipped.
pub fn create_registries(settings: &A2aRegistrySettings) -> Registries {
    if !settings.enabled {
        debug!("Registry disabled via {}", A2A_REGISTRY_ENABLED);
        return Registries::none();
    }
    if settings.registry_types.is_empty() {
        debug!("No registry type specified in {}", A2A_REGISTRY_TYPE);
        return Registries::none();
    }

    let mut registries = Registries::none();
    for registry_type in &settings.registry_types {
        match registry_type.as_str() {
            "nacos" => match create_nacos_registry(settings) {
                Ok(registry) => registries.push(registry),
                Err(e) => warn!(error = %e, "Failed to construct Nacos registry from settings"),
            },
            other => warn!(registry_type = %other, "Unknown registry type requested. Supported: nacos"),
        }
    }
    registries
}

fn create_nacos_registry(settings: &A2aRegistrySettings) -> Result<Arc<dyn A2aRegistry>, ConfigError> {
    let config = settings.nacos_config()?;
    info!(
        server = %settings.nacos_server_addr,
        authentication = if settings.has_nacos_auth() { "enabled" } else { "disabled" },
        "Created Nacos registry from environment"
    );
    Ok(Arc::new(NacosRegistry::new(Some(config))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacos_a2a_core::Credentials;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> A2aRegistrySettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        A2aRegistrySettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s, A2aRegistrySettings::default());
        assert!(s.enabled);
        assert_eq!(s.nacos_server_addr, "localhost:8848");
        assert!(!s.has_nacos_auth());
    }

    #[rstest]
    #[case("false", false)]
    #[case("0", false)]
    #[case("Off", false)]
    #[case("TRUE", true)]
    #[case("yes", true)]
    #[case("garbage", true)]
    fn test_enabled_parsing(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(settings(&[(A2A_REGISTRY_ENABLED, raw)]).enabled, expected);
    }

    #[test]
    fn test_registry_types_are_normalized() {
        let s = settings(&[(A2A_REGISTRY_TYPE, " Nacos, ,ETCD ")]);
        assert_eq!(s.registry_types, vec!["nacos".to_string(), "etcd".to_string()]);
    }

    #[test]
    fn test_nacos_config_uses_auth_only_when_complete() {
        let s = settings(&[(NACOS_SERVER_ADDR, "h1:8848"), (NACOS_USERNAME, "nacos")]);
        let config = s.nacos_config().unwrap();
        assert_eq!(config.server_addresses, vec!["h1:8848".to_string()]);
        assert!(config.credentials.is_none());

        let s = settings(&[(NACOS_USERNAME, "nacos"), (NACOS_PASSWORD, "secret")]);
        let config = s.nacos_config().unwrap();
        assert!(matches!(config.credentials, Some(Credentials::Basic { .. })));
    }

    #[test]
    fn test_debug_redacts_password() {
        let s = settings(&[(NACOS_USERNAME, "nacos"), (NACOS_PASSWORD, "secret")]);
        let debug = format!("{:?}", s);
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_create_registries() {
        assert!(create_registries(&settings(&[(A2A_REGISTRY_TYPE, "nacos"), (A2A_REGISTRY_ENABLED, "false")])).is_empty());
        assert!(create_registries(&settings(&[])).is_empty());
        assert!(create_registries(&settings(&[(A2A_REGISTRY_TYPE, "etcd")])).is_empty());

        let registries = create_registries(&settings(&[(A2A_REGISTRY_TYPE, "nacos,consul")]));
        assert_eq!(registries.names(), vec!["nacos".to_string()]);
    }
}

//! Agent registries.
//!
//! A registry publishes an agent card and the network endpoints serving it
//! to a discovery system. Registration happens once, when the agent's routes
//! are mounted, and a failing registry never prevents the agent from
//! serving.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::RegistryError;
use crate::schema::{AgentCard, AgentInterface};

/// Prefix of environment variables describing transports.
pub const TRANSPORT_ENV_PREFIX: &str = "NACOS_A2A_AGENT_";

/// Where the agent is deployed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployProperties {
    /// Server host.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
    /// Root path the application is mounted under.
    #[serde(default)]
    pub root_path: String,
    /// Base URL of the service.
    pub base_url: Option<String>,
    /// Additional runtime properties.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// How one transport of the agent is reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct A2aTransportProperties {
    /// Transport name, e.g. `JSONRPC`.
    pub transport: String,
    /// Full URL, when known.
    pub url: Option<String>,
    /// Host.
    pub host: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// Request path.
    pub path: Option<String>,
    /// URL scheme.
    pub protocol: Option<String>,
    /// URL query string.
    pub query: Option<String>,
    /// Whether the transport is served over TLS.
    #[serde(default)]
    pub support_tls: bool,
    /// Additional properties.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl A2aTransportProperties {
    /// Create empty properties for `transport`.
    pub fn new(transport: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            ..Self::default()
        }
    }

    /// Derive host, port, path, scheme, query and TLS from `url`.
    ///
    /// A missing port falls back to the scheme's default. `https` implies TLS.
    pub fn from_url(transport: impl Into<String>, url: &str) -> Result<Self, RegistryError> {
        let parsed = url::Url::parse(url).map_err(|e| RegistryError::invalid_url(url, e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| RegistryError::invalid_url(url, "missing host"))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| RegistryError::invalid_url(url, "missing port"))?;

        Ok(Self {
            transport: transport.into(),
            url: Some(url.to_string()),
            host: Some(host.to_string()),
            port: Some(port),
            path: Some(parsed.path().to_string()),
            protocol: Some(parsed.scheme().to_string()),
            query: parsed.query().map(str::to_string),
            support_tls: parsed.scheme() == "https",
            extra: serde_json::Map::new(),
        })
    }

    /// Properties for an interface advertised by an agent card.
    pub fn from_interface(interface: &AgentInterface) -> Result<Self, RegistryError> {
        Self::from_url(interface.transport.clone(), &interface.url)
    }

    /// Read transports from the process environment.
    pub fn from_env() -> Vec<Self> {
        Self::from_env_vars(std::env::vars())
    }

    /// Read transports from `NACOS_A2A_AGENT_<TRANSPORT>_<ATTR>` variables.
    ///
    /// `ATTR` is one of `HOST`, `PORT`, `PATH`, `PROTOCOL`, `QUERY` or `TLS`.
    /// Variables of any other shape are ignored. Transport names are
    /// upper-cased; the result is ordered by transport name.
    pub fn from_env_vars<I>(vars: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut transports: BTreeMap<String, Self> = BTreeMap::new();

        for (key, value) in vars {
            let Some(rest) = key.strip_prefix(TRANSPORT_ENV_PREFIX) else {
                continue;
            };
            let parts: Vec<&str> = rest.split('_').collect();
            let [transport, attr] = parts.as_slice() else {
                continue;
            };
            let transport = transport.trim().to_uppercase();
            let attr = attr.trim().to_uppercase();
            if transport.is_empty() {
                continue;
            }

            let entry = transports
                .entry(transport.clone())
                .or_insert_with(|| Self::new(transport.clone()));
            match attr.as_str() {
                "HOST" => entry.host = Some(value),
                "PORT" => match value.trim().parse::<u16>() {
                    Ok(port) => entry.port = Some(port),
                    Err(_) => warn!(key = %key, value = %value, "Ignoring invalid transport port"),
                },
                "PATH" => entry.path = Some(value),
                "PROTOCOL" => entry.protocol = Some(value),
                "QUERY" => entry.query = Some(value),
                "TLS" => entry.support_tls = value.trim().eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        transports
            .into_values()
            .filter(|t| t != &Self::new(t.transport.clone()))
            .collect()
    }
}

/// A discovery system agents can be published to.
#[async_trait]
pub trait A2aRegistry: Send + Sync {
    /// Short name identifying the registry, e.g. `nacos`.
    fn registry_name(&self) -> &str;

    /// Publish `card` and the endpoints serving it.
    ///
    /// `transports` may be empty, in which case the registry decides which
    /// endpoints to publish.
    async fn register(
        &self,
        card: &AgentCard,
        deploy: &DeployProperties,
        transports: &[A2aTransportProperties],
    ) -> Result<(), RegistryError>;
}

/// The registries an agent is published to; possibly none.
#[derive(Clone, Default)]
pub struct Registries(Vec<Arc<dyn A2aRegistry>>);

impl Registries {
    /// No registries.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single registry.
    pub fn single(registry: impl A2aRegistry + 'static) -> Self {
        Self(vec![Arc::new(registry)])
    }

    /// Add a registry.
    pub fn push(&mut self, registry: Arc<dyn A2aRegistry>) {
        self.0.push(registry);
    }

    /// Number of registries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no registries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the registries.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn A2aRegistry>> {
        self.0.iter()
    }

    /// Names of the registries, in order.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|r| r.registry_name().to_string()).collect()
    }
}

impl std::fmt::Debug for Registries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Registries").field(&self.names()).finish()
    }
}

impl From<Arc<dyn A2aRegistry>> for Registries {
    fn from(registry: Arc<dyn A2aRegistry>) -> Self {
        Self(vec![registry])
    }
}

impl From<Vec<Arc<dyn A2aRegistry>>> for Registries {
    fn from(registries: Vec<Arc<dyn A2aRegistry>>) -> Self {
        Self(registries)
    }
}

impl From<Option<Arc<dyn A2aRegistry>>> for Registries {
    fn from(registry: Option<Arc<dyn A2aRegistry>>) -> Self {
        Self(registry.into_iter().collect())
    }
}

impl FromIterator<Arc<dyn A2aRegistry>> for Registries {
    fn from_iter<I: IntoIterator<Item = Arc<dyn A2aRegistry>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

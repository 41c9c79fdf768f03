//! A2A protocol adapter.
//!
//! [`A2aProtocolAdapter`] builds the agent card of a locally served agent,
//! mounts its JSON-RPC and well-known routes (with the `server` feature) and
//! publishes it to the configured registries.
//!
//! ```rust
//! use nacos_a2a::{A2aProtocolAdapter, AgentSkill};
//!
//! let adapter = A2aProtocolAdapter::new("friday", "A helpful assistant")
//!     .card_url("http://10.0.0.1:8000")
//!     .provider("acme")
//!     .skill(AgentSkill::new("chat", "Chat"));
//!
//! let card = adapter.agent_card();
//! assert_eq!(card.url, "http://10.0.0.1:8000");
//! assert_eq!(adapter.json_rpc_url(), "http://10.0.0.1:8000/a2a");
//! ```

use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::jsonrpc::DEFAULT_TASK_TIMEOUT;
use crate::registry::{DeployProperties, Registries};
use crate::schema::{
    AgentCapabilities, AgentCard, AgentInterface, AgentProvider, AgentSkill, PROTOCOL_VERSION,
};

/// Default path of the JSON-RPC endpoint.
pub const DEFAULT_JSON_RPC_PATH: &str = "/a2a";

/// Default path of the agent card document.
pub const DEFAULT_WELLKNOWN_PATH: &str = "/.wellknown/agent-card.json";

/// Default transport.
pub const DEFAULT_TRANSPORT: &str = "JSONRPC";

/// Base URL used when no card URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default input and output modes.
pub const DEFAULT_INPUT_OUTPUT_MODES: &[&str] = &["text"];

/// Provider information in any of the accepted shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSpec {
    /// Organization name only.
    Name(String),
    /// Free-form map with `organization` (or `name`) and `url` keys.
    Map(Map<String, Value>),
    /// Fully specified provider.
    Provider(AgentProvider),
}

impl ProviderSpec {
    /// Convert to an [`AgentProvider`]; missing fields become empty strings.
    pub fn normalize(&self) -> AgentProvider {
        match self {
            ProviderSpec::Name(name) => AgentProvider {
                organization: name.clone(),
                url: String::new(),
            },
            ProviderSpec::Map(map) => {
                let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
                AgentProvider {
                    organization: field("organization").or_else(|| field("name")).unwrap_or_default(),
                    url: field("url").unwrap_or_default(),
                }
            }
            ProviderSpec::Provider(provider) => provider.clone(),
        }
    }
}

impl From<&str> for ProviderSpec {
    fn from(name: &str) -> Self {
        ProviderSpec::Name(name.to_string())
    }
}

impl From<String> for ProviderSpec {
    fn from(name: String) -> Self {
        ProviderSpec::Name(name)
    }
}

impl From<Map<String, Value>> for ProviderSpec {
    fn from(map: Map<String, Value>) -> Self {
        ProviderSpec::Map(map)
    }
}

impl From<AgentProvider> for ProviderSpec {
    fn from(provider: AgentProvider) -> Self {
        ProviderSpec::Provider(provider)
    }
}

/// Outcome of publishing an agent to its registries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Registries the agent was published to.
    pub registered: Vec<String>,
    /// Registries that failed.
    pub failed: Vec<String>,
}

/// Serves an agent over A2A and publishes it to registries.
#[derive(Debug, Clone)]
pub struct A2aProtocolAdapter {
    agent_name: String,
    agent_description: String,
    registries: Registries,
    card_url: Option<String>,
    preferred_transport: Option<String>,
    additional_interfaces: Vec<AgentInterface>,
    card_version: Option<String>,
    skills: Vec<AgentSkill>,
    default_input_modes: Option<Vec<String>>,
    default_output_modes: Option<Vec<String>>,
    provider: Option<ProviderSpec>,
    documentation_url: Option<String>,
    icon_url: Option<String>,
    security_schemes: Option<Map<String, Value>>,
    security: Option<Value>,
    pub(crate) task_timeout: Duration,
    pub(crate) json_rpc_path: String,
    pub(crate) wellknown_path: String,
}

impl A2aProtocolAdapter {
    /// Create an adapter with defaults for everything but name and description.
    pub fn new(agent_name: impl Into<String>, agent_description: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            agent_description: agent_description.into(),
            registries: Registries::none(),
            card_url: None,
            preferred_transport: None,
            additional_interfaces: Vec::new(),
            card_version: None,
            skills: Vec::new(),
            default_input_modes: None,
            default_output_modes: None,
            provider: None,
            documentation_url: None,
            icon_url: None,
            security_schemes: None,
            security: None,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            json_rpc_path: DEFAULT_JSON_RPC_PATH.to_string(),
            wellknown_path: DEFAULT_WELLKNOWN_PATH.to_string(),
        }
    }

    /// Registries to publish the agent to.
    #[must_use]
    pub fn registry(mut self, registries: impl Into<Registries>) -> Self {
        self.registries = registries.into();
        self
    }

    /// URL advertised in the card; also the base of the JSON-RPC URL.
    #[must_use]
    pub fn card_url(mut self, url: impl Into<String>) -> Self {
        self.card_url = Some(url.into());
        self
    }

    /// Transport served at the card URL.
    #[must_use]
    pub fn preferred_transport(mut self, transport: impl Into<String>) -> Self {
        self.preferred_transport = Some(transport.into());
        self
    }

    /// Advertise another transport.
    #[must_use]
    pub fn additional_interface(mut self, interface: AgentInterface) -> Self {
        self.additional_interfaces.push(interface);
        self
    }

    /// Card version; defaults to this crate's version.
    #[must_use]
    pub fn card_version(mut self, version: impl Into<String>) -> Self {
        self.card_version = Some(version.into());
        self
    }

    /// Add a skill.
    #[must_use]
    pub fn skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }

    /// Accepted input modes.
    #[must_use]
    pub fn default_input_modes(mut self, modes: Vec<String>) -> Self {
        self.default_input_modes = Some(modes);
        self
    }

    /// Produced output modes.
    #[must_use]
    pub fn default_output_modes(mut self, modes: Vec<String>) -> Self {
        self.default_output_modes = Some(modes);
        self
    }

    /// Provider, as a name, a map or an [`AgentProvider`].
    #[must_use]
    pub fn provider(mut self, provider: impl Into<ProviderSpec>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Documentation URL.
    #[must_use]
    pub fn documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Icon URL.
    #[must_use]
    pub fn icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    /// Security scheme definitions.
    #[must_use]
    pub fn security_schemes(mut self, schemes: Map<String, Value>) -> Self {
        self.security_schemes = Some(schemes);
        self
    }

    /// Security requirements.
    #[must_use]
    pub fn security(mut self, security: Value) -> Self {
        self.security = Some(security);
        self
    }

    /// Time the agent gets to answer one message (default 60s).
    #[must_use]
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Path of the JSON-RPC endpoint (default `/a2a`).
    #[must_use]
    pub fn json_rpc_path(mut self, path: impl Into<String>) -> Self {
        self.json_rpc_path = path.into();
        self
    }

    /// Path of the card document (default `/.wellknown/agent-card.json`).
    #[must_use]
    pub fn wellknown_path(mut self, path: impl Into<String>) -> Self {
        self.wellknown_path = path.into();
        self
    }

    /// The configured registries.
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Full URL of the JSON-RPC endpoint.
    pub fn json_rpc_url(&self) -> String {
        let base = self.card_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base = format!("{}/", base.trim_end_matches('/'));
        let path = self.json_rpc_path.trim_start_matches('/');
        match url::Url::parse(&base).and_then(|b| b.join(path)) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", base, path),
        }
    }

    /// Build the agent card.
    pub fn agent_card(&self) -> AgentCard {
        let modes = |configured: &Option<Vec<String>>| {
            configured
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_INPUT_OUTPUT_MODES.iter().map(|m| m.to_string()).collect())
        };

        AgentCard {
            protocol_version: PROTOCOL_VERSION.to_string(),
            name: self.agent_name.clone(),
            description: self.agent_description.clone(),
            url: self.card_url.clone().unwrap_or_else(|| self.json_rpc_url()),
            preferred_transport: Some(
                self.preferred_transport
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TRANSPORT.to_string()),
            ),
            additional_interfaces: self.additional_interfaces.clone(),
            icon_url: self.icon_url.clone(),
            provider: self.provider.as_ref().map(ProviderSpec::normalize),
            version: self
                .card_version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            documentation_url: self.documentation_url.clone(),
            capabilities: AgentCapabilities {
                streaming: false,
                push_notifications: false,
                state_transition_history: false,
            },
            security_schemes: self.security_schemes.clone(),
            security: self.security.clone(),
            default_input_modes: modes(&self.default_input_modes),
            default_output_modes: modes(&self.default_output_modes),
            skills: self.skills.clone(),
        }
    }

    /// Deployment properties for registration.
    ///
    /// Host and port come from the JSON-RPC URL. `host`, `port` and `path`
    /// keys are dropped from `extra`.
    pub fn deploy_properties(&self, root_path: &str, mut extra: Map<String, Value>) -> DeployProperties {
        let (host, port) = match url::Url::parse(&self.json_rpc_url()) {
            Ok(url) => (url.host_str().map(str::to_string), url.port()),
            Err(_) => (None, None),
        };
        for key in ["host", "port", "path"] {
            extra.remove(key);
        }

        DeployProperties {
            host,
            port,
            root_path: root_path.to_string(),
            base_url: None,
            extra,
        }
    }

    /// Publish `card` to every configured registry.
    ///
    /// Each registry is attempted once; failures are logged and never
    /// propagated.
    pub async fn register_with_all_registries(
        &self,
        card: &AgentCard,
        deploy: &DeployProperties,
    ) -> RegistrationReport {
        let mut report = RegistrationReport::default();

        for registry in self.registries.iter() {
            let name = registry.registry_name().to_string();
            info!(registry = %name, agent = %card.name, "Registering with registry");
            match registry.register(card, deploy, &[]).await {
                Ok(()) => {
                    info!(registry = %name, "Successfully registered with registry");
                    report.registered.push(name);
                }
                Err(e) => {
                    warn!(
                        registry = %name,
                        error = %e,
                        "Failed to register with registry. This will not block startup"
                    );
                    report.failed.push(name);
                }
            }
        }

        report
    }
}

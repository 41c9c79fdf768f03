//! Agent card resolution.
//!
//! Clients find the card of a remote agent through an
//! [`AgentCardResolver`]: a fixed card, the agent's well-known document, or
//! the Nacos A2A registry.

use async_trait::async_trait;
use nacos_a2a_client::{global_manager, NacosServiceManager, NacosServices};
use nacos_a2a_core::ConnectionConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::adapter::DEFAULT_WELLKNOWN_PATH;
use crate::error::ResolveError;
use crate::schema::AgentCard;

/// Looks up the card of an agent by name.
#[async_trait]
pub trait AgentCardResolver: Send + Sync {
    /// Resolve the card of `agent_name`.
    async fn get_agent_card(&self, agent_name: &str) -> Result<AgentCard, ResolveError>;
}

/// Always returns the same card.
#[derive(Debug, Clone)]
pub struct FixedAgentCardResolver {
    card: AgentCard,
}

impl FixedAgentCardResolver {
    /// Create a resolver for `card`.
    pub fn new(card: AgentCard) -> Self {
        Self { card }
    }
}

#[async_trait]
impl AgentCardResolver for FixedAgentCardResolver {
    async fn get_agent_card(&self, _agent_name: &str) -> Result<AgentCard, ResolveError> {
        Ok(self.card.clone())
    }
}

/// Fetches the card from the agent's well-known document.
#[derive(Debug, Clone)]
pub struct WellKnownAgentCardResolver {
    http: reqwest::Client,
    base_url: String,
    card_path: String,
    headers: Vec<(String, String)>,
}

impl WellKnownAgentCardResolver {
    /// Resolver for the agent served at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            card_path: DEFAULT_WELLKNOWN_PATH.to_string(),
            headers: Vec::new(),
        }
    }

    /// Path of the card document relative to the base URL.
    #[must_use]
    pub fn card_path(mut self, path: impl Into<String>) -> Self {
        self.card_path = path.into();
        self
    }

    /// Send an extra header, e.g. for authentication.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Full URL of the card document.
    pub fn card_url(&self) -> Result<url::Url, ResolveError> {
        let base = url::Url::parse(&format!("{}/", self.base_url.trim_end_matches('/')))?;
        Ok(base.join(self.card_path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl AgentCardResolver for WellKnownAgentCardResolver {
    async fn get_agent_card(&self, agent_name: &str) -> Result<AgentCard, ResolveError> {
        let url = self.card_url()?;
        debug!(agent = %agent_name, url = %url, "Fetching well-known agent card");

        let mut request = self.http.get(url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound(agent_name.to_string()));
        }
        let body = response.error_for_status()?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Looks the card up in the Nacos A2A registry.
pub struct NacosAgentCardResolver {
    manager: Arc<NacosServiceManager>,
    config: Option<ConnectionConfig>,
    version: Option<String>,
}

impl NacosAgentCardResolver {
    /// Resolver using the process-wide service manager.
    pub fn new(config: Option<ConnectionConfig>) -> Self {
        Self::with_manager(global_manager(), config)
    }

    /// Resolver using an explicit service manager.
    pub fn with_manager(manager: Arc<NacosServiceManager>, config: Option<ConnectionConfig>) -> Self {
        Self {
            manager,
            config,
            version: None,
        }
    }

    /// Resolve a specific version instead of the latest.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl std::fmt::Debug for NacosAgentCardResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NacosAgentCardResolver")
            .field("config", &self.config)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AgentCardResolver for NacosAgentCardResolver {
    async fn get_agent_card(&self, agent_name: &str) -> Result<AgentCard, ResolveError> {
        let ai = self.manager.get_ai_service(self.config.as_ref()).await?;
        let document = ai
            .get_agent_card(agent_name, self.version.as_deref())
            .await?
            .ok_or_else(|| ResolveError::NotFound(agent_name.to_string()))?;
        Ok(serde_json::from_value(document)?)
    }
}

//! AI service: publishing A2A agent cards and their endpoints.
//!
//! Agent cards are stored through the Nacos 3 A2A admin API. Endpoints are
//! stored as persistent naming instances of the service
//! `<agent name>::<version>` in [`AGENT_ENDPOINT_GROUP`], with the transport
//! details in the instance metadata.

use async_trait::async_trait;
use nacos_a2a_core::ConnectionConfig;
use nacos_a2a_pool::{BoxError, Closeable};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::error::{NacosError, NacosResult};
use crate::http::NacosHttpClient;
use crate::naming::{Instance, NamingService};

const A2A_PATH: &str = "v3/admin/ai/a2a";

/// Naming group holding agent endpoints.
pub const AGENT_ENDPOINT_GROUP: &str = "agent-endpoints";

/// The card describes a service with registered endpoints.
pub const REGISTRATION_TYPE_SERVICE: &str = "SERVICE";

/// The card's own URL is the only endpoint.
pub const REGISTRATION_TYPE_URL: &str = "URL";

/// A network endpoint serving an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEndpoint {
    /// Transport name, e.g. `JSONRPC`.
    pub transport: String,
    /// Host or IP.
    pub address: String,
    /// Port.
    pub port: u16,
    /// Request path.
    #[serde(default)]
    pub path: String,
    /// Whether the endpoint is served over TLS.
    #[serde(default)]
    pub support_tls: bool,
    /// Agent version this endpoint serves.
    #[serde(default)]
    pub version: String,
    /// URL scheme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// URL query string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl AgentEndpoint {
    fn to_instance(&self) -> Instance {
        let mut instance = Instance::new(self.address.clone(), self.port)
            .with_metadata("transport", self.transport.clone())
            .with_metadata("path", self.path.clone())
            .with_metadata("supportTls", self.support_tls.to_string())
            .with_metadata("version", self.version.clone());
        if let Some(protocol) = &self.protocol {
            instance = instance.with_metadata("protocol", protocol.clone());
        }
        if let Some(query) = &self.query {
            instance = instance.with_metadata("query", query.clone());
        }
        instance
    }

    fn from_instance(instance: &Instance) -> Self {
        let meta = |key: &str| instance.metadata.get(key).cloned();
        Self {
            transport: meta("transport").unwrap_or_default(),
            address: instance.ip.clone(),
            port: instance.port,
            path: meta("path").unwrap_or_default(),
            support_tls: meta("supportTls").is_some_and(|v| v == "true"),
            version: meta("version").unwrap_or_default(),
            protocol: meta("protocol"),
            query: meta("query"),
        }
    }
}

fn endpoint_service_name(agent_name: &str, version: &str) -> String {
    format!("{}::{}", agent_name, version)
}

/// Client for the Nacos A2A registry.
#[derive(Debug)]
pub struct AiService {
    client: Arc<NacosHttpClient>,
    endpoints: NamingService,
    closed: AtomicBool,
}

impl AiService {
    /// Connect an AI service for `config`.
    pub async fn connect(config: &ConnectionConfig) -> NacosResult<Self> {
        let client = NacosHttpClient::connect(config).await?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Build an AI service over an existing transport.
    pub fn with_client(client: Arc<NacosHttpClient>) -> Self {
        Self {
            endpoints: NamingService::with_client(Arc::clone(&client)),
            client,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> NacosResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NacosError::Closed);
        }
        Ok(())
    }

    /// Publish an agent card.
    ///
    /// `card` is the A2A agent card document; `set_as_latest` makes this
    /// version the one resolved when no version is requested.
    pub async fn release_agent_card(
        &self,
        agent_name: &str,
        card: &serde_json::Value,
        registration_type: &str,
        set_as_latest: bool,
    ) -> NacosResult<()> {
        self.ensure_open()?;
        let params = [
            ("namespaceId", self.client.namespace().to_string()),
            ("agentName", agent_name.to_string()),
            ("agentCard", serde_json::to_string(card)?),
            ("registrationType", registration_type.to_string()),
            ("setAsLatest", set_as_latest.to_string()),
        ];
        self.client
            .request::<serde_json::Value>(Method::POST, A2A_PATH, &params)
            .await?;
        info!(agent = %agent_name, "Released agent card");
        Ok(())
    }

    /// Fetch a published agent card; `None` when the server has no such agent.
    pub async fn get_agent_card(
        &self,
        agent_name: &str,
        version: Option<&str>,
    ) -> NacosResult<Option<serde_json::Value>> {
        self.ensure_open()?;
        let mut params = vec![
            ("namespaceId", self.client.namespace().to_string()),
            ("agentName", agent_name.to_string()),
        ];
        if let Some(version) = version {
            params.push(("version", version.to_string()));
        }
        match self.client.request(Method::GET, A2A_PATH, &params).await {
            Ok(card) => Ok(card),
            Err(NacosError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Register endpoints serving `agent_name` at `version`.
    pub async fn register_agent_endpoint(
        &self,
        agent_name: &str,
        version: &str,
        endpoints: &[AgentEndpoint],
    ) -> NacosResult<()> {
        self.ensure_open()?;
        let service = endpoint_service_name(agent_name, version);
        for endpoint in endpoints {
            self.endpoints
                .register_instance(&service, AGENT_ENDPOINT_GROUP, endpoint.to_instance())
                .await?;
        }
        info!(agent = %agent_name, version = %version, count = endpoints.len(), "Registered agent endpoints");
        Ok(())
    }

    /// List endpoints registered for `agent_name` at `version`.
    pub async fn list_agent_endpoints(
        &self,
        agent_name: &str,
        version: &str,
    ) -> NacosResult<Vec<AgentEndpoint>> {
        self.ensure_open()?;
        let service = endpoint_service_name(agent_name, version);
        let instances = self
            .endpoints
            .list_instances(&service, AGENT_ENDPOINT_GROUP, true)
            .await?;
        Ok(instances.iter().map(AgentEndpoint::from_instance).collect())
    }
}

#[async_trait]
impl Closeable for AiService {
    async fn close(&self) -> Result<(), BoxError> {
        self.closed.store(true, Ordering::SeqCst);
        self.endpoints.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_for(server: &MockServer) -> AiService {
        let config = ConnectionConfig::builder()
            .server_address(server.address().to_string())
            .build()
            .unwrap();
        AiService::connect(&config).await.unwrap()
    }

    fn endpoint() -> AgentEndpoint {
        AgentEndpoint {
            transport: "JSONRPC".to_string(),
            address: "10.0.0.1".to_string(),
            port: 8099,
            path: "/a2a".to_string(),
            support_tls: false,
            version: "1.0.0".to_string(),
            protocol: Some("http".to_string()),
            query: None,
        }
    }

    #[test]
    fn test_endpoint_instance_round_trip_keeps_metadata() {
        let endpoint = endpoint();
        let instance = endpoint.to_instance();
        assert_eq!(instance.metadata["transport"], "JSONRPC");
        assert_eq!(AgentEndpoint::from_instance(&instance), endpoint);
    }

    #[tokio::test]
    async fn test_release_agent_card() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nacos/v3/admin/ai/a2a"))
            .and(body_string_contains("agentName=friday"))
            .and(body_string_contains("registrationType=SERVICE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let ai = service_for(&server).await;
        ai.release_agent_card("friday", &json!({"name": "friday"}), REGISTRATION_TYPE_SERVICE, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_agent_card() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nacos/v3/admin/ai/a2a"))
            .and(query_param("agentName", "friday"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"name": "friday", "url": "http://10.0.0.1:8099/a2a", "version": "1.0.0"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/nacos/v3/admin/ai/a2a"))
            .and(query_param("agentName", "ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ai = service_for(&server).await;
        let card = ai.get_agent_card("friday", None).await.unwrap().unwrap();
        assert_eq!(card["url"], "http://10.0.0.1:8099/a2a");
        assert_eq!(ai.get_agent_card("ghost", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_endpoints_are_removed_on_close() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nacos/v2/ns/instance"))
            .and(body_string_contains("groupName=agent-endpoints"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/nacos/v2/ns/instance"))
            .and(query_param("serviceName", "friday::1.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let ai = service_for(&server).await;
        ai.register_agent_endpoint("friday", "1.0.0", &[endpoint()])
            .await
            .unwrap();
        ai.close().await.unwrap();

        assert!(matches!(
            ai.get_agent_card("friday", None).await,
            Err(NacosError::Closed)
        ));
    }
}

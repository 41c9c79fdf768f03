//! Nacos-backed agent registry.

use async_trait::async_trait;
use nacos_a2a_client::{
    global_manager, AgentEndpoint, NacosServiceManager, NacosServices, REGISTRATION_TYPE_SERVICE,
};
use nacos_a2a_core::ConnectionConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapter::DEFAULT_TRANSPORT;
use crate::error::RegistryError;
use crate::registry::{A2aRegistry, A2aTransportProperties, DeployProperties};
use crate::schema::AgentCard;

/// Publishes agents to the Nacos A2A registry.
///
/// The card is released as a `SERVICE` registration; its endpoints are then
/// registered from, in order of preference, the transports passed to
/// [`register`](A2aRegistry::register), the `NACOS_A2A_AGENT_*` environment
/// transports, or the interfaces advertised by the card itself.
pub struct NacosRegistry {
    manager: Arc<NacosServiceManager>,
    config: Option<ConnectionConfig>,
    env_transports: Vec<A2aTransportProperties>,
    set_as_latest: bool,
}

impl NacosRegistry {
    /// Registry using the process-wide service manager.
    ///
    /// `None` uses the manager's default configuration. Environment
    /// transports are read here.
    pub fn new(config: Option<ConnectionConfig>) -> Self {
        Self::with_manager(global_manager(), config)
            .env_transports(A2aTransportProperties::from_env())
    }

    /// Registry using an explicit service manager.
    pub fn with_manager(manager: Arc<NacosServiceManager>, config: Option<ConnectionConfig>) -> Self {
        Self {
            manager,
            config,
            env_transports: Vec::new(),
            set_as_latest: true,
        }
    }

    /// Transports used when none are passed to `register`.
    #[must_use]
    pub fn env_transports(mut self, transports: Vec<A2aTransportProperties>) -> Self {
        self.env_transports = transports;
        self
    }

    /// Whether released cards become the latest version (default true).
    #[must_use]
    pub fn set_as_latest(mut self, set_as_latest: bool) -> Self {
        self.set_as_latest = set_as_latest;
        self
    }

    /// The connection configuration, if not the default.
    pub fn config(&self) -> Option<&ConnectionConfig> {
        self.config.as_ref()
    }

    fn card_transports(
        card: &AgentCard,
        deploy: &DeployProperties,
    ) -> Result<Vec<A2aTransportProperties>, RegistryError> {
        let transport = card
            .preferred_transport
            .clone()
            .unwrap_or_else(|| DEFAULT_TRANSPORT.to_string());
        let mut primary = A2aTransportProperties::from_url(transport, &card.url)?;
        if let Some(host) = &deploy.host {
            primary.host = Some(host.clone());
        }
        if let Some(port) = deploy.port {
            primary.port = Some(port);
        }
        let root = deploy.root_path.trim_end_matches('/');
        if !root.is_empty() {
            let path = primary.path.take().unwrap_or_default();
            primary.path = Some(format!("{}/{}", root, path.trim_start_matches('/')));
        }

        let mut transports = vec![primary];
        for interface in &card.additional_interfaces {
            if interface.url == card.url {
                continue;
            }
            match A2aTransportProperties::from_interface(interface) {
                Ok(props) => transports.push(props),
                Err(e) => warn!(transport = %interface.transport, error = %e, "Skipping agent interface"),
            }
        }
        Ok(transports)
    }

    fn endpoints(
        &self,
        card: &AgentCard,
        deploy: &DeployProperties,
        transports: &[A2aTransportProperties],
    ) -> Result<Vec<AgentEndpoint>, RegistryError> {
        let derived;
        let transports = if !transports.is_empty() {
            transports
        } else if !self.env_transports.is_empty() {
            &self.env_transports
        } else {
            derived = Self::card_transports(card, deploy)?;
            &derived
        };

        Ok(transports
            .iter()
            .filter_map(|t| {
                let endpoint = to_endpoint(t, &card.version);
                if endpoint.is_none() {
                    warn!(transport = %t.transport, "Skipping transport without host");
                }
                endpoint
            })
            .collect())
    }
}

fn to_endpoint(transport: &A2aTransportProperties, version: &str) -> Option<AgentEndpoint> {
    let address = transport.host.clone()?;
    let default_port = if transport.support_tls { 443 } else { 80 };
    Some(AgentEndpoint {
        transport: transport.transport.clone(),
        address,
        port: transport.port.unwrap_or(default_port),
        path: transport.path.clone().unwrap_or_default(),
        support_tls: transport.support_tls,
        version: version.to_string(),
        protocol: transport.protocol.clone(),
        query: transport.query.clone(),
    })
}

impl std::fmt::Debug for NacosRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NacosRegistry")
            .field("config", &self.config)
            .field("env_transports", &self.env_transports)
            .field("set_as_latest", &self.set_as_latest)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl A2aRegistry for NacosRegistry {
    fn registry_name(&self) -> &str {
        "nacos"
    }

    async fn register(
        &self,
        card: &AgentCard,
        deploy: &DeployProperties,
        transports: &[A2aTransportProperties],
    ) -> Result<(), RegistryError> {
        let ai = self.manager.get_ai_service(self.config.as_ref()).await?;

        info!(agent = %card.name, version = %card.version, "Releasing agent card to Nacos");
        let document = serde_json::to_value(card)?;
        ai.release_agent_card(&card.name, &document, REGISTRATION_TYPE_SERVICE, self.set_as_latest)
            .await?;

        let endpoints = self.endpoints(card, deploy, transports)?;
        if endpoints.is_empty() {
            debug!(agent = %card.name, "No endpoints to register");
            return Ok(());
        }
        ai.register_agent_endpoint(&card.name, &card.version, &endpoints)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AgentCapabilities, AgentInterface, PROTOCOL_VERSION};
    use nacos_a2a_client::NacosServiceFactory;
    use nacos_a2a_core::ConfigError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn card() -> AgentCard {
        AgentCard {
            protocol_version: PROTOCOL_VERSION.to_string(),
            name: "friday".to_string(),
            description: "assistant".to_string(),
            url: "http://10.0.0.1:8000/a2a".to_string(),
            preferred_transport: Some("JSONRPC".to_string()),
            additional_interfaces: Vec::new(),
            icon_url: None,
            provider: None,
            version: "1.0.0".to_string(),
            documentation_url: None,
            capabilities: AgentCapabilities::default(),
            security_schemes: None,
            security: None,
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills: Vec::new(),
        }
    }

    fn manager() -> Arc<NacosServiceManager> {
        Arc::new(NacosServiceManager::with_env_loader(
            NacosServiceFactory,
            Box::new(|| Err(ConfigError::missing("NACOS_SERVER_ADDR", "set it"))),
        ))
    }

    fn config_for(server: &MockServer) -> ConnectionConfig {
        ConnectionConfig::builder()
            .server_address(server.address().to_string())
            .build()
            .unwrap()
    }

    fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": "ok"}))
    }

    async fn mount_card_release(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/nacos/v3/admin/ai/a2a"))
            .and(body_string_contains("agentName=friday"))
            .respond_with(ok())
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_card_transports_apply_deploy_properties() {
        let mut card = card();
        card.additional_interfaces = vec![
            AgentInterface::new("JSONRPC", "http://10.0.0.1:8000/a2a"),
            AgentInterface::new("GRPC", "https://10.0.0.1:9443"),
        ];
        let deploy = DeployProperties {
            host: Some("192.168.1.7".to_string()),
            port: Some(9000),
            root_path: "/api/".to_string(),
            ..DeployProperties::default()
        };

        let transports = NacosRegistry::card_transports(&card, &deploy).unwrap();

        assert_eq!(transports.len(), 2);
        assert_eq!(transports[0].host.as_deref(), Some("192.168.1.7"));
        assert_eq!(transports[0].port, Some(9000));
        assert_eq!(transports[0].path.as_deref(), Some("/api/a2a"));
        assert_eq!(transports[1].transport, "GRPC");
        assert!(transports[1].support_tls);
    }

    #[test]
    fn test_to_endpoint_defaults() {
        let mut props = A2aTransportProperties::new("JSONRPC");
        assert!(to_endpoint(&props, "1.0.0").is_none());

        props.host = Some("agent.local".to_string());
        props.support_tls = true;
        let endpoint = to_endpoint(&props, "1.0.0").unwrap();
        assert_eq!(endpoint.port, 443);
        assert_eq!(endpoint.path, "");
        assert_eq!(endpoint.version, "1.0.0");
    }

    #[tokio::test]
    async fn test_register_with_explicit_transports() {
        let server = MockServer::start().await;
        mount_card_release(&server).await;
        Mock::given(method("POST"))
            .and(path("/nacos/v2/ns/instance"))
            .and(body_string_contains("ip=10.0.0.9"))
            .and(body_string_contains("port=7000"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let registry = NacosRegistry::with_manager(manager(), Some(config_for(&server)));
        let mut transport = A2aTransportProperties::new("JSONRPC");
        transport.host = Some("10.0.0.9".to_string());
        transport.port = Some(7000);

        registry
            .register(&card(), &DeployProperties::default(), &[transport])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_falls_back_to_env_then_card() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nacos/v3/admin/ai/a2a"))
            .respond_with(ok())
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/nacos/v2/ns/instance"))
            .and(body_string_contains("ip=10.0.0.2"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/nacos/v2/ns/instance"))
            .and(body_string_contains("ip=10.0.0.1"))
            .and(body_string_contains("port=8000"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let manager = manager();

        let mut env = A2aTransportProperties::new("JSONRPC");
        env.host = Some("10.0.0.2".to_string());
        let from_env = NacosRegistry::with_manager(Arc::clone(&manager), Some(config.clone()))
            .env_transports(vec![env]);
        from_env
            .register(&card(), &DeployProperties::default(), &[])
            .await
            .unwrap();

        let from_card = NacosRegistry::with_manager(manager, Some(config));
        from_card
            .register(&card(), &DeployProperties::default(), &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_release_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nacos/v3/admin/ai/a2a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 22000, "message": "denied"})))
            .mount(&server)
            .await;

        let registry = NacosRegistry::with_manager(manager(), Some(config_for(&server)));
        let err = registry
            .register(&card(), &DeployProperties::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Nacos(_)));
    }

    #[tokio::test]
    async fn test_missing_default_config_is_reported() {
        let registry = NacosRegistry::with_manager(manager(), None);
        let err = registry
            .register(&card(), &DeployProperties::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Pool(_)));
    }
}

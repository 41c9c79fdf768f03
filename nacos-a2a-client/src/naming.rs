//! Naming service: instance registration and discovery.

use async_trait::async_trait;
use nacos_a2a_core::ConnectionConfig;
use nacos_a2a_pool::{BoxError, Closeable};
use parking_lot::Mutex;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{NacosError, NacosResult};
use crate::http::NacosHttpClient;

/// Default group of a Nacos service.
pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";

/// Default cluster of an instance.
pub const DEFAULT_CLUSTER: &str = "DEFAULT";

const INSTANCE_PATH: &str = "v2/ns/instance";
const INSTANCE_LIST_PATH: &str = "v2/ns/instance/list";

/// A service instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance IP or host name.
    pub ip: String,
    /// Instance port.
    pub port: u16,
    /// Load-balancing weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Whether the instance accepts traffic.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the instance is healthy.
    #[serde(default = "default_true")]
    pub healthy: bool,
    /// Ephemeral instances expire without heartbeats.
    #[serde(default)]
    pub ephemeral: bool,
    /// Cluster name.
    #[serde(default = "default_cluster")]
    pub cluster_name: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_cluster() -> String {
    DEFAULT_CLUSTER.to_string()
}

impl Instance {
    /// Create a persistent instance with default weight and cluster.
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            weight: default_weight(),
            enabled: true,
            healthy: true,
            ephemeral: false,
            cluster_name: default_cluster(),
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct InstanceList {
    #[serde(default)]
    hosts: Vec<Instance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstanceKey {
    service: String,
    group: String,
    ip: String,
    port: u16,
    cluster: String,
}

/// Client for the Nacos naming API.
///
/// Instances registered through a `NamingService` are deregistered when it
/// is closed.
#[derive(Debug)]
pub struct NamingService {
    client: Arc<NacosHttpClient>,
    registered: Mutex<HashMap<InstanceKey, Instance>>,
    closed: AtomicBool,
}

impl NamingService {
    /// Connect a naming service for `config`.
    pub async fn connect(config: &ConnectionConfig) -> NacosResult<Self> {
        let client = NacosHttpClient::connect(config).await?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Build a naming service over an existing transport.
    pub fn with_client(client: Arc<NacosHttpClient>) -> Self {
        Self {
            client,
            registered: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> NacosResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NacosError::Closed);
        }
        Ok(())
    }

    fn instance_params(&self, service: &str, group: &str, instance: &Instance) -> Vec<(&'static str, String)> {
        vec![
            ("namespaceId", self.client.namespace().to_string()),
            ("serviceName", service.to_string()),
            ("groupName", group.to_string()),
            ("ip", instance.ip.clone()),
            ("port", instance.port.to_string()),
            ("clusterName", instance.cluster_name.clone()),
            ("ephemeral", instance.ephemeral.to_string()),
        ]
    }

    /// Register `instance` under `service` in `group`.
    pub async fn register_instance(
        &self,
        service: &str,
        group: &str,
        instance: Instance,
    ) -> NacosResult<()> {
        self.ensure_open()?;

        let mut params = self.instance_params(service, group, &instance);
        params.push(("weight", instance.weight.to_string()));
        params.push(("enabled", instance.enabled.to_string()));
        params.push(("healthy", instance.healthy.to_string()));
        params.push(("metadata", serde_json::to_string(&instance.metadata)?));

        self.client
            .request::<serde_json::Value>(Method::POST, INSTANCE_PATH, &params)
            .await?;

        info!(service = %service, group = %group, ip = %instance.ip, port = instance.port, "Registered instance");
        let key = InstanceKey {
            service: service.to_string(),
            group: group.to_string(),
            ip: instance.ip.clone(),
            port: instance.port,
            cluster: instance.cluster_name.clone(),
        };
        self.registered.lock().insert(key, instance);
        Ok(())
    }

    /// Remove `instance` from `service` in `group`.
    pub async fn deregister_instance(
        &self,
        service: &str,
        group: &str,
        instance: &Instance,
    ) -> NacosResult<()> {
        self.ensure_open()?;
        self.deregister_unchecked(service, group, instance).await?;
        self.registered.lock().remove(&InstanceKey {
            service: service.to_string(),
            group: group.to_string(),
            ip: instance.ip.clone(),
            port: instance.port,
            cluster: instance.cluster_name.clone(),
        });
        Ok(())
    }

    async fn deregister_unchecked(
        &self,
        service: &str,
        group: &str,
        instance: &Instance,
    ) -> NacosResult<()> {
        let params = self.instance_params(service, group, instance);
        self.client
            .request::<serde_json::Value>(Method::DELETE, INSTANCE_PATH, &params)
            .await?;
        info!(service = %service, group = %group, ip = %instance.ip, port = instance.port, "Deregistered instance");
        Ok(())
    }

    /// List instances of `service` in `group`.
    pub async fn list_instances(
        &self,
        service: &str,
        group: &str,
        healthy_only: bool,
    ) -> NacosResult<Vec<Instance>> {
        self.ensure_open()?;

        let params = [
            ("namespaceId", self.client.namespace().to_string()),
            ("serviceName", service.to_string()),
            ("groupName", group.to_string()),
            ("healthyOnly", healthy_only.to_string()),
        ];
        let list: Option<InstanceList> = self
            .client
            .request(Method::GET, INSTANCE_LIST_PATH, &params)
            .await?;
        Ok(list.map(|l| l.hosts).unwrap_or_default())
    }

    /// Number of instances registered through this service and not yet removed.
    pub fn registered_count(&self) -> usize {
        self.registered.lock().len()
    }
}

#[async_trait]
impl Closeable for NamingService {
    async fn close(&self) -> Result<(), BoxError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let registered: Vec<(InstanceKey, Instance)> = self.registered.lock().drain().collect();
        let mut failures = 0;
        for (key, instance) in registered {
            if let Err(e) = self.deregister_unchecked(&key.service, &key.group, &instance).await {
                warn!(service = %key.service, error = %e, "Failed to deregister instance on close");
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(format!("{} instance(s) could not be deregistered", failures).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn naming_for(server: &MockServer) -> NamingService {
        let config = ConnectionConfig::builder()
            .server_address(server.address().to_string())
            .namespace_id("public")
            .build()
            .unwrap();
        NamingService::connect(&config).await.unwrap()
    }

    fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"code": 0, "message": "success", "data": "ok"}))
    }

    #[tokio::test]
    async fn test_register_and_close_deregisters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nacos/v2/ns/instance"))
            .and(body_string_contains("serviceName=agent"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/nacos/v2/ns/instance"))
            .and(query_param("serviceName", "agent"))
            .and(query_param("port", "8080"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let naming = naming_for(&server).await;
        naming
            .register_instance("agent", DEFAULT_GROUP, Instance::new("10.0.0.1", 8080))
            .await
            .unwrap();
        assert_eq!(naming.registered_count(), 1);

        naming.close().await.unwrap();
        assert_eq!(naming.registered_count(), 0);
        assert!(matches!(
            naming.list_instances("agent", DEFAULT_GROUP, false).await,
            Err(NacosError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_list_instances() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nacos/v2/ns/instance/list"))
            .and(query_param("serviceName", "agent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"hosts": [{"ip": "10.0.0.1", "port": 8080, "metadata": {"transport": "JSONRPC"}}]}
            })))
            .mount(&server)
            .await;

        let naming = naming_for(&server).await;
        let instances = naming.list_instances("agent", DEFAULT_GROUP, true).await.unwrap();

        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].ip, "10.0.0.1");
        assert_eq!(instances[0].cluster_name, "DEFAULT");
        assert_eq!(instances[0].metadata.get("transport").map(String::as_str), Some("JSONRPC"));
    }

    #[tokio::test]
    async fn test_close_reports_failed_deregistration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nacos/v2/ns/instance"))
            .respond_with(ok())
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/nacos/v2/ns/instance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 21000, "message": "denied"})))
            .mount(&server)
            .await;

        let naming = naming_for(&server).await;
        naming
            .register_instance("agent", DEFAULT_GROUP, Instance::new("10.0.0.1", 8080))
            .await
            .unwrap();

        assert!(naming.close().await.is_err());
        // Second close is a no-op.
        assert!(naming.close().await.is_ok());
    }
}

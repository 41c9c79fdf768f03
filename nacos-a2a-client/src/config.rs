//! Config service: read and publish configuration entries.

use async_trait::async_trait;
use nacos_a2a_core::ConnectionConfig;
use nacos_a2a_pool::{BoxError, Closeable};
use reqwest::Method;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::error::{NacosError, NacosResult};
use crate::http::NacosHttpClient;

const CONFIG_PATH: &str = "v2/cs/config";

/// Result code Nacos uses for a missing config entry.
const CONFIG_NOT_FOUND: i64 = 20004;

/// Client for the Nacos configuration API.
#[derive(Debug)]
pub struct ConfigService {
    client: Arc<NacosHttpClient>,
    closed: AtomicBool,
}

impl ConfigService {
    /// Connect a config service for `config`.
    pub async fn connect(config: &ConnectionConfig) -> NacosResult<Self> {
        let client = NacosHttpClient::connect(config).await?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Build a config service over an existing transport.
    pub fn with_client(client: Arc<NacosHttpClient>) -> Self {
        Self {
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

    fn params(&self, data_id: &str, group: &str) -> Vec<(&'static str, String)> {
        vec![
            ("namespaceId", self.client.namespace().to_string()),
            ("dataId", data_id.to_string()),
            ("group", group.to_string()),
        ]
    }

    /// Fetch a config entry; `None` when it does not exist.
    pub async fn get_config(&self, data_id: &str, group: &str) -> NacosResult<Option<String>> {
        self.ensure_open()?;
        match self
            .client
            .request::<String>(Method::GET, CONFIG_PATH, &self.params(data_id, group))
            .await
        {
            Ok(content) => Ok(content),
            Err(NacosError::Api { code, .. }) if code == CONFIG_NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or replace a config entry.
    pub async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
        config_type: Option<&str>,
    ) -> NacosResult<bool> {
        self.ensure_open()?;
        let mut params = self.params(data_id, group);
        params.push(("content", content.to_string()));
        if let Some(config_type) = config_type {
            params.push(("type", config_type.to_string()));
        }

        let published: Option<bool> = self.client.request(Method::POST, CONFIG_PATH, &params).await?;
        info!(data_id = %data_id, group = %group, "Published config");
        Ok(published.unwrap_or(false))
    }

    /// Delete a config entry.
    pub async fn remove_config(&self, data_id: &str, group: &str) -> NacosResult<bool> {
        self.ensure_open()?;
        let removed: Option<bool> = self
            .client
            .request(Method::DELETE, CONFIG_PATH, &self.params(data_id, group))
            .await?;
        Ok(removed.unwrap_or(false))
    }
}

#[async_trait]
impl Closeable for ConfigService {
    async fn close(&self) -> Result<(), BoxError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::DEFAULT_GROUP;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_for(server: &MockServer) -> ConfigService {
        let config = ConnectionConfig::builder()
            .server_address(server.address().to_string())
            .namespace_id("dev")
            .build()
            .unwrap();
        ConfigService::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_config() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nacos/v2/cs/config"))
            .and(query_param("namespaceId", "dev"))
            .and(query_param("dataId", "agent.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": "name: friday"})))
            .mount(&server)
            .await;

        let service = service_for(&server).await;
        let content = service.get_config("agent.yaml", DEFAULT_GROUP).await.unwrap();
        assert_eq!(content.as_deref(), Some("name: friday"));
    }

    #[tokio::test]
    async fn test_missing_config_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nacos/v2/cs/config"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 20004, "message": "config data not exist"})),
            )
            .mount(&server)
            .await;

        let service = service_for(&server).await;
        assert_eq!(service.get_config("missing", DEFAULT_GROUP).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_publish_and_close() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nacos/v2/cs/config"))
            .and(body_string_contains("type=yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": true})))
            .mount(&server)
            .await;

        let service = service_for(&server).await;
        assert!(service
            .publish_config("agent.yaml", DEFAULT_GROUP, "name: friday", Some("yaml"))
            .await
            .unwrap());

        service.close().await.unwrap();
        assert!(matches!(
            service.get_config("agent.yaml", DEFAULT_GROUP).await,
            Err(NacosError::Closed)
        ));
    }
}

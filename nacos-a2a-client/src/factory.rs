//! Pooled Nacos services and the process-wide manager.
//!
//! ```rust,ignore
//! use nacos_a2a_client::{global_manager, NacosServices};
//!
//! // Default config, derived from NACOS_* environment variables.
//! let ai = global_manager().get_ai_service(None).await?;
//!
//! // Explicit config; identical configs share one connection.
//! let naming = global_manager().get_naming_service(Some(&config)).await?;
//!
//! global_manager().cleanup().await;
//! ```

use async_trait::async_trait;
use nacos_a2a_core::ConnectionConfig;
use nacos_a2a_pool::{
    BoxError, Closeable, PoolError, PoolResult, ServiceFactory, ServiceKind, ServiceManager,
};
use std::sync::{Arc, OnceLock};

use crate::ai::AiService;
use crate::config::ConfigService;
use crate::error::NacosError;
use crate::naming::NamingService;

/// A pooled Nacos sub-service.
#[derive(Debug, Clone)]
pub enum NacosService {
    /// Naming service.
    Naming(Arc<NamingService>),
    /// Config service.
    Config(Arc<ConfigService>),
    /// AI (A2A registry) service.
    Ai(Arc<AiService>),
}

impl NacosService {
    /// The kind of this service.
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::Naming(_) => ServiceKind::NAMING,
            Self::Config(_) => ServiceKind::CONFIG,
            Self::Ai(_) => ServiceKind::AI,
        }
    }
}

#[async_trait]
impl Closeable for NacosService {
    async fn close(&self) -> Result<(), BoxError> {
        match self {
            Self::Naming(service) => service.close().await,
            Self::Config(service) => service.close().await,
            Self::Ai(service) => service.close().await,
        }
    }
}

/// Builds Nacos sub-services over the open API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NacosServiceFactory;

#[async_trait]
impl ServiceFactory for NacosServiceFactory {
    type Service = NacosService;

    async fn create(&self, kind: &ServiceKind, config: &ConnectionConfig) -> PoolResult<NacosService> {
        let wrap = |e: NacosError| PoolError::creation(kind, config, e);
        if *kind == ServiceKind::NAMING {
            let service = NamingService::connect(config).await.map_err(wrap)?;
            Ok(NacosService::Naming(Arc::new(service)))
        } else if *kind == ServiceKind::CONFIG {
            let service = ConfigService::connect(config).await.map_err(wrap)?;
            Ok(NacosService::Config(Arc::new(service)))
        } else if *kind == ServiceKind::AI {
            let service = AiService::connect(config).await.map_err(wrap)?;
            Ok(NacosService::Ai(Arc::new(service)))
        } else {
            Err(PoolError::UnsupportedKind(kind.clone()))
        }
    }
}

/// Pool of Nacos sub-services.
pub type NacosServiceManager = ServiceManager<NacosServiceFactory>;

static GLOBAL_MANAGER: OnceLock<Arc<NacosServiceManager>> = OnceLock::new();

/// Get the process-wide manager, creating it on first use.
pub fn global_manager() -> Arc<NacosServiceManager> {
    Arc::clone(GLOBAL_MANAGER.get_or_init(|| Arc::new(NacosServiceManager::new(NacosServiceFactory))))
}

/// Whether the process-wide manager has been created.
pub fn is_initialized() -> bool {
    GLOBAL_MANAGER.get().is_some()
}

/// Typed accessors for the Nacos sub-services of a pool.
#[async_trait]
pub trait NacosServices {
    /// Get the naming service for `config` (or the default config).
    async fn get_naming_service(
        &self,
        config: Option<&ConnectionConfig>,
    ) -> PoolResult<Arc<NamingService>>;

    /// Get the config service for `config` (or the default config).
    async fn get_config_service(
        &self,
        config: Option<&ConnectionConfig>,
    ) -> PoolResult<Arc<ConfigService>>;

    /// Get the AI service for `config` (or the default config).
    async fn get_ai_service(&self, config: Option<&ConnectionConfig>) -> PoolResult<Arc<AiService>>;
}

#[async_trait]
impl NacosServices for NacosServiceManager {
    async fn get_naming_service(
        &self,
        config: Option<&ConnectionConfig>,
    ) -> PoolResult<Arc<NamingService>> {
        match &*self.get_service(&ServiceKind::NAMING, config).await? {
            NacosService::Naming(service) => Ok(Arc::clone(service)),
            other => Err(PoolError::UnsupportedKind(other.kind())),
        }
    }

    async fn get_config_service(
        &self,
        config: Option<&ConnectionConfig>,
    ) -> PoolResult<Arc<ConfigService>> {
        match &*self.get_service(&ServiceKind::CONFIG, config).await? {
            NacosService::Config(service) => Ok(Arc::clone(service)),
            other => Err(PoolError::UnsupportedKind(other.kind())),
        }
    }

    async fn get_ai_service(&self, config: Option<&ConnectionConfig>) -> PoolResult<Arc<AiService>> {
        match &*self.get_service(&ServiceKind::AI, config).await? {
            NacosService::Ai(service) => Ok(Arc::clone(service)),
            other => Err(PoolError::UnsupportedKind(other.kind())),
        }
    }
}

/// Get a naming service from the process-wide manager.
pub async fn get_nacos_naming_service(
    config: Option<&ConnectionConfig>,
) -> PoolResult<Arc<NamingService>> {
    global_manager().get_naming_service(config).await
}

/// Get a config service from the process-wide manager.
pub async fn get_nacos_config_service(
    config: Option<&ConnectionConfig>,
) -> PoolResult<Arc<ConfigService>> {
    global_manager().get_config_service(config).await
}

/// Get an AI service from the process-wide manager.
pub async fn get_nacos_ai_service(config: Option<&ConnectionConfig>) -> PoolResult<Arc<AiService>> {
    global_manager().get_ai_service(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacos_a2a_core::ConfigError;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn isolated_manager() -> NacosServiceManager {
        NacosServiceManager::with_env_loader(
            NacosServiceFactory,
            Box::new(|| Err(ConfigError::missing("NACOS_SERVER_ADDR", "set it"))),
        )
    }

    #[test]
    fn test_global_manager_is_shared() {
        let a = global_manager();
        let b = global_manager();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(is_initialized());
    }

    #[test]
    fn test_global_manager_concurrent_first_access() {
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    global_manager()
                })
            })
            .collect();

        let managers: Vec<Arc<NacosServiceManager>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for manager in &managers[1..] {
            assert!(Arc::ptr_eq(&managers[0], manager));
        }
        assert!(Arc::ptr_eq(&managers[0], &global_manager()));
    }

    #[tokio::test]
    async fn test_typed_getters_reuse_connections() {
        let server = MockServer::start().await;
        let config = ConnectionConfig::builder()
            .server_address(server.address().to_string())
            .build()
            .unwrap();
        let manager = isolated_manager();

        let naming = manager.get_naming_service(Some(&config)).await.unwrap();
        let again = manager.get_naming_service(Some(&config)).await.unwrap();
        let ai = manager.get_ai_service(Some(&config)).await.unwrap();
        let cfg = manager.get_config_service(Some(&config)).await.unwrap();

        assert!(Arc::ptr_eq(&naming, &again));
        drop((ai, cfg));
        let stats = manager.get_stats();
        assert_eq!(stats.identity_count, 1);
        assert_eq!(stats.total_handle_count, 3);

        let report = manager.cleanup().await;
        assert_eq!(report.closed, 3);
        assert_eq!(manager.get_stats().identity_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_rejected() {
        let manager = isolated_manager();
        let config = ConnectionConfig::builder().server_address("h1:8848").build().unwrap();

        let err = manager
            .get_service(&ServiceKind::new("lock"), Some(&config))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::UnsupportedKind(_)));
    }

    #[tokio::test]
    async fn test_connect_failure_is_creation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nacos/v1/auth/login"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "denied"})))
            .mount(&server)
            .await;
        let config = ConnectionConfig::builder()
            .server_address(server.address().to_string())
            .basic_auth("nacos", "bad")
            .build()
            .unwrap();
        let manager = isolated_manager();

        let err = manager.get_naming_service(Some(&config)).await.unwrap_err();
        assert!(matches!(err, PoolError::Creation { .. }));
        assert_eq!(manager.get_stats().total_handle_count, 0);
    }

    #[tokio::test]
    async fn test_missing_default_config() {
        let manager = isolated_manager();
        let err = manager.get_ai_service(None).await.unwrap_err();
        assert!(matches!(err, PoolError::Configuration(_)));
    }
}

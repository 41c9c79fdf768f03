//! # nacos-a2a-client
//!
//! Nacos naming, config and AI sub-services over the Nacos open API, pooled
//! per connection configuration.
//!
//! ## Example
//!
//! ```rust,ignore
//! use nacos_a2a_client::prelude::*;
//! use nacos_a2a_core::ConnectionConfig;
//!
//! let config = ConnectionConfig::builder()
//!     .server_address("127.0.0.1:8848")
//!     .basic_auth("nacos", "nacos")
//!     .build()?;
//!
//! let ai = global_manager().get_ai_service(Some(&config)).await?;
//! let card = ai.get_agent_card("friday", None).await?;
//! ```

pub mod ai;
pub mod config;
pub mod error;
pub mod factory;
pub mod http;
pub mod naming;

pub use ai::{AgentEndpoint, AiService, AGENT_ENDPOINT_GROUP, REGISTRATION_TYPE_SERVICE, REGISTRATION_TYPE_URL};
pub use config::ConfigService;
pub use error::{NacosError, NacosResult};
pub use factory::{
    get_nacos_ai_service, get_nacos_config_service, get_nacos_naming_service, global_manager,
    is_initialized, NacosService, NacosServiceFactory, NacosServiceManager, NacosServices,
};
pub use http::NacosHttpClient;
pub use naming::{Instance, NamingService, DEFAULT_CLUSTER, DEFAULT_GROUP};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        global_manager, AgentEndpoint, AiService, ConfigService, NacosError, NacosResult,
        NacosServiceManager, NacosServices, NamingService,
    };
    pub use nacos_a2a_pool::Closeable;
}

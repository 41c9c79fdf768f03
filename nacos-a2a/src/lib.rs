//! # nacos-a2a
//!
//! Publish Agent-to-Agent (A2A) agents to Nacos and serve them over JSON-RPC.
//!
//! ## Features
//!
//! - Agent cards built from a small adapter configuration
//! - `message/send`, `tasks/get` and `tasks/cancel` over JSON-RPC
//! - Registration with any number of [`A2aRegistry`] backends, Nacos included
//! - Agent card resolution for clients
//!
//! ## Example
//!
//! ```rust,ignore
//! use nacos_a2a::prelude::*;
//! use std::sync::Arc;
//!
//! let adapter = A2aProtocolAdapter::new("friday", "A helpful assistant")
//!     .card_url("http://10.0.0.1:8000/a2a")
//!     .skill(AgentSkill::new("chat", "Chat").tag("general"))
//!     .registry(create_registry_from_env());
//!
//! let executor = Arc::new(executor_fn(|ctx| async move {
//!     Ok(Message::agent(format!("echo: {}", ctx.message.text_content())))
//! }));
//!
//! let app = adapter.mount(axum::Router::new(), executor, "", Default::default()).await;
//! nacos_a2a::server::serve(app, ([0, 0, 0, 0], 8000)).await?;
//! ```

pub mod adapter;
pub mod error;
pub mod executor;
pub mod jsonrpc;
pub mod nacos;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod settings;
pub mod store;
pub mod task;
pub mod telemetry;

#[cfg(feature = "server")]
pub mod server;

pub use adapter::{
    A2aProtocolAdapter, ProviderSpec, RegistrationReport, DEFAULT_BASE_URL, DEFAULT_JSON_RPC_PATH,
    DEFAULT_TRANSPORT, DEFAULT_WELLKNOWN_PATH,
};
pub use error::{RegistryError, ResolveError};
pub use executor::{executor_fn, AgentExecutor, ExecutorError, FnExecutor, RequestContext};
pub use jsonrpc::{
    error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, MessageSendParams, RequestHandler,
    TaskIdParams, TaskQueryParams,
};
pub use nacos::NacosRegistry;
pub use registry::{A2aRegistry, A2aTransportProperties, DeployProperties, Registries};
pub use resolver::{
    AgentCardResolver, FixedAgentCardResolver, NacosAgentCardResolver, WellKnownAgentCardResolver,
};
pub use schema::*;
pub use settings::{create_registries, create_registry_from_env, A2aRegistrySettings};
pub use store::{InMemoryTaskStore, StoreError, TaskStore};
pub use task::{Task, TaskId, TaskState, TaskStatus};
pub use telemetry::init_tracing;

// Re-export for convenience
pub use nacos_a2a_client::{global_manager, NacosServiceManager};
pub use nacos_a2a_core::ConnectionConfig;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        create_registry_from_env, executor_fn, A2aProtocolAdapter, A2aRegistry, AgentCard,
        AgentCardResolver, AgentExecutor, AgentSkill, ConnectionConfig, ExecutorError, Message,
        NacosRegistry, Part, Registries, RequestContext, Task, TaskState,
    };
}

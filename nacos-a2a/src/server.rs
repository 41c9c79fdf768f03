//! HTTP routes for the A2A protocol.
//!
//! Only available with the `server` feature.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::adapter::A2aProtocolAdapter;
use crate::executor::AgentExecutor;
use crate::jsonrpc::{JsonRpcResponse, RequestHandler};
use crate::schema::AgentCard;

/// Shared state for the A2A handlers.
#[derive(Debug)]
pub struct A2aState {
    /// Card served at the well-known path.
    pub agent_card: AgentCard,
    /// JSON-RPC dispatcher.
    pub handler: RequestHandler,
}

/// Server error types.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),
    #[error("Server error: {0}")]
    Serve(String),
}

impl A2aProtocolAdapter {
    /// Routes serving the card and the JSON-RPC endpoint, without registering.
    pub fn routes(&self, executor: Arc<dyn AgentExecutor>) -> Router {
        let handler = RequestHandler::new(executor).with_task_timeout(self.task_timeout);
        self.routes_with_handler(self.agent_card(), handler)
    }

    fn routes_with_handler(&self, agent_card: AgentCard, handler: RequestHandler) -> Router {
        let state = Arc::new(A2aState { agent_card, handler });

        Router::new()
            .route(&self.wellknown_path, get(get_agent_card))
            .route(&self.json_rpc_path, post(handle_json_rpc))
            .with_state(state)
    }

    /// Add the A2A routes to `router` and publish the agent to its registries.
    ///
    /// `root_path` is the path the application is served under; `extra` is
    /// passed to registries as deployment properties. Registry failures are
    /// logged and never fail the mount.
    pub async fn mount(
        &self,
        router: Router,
        executor: Arc<dyn AgentExecutor>,
        root_path: &str,
        extra: Map<String, Value>,
    ) -> Router {
        let card = self.agent_card();
        let handler = RequestHandler::new(executor).with_task_timeout(self.task_timeout);
        let routes = self.routes_with_handler(card.clone(), handler);

        if !self.registries().is_empty() {
            let deploy = self.deploy_properties(root_path, extra);
            self.register_with_all_registries(&card, &deploy).await;
        }

        router.merge(routes)
    }
}

/// Serve `router` on `addr` until the server stops.
pub async fn serve(router: Router, addr: impl Into<SocketAddr>) -> Result<(), ServerError> {
    let addr = addr.into();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(e.to_string()))?;

    info!(addr = %addr, "A2A server listening");
    axum::serve(listener, router)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

    Ok(())
}

/// GET well-known path - Get agent card
async fn get_agent_card(State(state): State<Arc<A2aState>>) -> Json<AgentCard> {
    Json(state.agent_card.clone())
}

/// POST JSON-RPC path - Dispatch a request
async fn handle_json_rpc(State(state): State<Arc<A2aState>>, body: String) -> Json<JsonRpcResponse> {
    Json(state.handler.handle_body(&body).await)
}

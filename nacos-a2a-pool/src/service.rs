//! Capabilities required from pooled sub-services and their factories.

use async_trait::async_trait;
use nacos_a2a_core::ConnectionConfig;

use crate::error::{BoxError, PoolResult};
use crate::kind::ServiceKind;

/// A pooled sub-service that can release its connection.
///
/// Every service type stored in a pool must implement this, so that
/// [`ServiceManager::cleanup`](crate::ServiceManager::cleanup) can shut it down.
#[async_trait]
pub trait Closeable: Send + Sync {
    /// Close the underlying connection.
    async fn close(&self) -> Result<(), BoxError>;
}

/// Builds sub-services for a given configuration.
///
/// `create` is the only step that touches the network. The pool guarantees
/// it runs at most once per (identity, kind) as long as it succeeds.
#[async_trait]
pub trait ServiceFactory: Send + Sync + 'static {
    /// The pooled service handle type.
    type Service: Closeable + 'static;

    /// Construct a service of `kind` connected according to `config`.
    async fn create(&self, kind: &ServiceKind, config: &ConnectionConfig)
        -> PoolResult<Self::Service>;
}

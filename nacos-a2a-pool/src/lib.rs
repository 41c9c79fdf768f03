//! # nacos-a2a-pool
//!
//! Connection pooling for families of remote sub-services that share a
//! connection configuration.
//!
//! Given a [`ConnectionConfig`](nacos_a2a_core::ConnectionConfig) and a
//! [`ServiceKind`], a [`ServiceManager`] returns a shared handle to the
//! corresponding sub-service, constructing it at most once per configuration
//! identity. Concurrent callers for the same identity wait on a per-identity
//! lock; unrelated identities never wait on each other.
//!
//! ## Features
//!
//! - Identity-based deduplication (server order and secrets do not matter)
//! - Lazy, double-checked construction per (identity, kind)
//! - Default configuration: manual, or derived from the environment
//! - Statistics and best-effort cleanup through the [`Closeable`] capability

pub mod error;
pub mod global;
pub mod kind;
pub mod manager;
pub mod service;
pub mod stats;

pub use error::{BoxError, PoolError, PoolResult};
pub use global::{EnvLoader, GlobalConfig};
pub use kind::ServiceKind;
pub use manager::ServiceManager;
pub use service::{Closeable, ServiceFactory};
pub use stats::{CleanupReport, GroupStats, PoolStats};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Closeable, PoolError, PoolResult, PoolStats, ServiceFactory, ServiceKind, ServiceManager,
    };
}

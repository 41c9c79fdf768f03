//! # nacos-a2a-core
//!
//! Connection configuration, identity derivation and error types shared by
//! the nacos-a2a crates.
//!
//! ## Example
//!
//! ```rust
//! use nacos_a2a_core::ConnectionConfig;
//!
//! let a = ConnectionConfig::builder()
//!     .server_address("h1:8848,h2:8848")
//!     .namespace_id("public")
//!     .basic_auth("nacos", "secret-a")
//!     .build()
//!     .unwrap();
//! let b = ConnectionConfig::builder()
//!     .server_address("h2:8848,h1:8848")
//!     .namespace_id("public")
//!     .basic_auth("nacos", "secret-b")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(a.identity(), b.identity());
//! ```

pub mod config;
pub mod env;
pub mod errors;
pub mod identity;

pub use config::{ConnectionConfig, ConnectionConfigBuilder, Credentials};
pub use errors::{ConfigError, Result};
pub use identity::ConfigIdentity;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{ConfigError, ConfigIdentity, ConnectionConfig, Credentials};
}

//! Loading a [`ConnectionConfig`] from environment variables.
//!
//! | variable | meaning |
//! |---|---|
//! | `NACOS_SERVER_ADDR` / `NACOS_SERVER_ADDRESS` | server address list (required) |
//! | `NACOS_NAMESPACE_ID` | namespace, default `public` |
//! | `NACOS_ACCESS_KEY` + `NACOS_SECRET_KEY` | MSE authentication (takes priority) |
//! | `NACOS_USERNAME` / `NACOS_PASSWORD` | basic authentication, default `nacos`/`nacos` |
//! | `NACOS_LOG_LEVEL` | client log level, default `INFO` |
//!
//! A `.env` file (or `.env.example` as a fallback) is consulted once per
//! process and never overrides variables that are already set.

use std::path::Path;
use std::sync::Once;

use crate::config::{ConnectionConfig, DEFAULT_LOG_LEVEL, DEFAULT_NAMESPACE};
use crate::errors::{ConfigError, Result};

/// Server address list.
pub const NACOS_SERVER_ADDR: &str = "NACOS_SERVER_ADDR";
/// Alternate spelling of [`NACOS_SERVER_ADDR`].
pub const NACOS_SERVER_ADDRESS: &str = "NACOS_SERVER_ADDRESS";
/// Namespace identifier.
pub const NACOS_NAMESPACE_ID: &str = "NACOS_NAMESPACE_ID";
/// MSE access key.
pub const NACOS_ACCESS_KEY: &str = "NACOS_ACCESS_KEY";
/// MSE secret key.
pub const NACOS_SECRET_KEY: &str = "NACOS_SECRET_KEY";
/// Basic auth username.
pub const NACOS_USERNAME: &str = "NACOS_USERNAME";
/// Basic auth password.
pub const NACOS_PASSWORD: &str = "NACOS_PASSWORD";
/// Client log level.
pub const NACOS_LOG_LEVEL: &str = "NACOS_LOG_LEVEL";

const DEFAULT_BASIC_CREDENTIAL: &str = "nacos";

static DOTENV: Once = Once::new();

/// Load `.env` (or `.env.example`) into the process environment, once.
pub fn load_dotenv() {
    DOTENV.call_once(|| match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(_) => {
            let fallback = Path::new(".env.example");
            if fallback.exists() && dotenvy::from_path(fallback).is_ok() {
                tracing::debug!("Loaded .env.example file");
            }
        }
    });
}

/// Read an environment variable, treating empty values as absent.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl ConnectionConfig {
    /// Load a configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_lookup(env_var)
    }

    /// Load a configuration through an arbitrary variable lookup.
    ///
    /// Empty values returned by `lookup` are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let server_address = get(NACOS_SERVER_ADDR)
            .or_else(|| get(NACOS_SERVER_ADDRESS))
            .ok_or_else(|| {
                ConfigError::missing(
                    NACOS_SERVER_ADDR,
                    "Please set it to your Nacos server address, e.g. 'localhost:8848'",
                )
            })?;
        let namespace = get(NACOS_NAMESPACE_ID).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let log_level = get(NACOS_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let builder = ConnectionConfig::builder()
            .server_address(&server_address)
            .namespace_id(namespace)
            .log_level(log_level);

        let builder = match (get(NACOS_ACCESS_KEY), get(NACOS_SECRET_KEY)) {
            (Some(access_key), Some(secret_key)) => {
                tracing::info!(server = %server_address, "Loaded Nacos config from env (MSE auth)");
                builder.access_key(access_key, secret_key)
            }
            _ => {
                let username =
                    get(NACOS_USERNAME).unwrap_or_else(|| DEFAULT_BASIC_CREDENTIAL.to_string());
                let password =
                    get(NACOS_PASSWORD).unwrap_or_else(|| DEFAULT_BASIC_CREDENTIAL.to_string());
                tracing::info!(server = %server_address, "Loaded Nacos config from env (basic auth)");
                builder.basic_auth(username, password)
            }
        };

        builder.build()
    }
}

//! Default connection configuration used when callers do not pass one.
//!
//! ```text
//! Unset ──first resolve──▶ EnvDerived
//!   ▲                          │
//!   │ reset          set_manual│
//!   └──────── Manual ◀─────────┘
//! ```

use nacos_a2a_core::{ConfigError, ConnectionConfig};
use parking_lot::Mutex;
use tracing::{error, info};

/// Derives the default configuration when none was installed manually.
pub type EnvLoader = Box<dyn Fn() -> Result<ConnectionConfig, ConfigError> + Send + Sync>;

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Unset,
    Manual(ConnectionConfig),
    EnvDerived(ConnectionConfig),
}

/// Lazily resolved default configuration.
pub struct GlobalConfig {
    state: Mutex<State>,
    loader: EnvLoader,
}

impl GlobalConfig {
    /// Create an unset default that resolves through `loader`.
    pub fn new(loader: EnvLoader) -> Self {
        Self {
            state: Mutex::new(State::Unset),
            loader,
        }
    }

    /// Return the default configuration, deriving it from the environment on
    /// first need.
    ///
    /// A failed derivation leaves the state unset, so the next call retries.
    pub fn resolve(&self) -> Result<ConnectionConfig, ConfigError> {
        let mut state = self.state.lock();
        match &*state {
            State::Manual(config) | State::EnvDerived(config) => Ok(config.clone()),
            State::Unset => match (self.loader)() {
                Ok(config) => {
                    info!(
                        servers = %config.address_summary(),
                        namespace = %config.namespace(),
                        "Loaded global config from environment"
                    );
                    *state = State::EnvDerived(config.clone());
                    Ok(config)
                }
                Err(e) => {
                    error!(error = %e, "Failed to load global config from environment");
                    Err(e)
                }
            },
        }
    }

    /// Install a default, overriding any environment-derived one until reset.
    pub fn set_manual(&self, config: ConnectionConfig) {
        info!(
            servers = %config.address_summary(),
            namespace = %config.namespace(),
            "Global config set manually"
        );
        *self.state.lock() = State::Manual(config);
    }

    /// Forget any default; the next resolution derives from the environment.
    pub fn reset(&self) {
        *self.state.lock() = State::Unset;
        info!("Global config reset");
    }

    /// Whether the current default was installed manually.
    pub fn is_manual(&self) -> bool {
        matches!(*self.state.lock(), State::Manual(_))
    }
}

impl std::fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

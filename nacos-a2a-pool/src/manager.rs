//! The service manager: one pool of sub-services per configuration identity.
//!
//! Pool layout:
//!
//! ```text
//! identity_1 ─▶ ServiceGroup { config, naming, config, ai }
//! identity_2 ─▶ ServiceGroup { config, naming }
//! ```
//!
//! Creation of a group, and of each kind inside a group, is double-checked
//! under a per-identity async lock: check without the lock, take the lock,
//! check again, create. Handles are only published after construction has
//! finished, so later callers never observe a half-built service. Retrieval
//! of an existing handle takes no per-identity lock.
//!
//! # Cleanup caveat
//!
//! [`ServiceManager::cleanup`] assumes no `get_service` calls are in flight
//! for the identities being cleared. Drain in-flight work first when that
//! matters.

use nacos_a2a_core::{ConfigError, ConfigIdentity, ConnectionConfig};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::PoolResult;
use crate::global::{EnvLoader, GlobalConfig};
use crate::kind::ServiceKind;
use crate::service::{Closeable, ServiceFactory};
use crate::stats::{CleanupReport, GroupStats, PoolStats};

/// Sub-services sharing one configuration identity.
struct ServiceGroup<S> {
    config: ConnectionConfig,
    services: RwLock<HashMap<ServiceKind, Arc<S>>>,
}

impl<S> ServiceGroup<S> {
    fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            services: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, kind: &ServiceKind) -> Option<Arc<S>> {
        self.services.read().get(kind).cloned()
    }
}

/// Pool of lazily created sub-services, deduplicated by configuration identity.
///
/// # Example
///
/// ```rust,ignore
/// let manager = ServiceManager::new(MyFactory::default());
/// let naming = manager.get_service(&ServiceKind::NAMING, Some(&config)).await?;
/// let again = manager.get_service(&ServiceKind::NAMING, Some(&config)).await?;
/// assert!(Arc::ptr_eq(&naming, &again));
/// ```
pub struct ServiceManager<F: ServiceFactory> {
    factory: F,
    global: GlobalConfig,
    groups: RwLock<HashMap<ConfigIdentity, Arc<ServiceGroup<F::Service>>>>,
    locks: Mutex<HashMap<ConfigIdentity, Arc<AsyncMutex<()>>>>,
}

impl<F: ServiceFactory> ServiceManager<F> {
    /// Create a manager whose default config is derived from the process
    /// environment.
    pub fn new(factory: F) -> Self {
        Self::with_env_loader(factory, Box::new(ConnectionConfig::from_env))
    }

    /// Create a manager with a custom default-config loader.
    pub fn with_env_loader(factory: F, loader: EnvLoader) -> Self {
        info!("Service manager initialized");
        Self {
            factory,
            global: GlobalConfig::new(loader),
            groups: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The factory used to build services.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    // ==================== Default configuration ====================

    /// Install a default configuration, taking precedence over the environment.
    pub fn set_global_config(&self, config: ConnectionConfig) {
        self.global.set_manual(config);
    }

    /// Clear the default; the next resolution derives from the environment.
    pub fn reset_global_config(&self) {
        self.global.reset();
    }

    /// Resolve the default configuration.
    pub fn global_config(&self) -> Result<ConnectionConfig, ConfigError> {
        self.global.resolve()
    }

    // ==================== Service retrieval ====================

    /// Return the `kind` sub-service for `config`, or for the default
    /// configuration when `config` is `None`.
    ///
    /// Identical configurations share one instance per kind. A failed
    /// construction is returned to the caller and not cached.
    pub async fn get_service(
        &self,
        kind: &ServiceKind,
        config: Option<&ConnectionConfig>,
    ) -> PoolResult<Arc<F::Service>> {
        let config = match config {
            Some(config) => config.clone(),
            None => self.global.resolve()?,
        };
        let identity = config.identity();
        let group = self.group_for(&identity, config).await;

        if let Some(service) = group.get(kind) {
            return Ok(service);
        }

        let lock = self.lock_for(&identity);
        let _guard = lock.lock().await;
        if let Some(service) = group.get(kind) {
            return Ok(service);
        }

        info!(kind = %kind, identity = %identity, "Creating service");
        let service = Arc::new(self.factory.create(kind, &group.config).await?);
        group
            .services
            .write()
            .insert(kind.clone(), Arc::clone(&service));
        info!(kind = %kind, identity = %identity, "Service created");

        Ok(service)
    }

    async fn group_for(
        &self,
        identity: &ConfigIdentity,
        config: ConnectionConfig,
    ) -> Arc<ServiceGroup<F::Service>> {
        let existing = self.groups.read().get(identity).cloned();
        if let Some(group) = existing {
            return group;
        }

        let lock = self.lock_for(identity);
        let _guard = lock.lock().await;
        let mut groups = self.groups.write();
        let group = groups.entry(identity.clone()).or_insert_with(|| {
            info!(identity = %identity, "Created service group");
            Arc::new(ServiceGroup::new(config))
        });
        Arc::clone(group)
    }

    fn lock_for(&self, identity: &ConfigIdentity) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(identity.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    // ==================== Statistics and management ====================

    /// Snapshot of the pool. May be slightly stale under concurrent creation.
    pub fn get_stats(&self) -> PoolStats {
        let groups = self.groups.read();
        let mut per_identity: Vec<GroupStats> = groups
            .iter()
            .map(|(identity, group)| {
                let mut kinds_present: Vec<ServiceKind> =
                    group.services.read().keys().cloned().collect();
                kinds_present.sort();
                GroupStats {
                    identity: identity.clone(),
                    address_summary: group.config.address_summary(),
                    namespace: group.config.namespace().to_string(),
                    kinds_present,
                }
            })
            .collect();
        per_identity.sort_by(|a, b| a.identity.cmp(&b.identity));

        PoolStats {
            identity_count: per_identity.len(),
            total_handle_count: per_identity.iter().map(|g| g.kinds_present.len()).sum(),
            per_identity,
        }
    }

    /// Close every pooled service and empty the pool.
    ///
    /// Close failures are logged and counted; they never stop the sweep, and
    /// the pool is always emptied afterwards. See the module docs for the
    /// in-flight caveat.
    pub async fn cleanup(&self) -> CleanupReport {
        info!("Cleaning up service pool");

        let groups: Vec<(ConfigIdentity, Arc<ServiceGroup<F::Service>>)> = self
            .groups
            .read()
            .iter()
            .map(|(identity, group)| (identity.clone(), Arc::clone(group)))
            .collect();

        let mut report = CleanupReport::default();
        for (identity, group) in groups {
            let mut services: Vec<(ServiceKind, Arc<F::Service>)> = group
                .services
                .read()
                .iter()
                .map(|(kind, service)| (kind.clone(), Arc::clone(service)))
                .collect();
            services.sort_by(|a, b| a.0.cmp(&b.0));

            for (kind, service) in services {
                match service.close().await {
                    Ok(()) => {
                        debug!(kind = %kind, identity = %identity, "Closed service");
                        report.closed += 1;
                    }
                    Err(e) => {
                        warn!(
                            kind = %kind,
                            identity = %identity,
                            error = %e,
                            "Failed to close service"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        self.groups.write().clear();
        self.locks.lock().clear();

        info!(closed = report.closed, failed = report.failed, "Service pool cleaned up");
        report
    }
}

impl<F: ServiceFactory> std::fmt::Debug for ServiceManager<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceManager")
            .field("global", &self.global)
            .field("groups", &self.groups.read().len())
            .finish_non_exhaustive()
    }
}

//! Read-only pool snapshots.

use nacos_a2a_core::ConfigIdentity;
use serde::{Deserialize, Serialize};

use crate::kind::ServiceKind;

/// Snapshot of a pool's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of distinct configuration identities.
    pub identity_count: usize,
    /// Number of live sub-service handles across all identities.
    pub total_handle_count: usize,
    /// Per-identity details, sorted by identity.
    pub per_identity: Vec<GroupStats>,
}

/// Snapshot of one service group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    /// The group's identity.
    pub identity: ConfigIdentity,
    /// Server addresses or endpoint.
    pub address_summary: String,
    /// Namespace of the configuration.
    pub namespace: String,
    /// Kinds that have been created, sorted.
    pub kinds_present: Vec<ServiceKind>,
}

/// Outcome of [`ServiceManager::cleanup`](crate::ServiceManager::cleanup).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Handles closed successfully.
    pub closed: usize,
    /// Handles whose close call failed.
    pub failed: usize,
}

//! Sub-service kinds.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// The kind of sub-service requested from a pool.
///
/// The set of kinds is open; [`ServiceKind::NAMING`], [`ServiceKind::CONFIG`]
/// and [`ServiceKind::AI`] are the ones the Nacos factory knows about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceKind(Cow<'static, str>);

impl ServiceKind {
    /// Service discovery / instance registration.
    pub const NAMING: ServiceKind = ServiceKind(Cow::Borrowed("naming"));
    /// Configuration management.
    pub const CONFIG: ServiceKind = ServiceKind(Cow::Borrowed("config"));
    /// Agent registry (A2A cards and endpoints).
    pub const AI: ServiceKind = ServiceKind(Cow::Borrowed("ai"));

    /// Create a custom kind.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The kind's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ServiceKind {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

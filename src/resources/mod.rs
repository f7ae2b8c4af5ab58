//! Discovery of the resources a domain's settings apply to.
//!
//! Resources are enumerated fresh for every operation and never cached.
//! The store key (`handle`) of a resource depends on the domain, so it is
//! filled in by [`handle::HandleResolver`] after discovery.
pub mod adapters;
pub mod handle;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub use adapters::AdapterInventory;
pub use handle::{HandleResolver, HandleStrategy};

/// Link state of a discovered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Connected.
    Up,
    /// Present but not connected.
    Down,
    /// Not reported.
    Unknown,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A configurable entity, typically a network adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Stable device id.
    pub id: String,
    /// Interface GUID, when the OS reports one.
    pub guid: Option<String>,
    /// Human-readable connection name (`Ethernet`, `Wi-Fi`).
    pub name: String,
    /// Link state at discovery time.
    pub status: LinkStatus,
    /// Resolved store key; `None` until resolved or if nothing matched.
    pub handle: Option<String>,
}

impl Resource {
    /// A resource with no GUID, an unknown link, and no handle.
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            guid: None,
            name: name.to_string(),
            status: LinkStatus::Unknown,
            handle: None,
        }
    }

    /// Set the GUID.
    #[must_use]
    pub fn with_guid(mut self, guid: &str) -> Self {
        self.guid = Some(guid.to_string());
        self
    }

    /// Set the link status.
    #[must_use]
    pub const fn with_status(mut self, status: LinkStatus) -> Self {
        self.status = status;
        self
    }
}

/// Where a group of settings lives in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// A single machine-wide key.
    Machine {
        /// Store key.
        key: String,
    },
    /// A per-resource key.
    Resource {
        /// Resource name at capture time.
        name: String,
        /// Resolved store key.
        handle: String,
    },
}

impl Scope {
    /// Store key for reads and writes.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Machine { key } => key,
            Self::Resource { handle, .. } => handle,
        }
    }

    /// Label used in reports and as the snapshot map key.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Machine { .. } => "machine",
            Self::Resource { name, .. } => name,
        }
    }
}

/// Enumerates resources.
pub trait ResourceInventory: Send + Sync + fmt::Debug {
    /// Discover the current set of eligible resources, in OS order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Discovery`] if enumeration itself fails.
    fn discover(&self) -> Result<Vec<Resource>, EngineError>;
}

/// Fixed inventory for tests and embedders that already know their resources.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    resources: Vec<Resource>,
    failure: Option<String>,
}

impl StaticInventory {
    /// An inventory that always returns `resources`.
    #[must_use]
    pub const fn new(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            failure: None,
        }
    }

    /// An inventory whose discovery always fails with `reason`.
    #[must_use]
    pub fn failing(reason: &str) -> Self {
        Self {
            resources: Vec::new(),
            failure: Some(reason.to_string()),
        }
    }
}

impl ResourceInventory for StaticInventory {
    fn discover(&self) -> Result<Vec<Resource>, EngineError> {
        match &self.failure {
            Some(reason) => Err(EngineError::Discovery {
                reason: reason.clone(),
            }),
            None => Ok(self.resources.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scope_key_and_label() {
        let machine = Scope::Machine {
            key: "SYSTEM\\X".into(),
        };
        assert_eq!(machine.key(), "SYSTEM\\X");
        assert_eq!(machine.label(), "machine");

        let adapter = Scope::Resource {
            name: "Ethernet".into(),
            handle: "SYSTEM\\Y\\0007".into(),
        };
        assert_eq!(adapter.key(), "SYSTEM\\Y\\0007");
        assert_eq!(adapter.label(), "Ethernet");
    }

    #[test]
    fn static_inventory_preserves_order() {
        let inv = StaticInventory::new(vec![Resource::new("1", "B"), Resource::new("0", "A")]);
        let names: Vec<_> = inv.discover().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn failing_inventory_is_discovery_error() {
        let err = StaticInventory::failing("WMI unavailable")
            .discover()
            .unwrap_err();
        assert!(matches!(err, EngineError::Discovery { .. }));
    }

    #[test]
    fn scope_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Scope::Machine { key: "K".into() }).unwrap();
        assert_eq!(json, r#"{"kind":"machine","key":"K"}"#);
    }
}

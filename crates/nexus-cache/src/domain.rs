//! Well-known cache domain names (spec §3 `CacheEntry`) and the typed handle
//! collectors and readers use to address them.

use std::any::TypeId;
use std::marker::PhantomData;

/// A domain name paired with the payload type stored under it, mirroring
/// `nexus_hub::Topic`.
#[derive(Debug, Clone, Copy)]
pub struct Domain<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Domain<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: 'static> Domain<T> {
    pub(crate) fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }
}

/// Every domain name the store pre-registers at construction, so a bulk
/// diagnostics snapshot can report "never collected" for a domain distinctly
/// from "this domain name doesn't exist".
pub const WELL_KNOWN_DOMAINS: &[&str] = &[
    "system",
    "array",
    "disks",
    "containers",
    "vms",
    "ups",
    "gpu",
    "network",
    "shares",
    "notifications",
    "zfs_pools",
    "zfs_datasets",
    "zfs_snapshots",
    "zfs_arc",
    "unassigned",
    "nut",
    "parity_history",
    "settings",
    "health",
];

/// `Domain<serde_json::Value>` handles for every well-known domain. Probes
/// (outside this crate's scope) and `nexus-mcp`'s read tools share these
/// constants rather than each re-declaring the domain name as a string
/// literal. Settings and nested per-tool views (hardware info, registration,
/// per-subsystem settings) are carried as fields inside the `system` and
/// `settings` JSON values rather than as separate cache domains, since spec
/// §3 only names these two for that purpose.
pub mod well_known {
    use super::Domain;
    use serde_json::Value;

    pub const SYSTEM: Domain<Value> = Domain::new("system");
    pub const ARRAY: Domain<Value> = Domain::new("array");
    pub const DISKS: Domain<Value> = Domain::new("disks");
    pub const CONTAINERS: Domain<Value> = Domain::new("containers");
    pub const VMS: Domain<Value> = Domain::new("vms");
    pub const UPS: Domain<Value> = Domain::new("ups");
    pub const GPU: Domain<Value> = Domain::new("gpu");
    pub const NETWORK: Domain<Value> = Domain::new("network");
    pub const SHARES: Domain<Value> = Domain::new("shares");
    pub const NOTIFICATIONS: Domain<Value> = Domain::new("notifications");
    pub const ZFS_POOLS: Domain<Value> = Domain::new("zfs_pools");
    pub const ZFS_DATASETS: Domain<Value> = Domain::new("zfs_datasets");
    pub const ZFS_SNAPSHOTS: Domain<Value> = Domain::new("zfs_snapshots");
    pub const ZFS_ARC: Domain<Value> = Domain::new("zfs_arc");
    pub const UNASSIGNED: Domain<Value> = Domain::new("unassigned");
    pub const NUT: Domain<Value> = Domain::new("nut");
    pub const PARITY_HISTORY: Domain<Value> = Domain::new("parity_history");
    pub const SETTINGS: Domain<Value> = Domain::new("settings");
    pub const HEALTH: Domain<Value> = Domain::new("health");
}

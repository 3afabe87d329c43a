//! `CollectorDescriptor` and the probe contract it wraps (spec §3/§4.3).

use std::sync::Arc;

use async_trait::async_trait;
use nexus_cache::{CacheStore, Domain};
use nexus_core::Result;
use nexus_hub::Hub;
use serde_json::Value;

/// Handles the manager gives a probe on every run: the shared hub and cache
/// to publish/store its results into, plus the shutdown token so a
/// long-running probe can check for cooperative cancellation mid-run. A
/// probe may still read the cache (e.g. to merge into its prior snapshot),
/// but the manager is the only writer.
pub struct RunContext {
    pub hub: Hub,
    pub cache: CacheStore,
    pub shutdown: nexus_core::ShutdownToken,
}

/// One collector's unit of work. A probe owns exactly one domain/topic and
/// computes its payload, but does not write it anywhere itself: the manager
/// applies `cache.set`/`hub.publish` only when `run_once` returns `Ok`, so a
/// failing run never leaves a stale write in the cache or a spurious
/// publication on the hub (spec §4.3).
#[async_trait]
pub trait CollectorProbe: Send + Sync {
    async fn run_once(&self, ctx: &RunContext) -> Result<Value>;
}

/// Registration-time description of a collector (spec §3 `CollectorDescriptor`).
pub struct CollectorDescriptor {
    pub name: &'static str,
    pub required: bool,
    pub default_interval_sec: u64,
    /// The cache domain (and, by name, hub topic) the manager writes this
    /// collector's payload to on a successful run.
    pub domain: Domain<Value>,
    pub probe: Arc<dyn CollectorProbe>,
}

impl CollectorDescriptor {
    pub fn new(
        name: &'static str,
        required: bool,
        default_interval_sec: u64,
        domain: Domain<Value>,
        probe: Arc<dyn CollectorProbe>,
    ) -> Self {
        Self {
            name,
            required,
            default_interval_sec,
            domain,
            probe,
        }
    }
}

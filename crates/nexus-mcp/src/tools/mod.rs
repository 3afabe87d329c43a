//! Builds the full tool catalogue (spec §4.4) from the read-only and
//! mutating groups.

mod mutating;
mod read;

pub use mutating::ControllerDeps;

use std::sync::Arc;

use nexus_cache::CacheStore;
use nexus_collectors::CollectorManager;
use nexus_core::Result;

use crate::registry::Registry;

pub fn register_all(
    registry: &mut Registry,
    cache: CacheStore,
    collectors: CollectorManager,
    controllers: Arc<ControllerDeps>,
) -> Result<()> {
    read::register(registry, cache, collectors.clone())?;
    mutating::register(registry, controllers, collectors)?;
    Ok(())
}

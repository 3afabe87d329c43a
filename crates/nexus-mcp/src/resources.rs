//! Resource catalogue (spec §4.4): the same cache snapshots the read tools
//! expose, behind stable URIs for clients that prefer resource reads over
//! tool calls.

use std::sync::Arc;

use nexus_cache::{well_known, CacheStore, Domain};
use serde_json::{json, Value};

use crate::registry::{Registry, Resource};

fn domain_resource(uri: &'static str, cache: CacheStore, domain: Domain<Value>, not_available: &'static str) -> Resource {
    Resource {
        uri,
        mime: "application/json",
        handler: Arc::new(move || {
            let cache = cache.clone();
            async move {
                match cache.get::<Value>(&domain) {
                    Ok(Some((value, _))) => (*value).clone(),
                    Ok(None) => json!({ "error": not_available }),
                    Err(_) => json!({ "error": not_available }),
                }
            }
        }),
    }
}

pub fn register(registry: &mut Registry, cache: CacheStore) -> nexus_core::Result<()> {
    use well_known::*;

    registry.register_resource(domain_resource(
        "unraid://system",
        cache.clone(),
        SYSTEM,
        "System information not available",
    ))?;
    registry.register_resource(domain_resource(
        "unraid://array",
        cache.clone(),
        ARRAY,
        "Array status not available",
    ))?;
    registry.register_resource(domain_resource(
        "unraid://containers",
        cache.clone(),
        CONTAINERS,
        "No containers configured",
    ))?;
    registry.register_resource(domain_resource(
        "unraid://vms",
        cache.clone(),
        VMS,
        "No VMs configured",
    ))?;
    registry.register_resource(domain_resource(
        "unraid://disks",
        cache,
        DISKS,
        "No disks configured",
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceHandler;

    #[tokio::test]
    async fn empty_cache_resource_read_yields_an_error_field() {
        let cache = CacheStore::new();
        let resource = domain_resource("unraid://system", cache, well_known::SYSTEM, "System information not available");
        let body = resource.handler.read().await;
        assert_eq!(body["error"], "System information not available");
    }

    #[tokio::test]
    async fn populated_cache_resource_read_returns_the_snapshot() {
        let cache = CacheStore::new();
        cache.set(&well_known::SYSTEM, json!({ "hostname": "tower" }));
        let resource = domain_resource("unraid://system", cache, well_known::SYSTEM, "not available");
        let body = resource.handler.read().await;
        assert_eq!(body["hostname"], "tower");
    }
}

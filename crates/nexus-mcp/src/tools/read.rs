//! The read-only tool catalogue (spec §4.4 "Read (system)" group).

use std::sync::Arc;

use nexus_cache::{well_known, CacheStore, Domain};
use nexus_collectors::CollectorManager;
use nexus_core::Result;
use serde_json::{json, Value};

use crate::args::required_string;
use crate::registry::{Registry, Tool, ToolAnnotations, ToolOutcome};

/// A plain "read this domain verbatim, or say it's missing" tool.
fn domain_tool(
    name: &'static str,
    description: &'static str,
    cache: CacheStore,
    domain: Domain<Value>,
    not_available: &'static str,
) -> Tool {
    Tool {
        name,
        description,
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |_args: Value| {
            let cache = cache.clone();
            async move { read_domain(&cache, &domain, not_available) }
        }),
    }
}

fn read_domain(cache: &CacheStore, domain: &Domain<Value>, not_available: &str) -> Result<ToolOutcome> {
    match cache.get(domain)? {
        Some((value, _updated_at)) => Ok(ToolOutcome::Json((*value).clone())),
        None => Ok(ToolOutcome::text(not_available)),
    }
}

/// A "read one sub-field of a domain" tool (settings, hardware info,
/// registration — spec groups these under the `system`/`settings` domains
/// rather than giving each its own cache entry).
fn domain_field_tool(
    name: &'static str,
    description: &'static str,
    cache: CacheStore,
    domain: Domain<Value>,
    field: &'static str,
    not_available: &'static str,
) -> Tool {
    Tool {
        name,
        description,
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |_args: Value| {
            let cache = cache.clone();
            async move {
                match cache.get(&domain)? {
                    Some((value, _)) => match value.get(field) {
                        Some(field_value) => Ok(ToolOutcome::Json(field_value.clone())),
                        None => Ok(ToolOutcome::text(not_available)),
                    },
                    None => Ok(ToolOutcome::text(not_available)),
                }
            }
        }),
    }
}

/// Finds one item in a domain's JSON array by `id_field`, used by the
/// `get_<x>_info` family.
fn find_item_tool(
    name: &'static str,
    description: &'static str,
    cache: CacheStore,
    domain: Domain<Value>,
    id_arg: &'static str,
    id_field: &'static str,
    domain_not_available: &'static str,
) -> Tool {
    Tool {
        name,
        description,
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let cache = cache.clone();
            async move {
                let id = required_string(&args, id_arg)?;
                match cache.get(&domain)? {
                    Some((value, _)) => {
                        let found = value
                            .as_array()
                            .and_then(|items| {
                                items.iter().find(|item| {
                                    item.get(id_field).and_then(Value::as_str) == Some(id.as_str())
                                })
                            })
                            .cloned();
                        match found {
                            Some(item) => Ok(ToolOutcome::Json(item)),
                            None => Ok(ToolOutcome::text(format!("{id_arg} '{id}' not found"))),
                        }
                    }
                    None => Ok(ToolOutcome::text(domain_not_available)),
                }
            }
        }),
    }
}

fn search_tool(
    name: &'static str,
    description: &'static str,
    cache: CacheStore,
    domain: Domain<Value>,
    name_fields: &'static [&'static str],
    domain_not_available: &'static str,
) -> Tool {
    Tool {
        name,
        description,
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let cache = cache.clone();
            async move {
                let query = required_string(&args, "query")?.to_lowercase();
                match cache.get(&domain)? {
                    Some((value, _)) => {
                        let matches: Vec<Value> = value
                            .as_array()
                            .map(|items| {
                                items
                                    .iter()
                                    .filter(|item| {
                                        name_fields.iter().any(|field| {
                                            item.get(*field)
                                                .and_then(Value::as_str)
                                                .map(|s| s.to_lowercase().contains(&query))
                                                .unwrap_or(false)
                                        })
                                    })
                                    .cloned()
                                    .collect()
                            })
                            .unwrap_or_default();
                        Ok(ToolOutcome::Json(json!({ "matches": matches })))
                    }
                    None => Ok(ToolOutcome::text(domain_not_available)),
                }
            }
        }),
    }
}

pub fn register(registry: &mut Registry, cache: CacheStore, collectors: CollectorManager) -> Result<()> {
    use well_known::*;

    registry.register_tool(domain_tool(
        "get_system_info",
        "Current system information snapshot",
        cache.clone(),
        SYSTEM,
        "System information not available",
    ))?;
    registry.register_tool(domain_tool(
        "get_array_status",
        "Current storage array status",
        cache.clone(),
        ARRAY,
        "Array status not available",
    ))?;
    registry.register_tool(domain_tool(
        "list_disks",
        "All disks known to the array",
        cache.clone(),
        DISKS,
        "No disks configured",
    ))?;
    registry.register_tool(find_item_tool(
        "get_disk_info",
        "Detail for one disk",
        cache.clone(),
        DISKS,
        "disk_id",
        "id",
        "No disks configured",
    ))?;
    registry.register_tool(domain_tool(
        "list_shares",
        "All configured shares",
        cache.clone(),
        SHARES,
        "No shares configured",
    ))?;
    registry.register_tool(domain_tool(
        "list_containers",
        "All Docker containers",
        cache.clone(),
        CONTAINERS,
        "No containers configured",
    ))?;
    registry.register_tool(find_item_tool(
        "get_container_info",
        "Detail for one container",
        cache.clone(),
        CONTAINERS,
        "container_id",
        "id",
        "No containers configured",
    ))?;
    registry.register_tool(domain_tool(
        "list_vms",
        "All virtual machines",
        cache.clone(),
        VMS,
        "No VMs configured",
    ))?;
    registry.register_tool(find_item_tool(
        "get_vm_info",
        "Detail for one VM",
        cache.clone(),
        VMS,
        "vm_name",
        "name",
        "No VMs configured",
    ))?;
    registry.register_tool(domain_tool(
        "get_ups_status",
        "UPS status",
        cache.clone(),
        UPS,
        "UPS not configured",
    ))?;
    registry.register_tool(domain_tool(
        "get_gpu_metrics",
        "GPU metrics",
        cache.clone(),
        GPU,
        "GPU metrics not available",
    ))?;
    registry.register_tool(domain_tool(
        "get_network_info",
        "Network interface information",
        cache.clone(),
        NETWORK,
        "Network information not available",
    ))?;
    registry.register_tool(domain_field_tool(
        "get_hardware_info",
        "Host hardware information",
        cache.clone(),
        SYSTEM,
        "hardware",
        "Hardware information not available",
    ))?;
    registry.register_tool(domain_field_tool(
        "get_registration",
        "Registration/license information",
        cache.clone(),
        SYSTEM,
        "registration",
        "Registration information not available",
    ))?;
    registry.register_tool(domain_tool(
        "get_notifications",
        "All active notifications",
        cache.clone(),
        NOTIFICATIONS,
        "No notifications",
    ))?;
    registry.register_tool(domain_field_tool(
        "get_notifications_overview",
        "Notification counts by severity",
        cache.clone(),
        NOTIFICATIONS,
        "overview",
        "No notifications",
    ))?;
    registry.register_tool(domain_tool(
        "get_zfs_pools",
        "All ZFS pools",
        cache.clone(),
        ZFS_POOLS,
        "No ZFS pools configured",
    ))?;
    registry.register_tool(domain_tool(
        "get_zfs_datasets",
        "All ZFS datasets",
        cache.clone(),
        ZFS_DATASETS,
        "No ZFS datasets configured",
    ))?;
    registry.register_tool(domain_tool(
        "get_zfs_snapshots",
        "All ZFS snapshots",
        cache.clone(),
        ZFS_SNAPSHOTS,
        "No ZFS snapshots configured",
    ))?;
    registry.register_tool(domain_tool(
        "get_zfs_arc_stats",
        "ZFS ARC cache statistics",
        cache.clone(),
        ZFS_ARC,
        "ZFS ARC stats not available",
    ))?;
    registry.register_tool(domain_tool(
        "get_unassigned_devices",
        "Disks not assigned to the array",
        cache.clone(),
        UNASSIGNED,
        "No unassigned devices",
    ))?;
    registry.register_tool(domain_tool(
        "get_nut_status",
        "Network UPS Tools daemon status",
        cache.clone(),
        NUT,
        "NUT not configured",
    ))?;
    registry.register_tool(domain_tool(
        "get_parity_history",
        "History of parity check runs",
        cache.clone(),
        PARITY_HISTORY,
        "No parity history",
    ))?;
    registry.register_tool(domain_field_tool(
        "list_log_files",
        "Names of available log files",
        cache.clone(),
        HEALTH,
        "log_files",
        "No log files available",
    ))?;
    registry.register_tool(log_content_tool(cache.clone()))?;
    registry.register_tool(syslog_tool(cache.clone()))?;
    registry.register_tool(docker_log_tool(cache.clone()))?;
    registry.register_tool(collectors_list_tool(collectors.clone()))?;
    registry.register_tool(collector_status_tool(collectors))?;
    registry.register_tool(domain_field_tool(
        "get_system_settings",
        "System-wide settings",
        cache.clone(),
        SETTINGS,
        "system",
        "System settings not configured",
    ))?;
    registry.register_tool(domain_field_tool(
        "get_docker_settings",
        "Docker subsystem settings",
        cache.clone(),
        SETTINGS,
        "docker",
        "Docker settings not configured",
    ))?;
    registry.register_tool(domain_field_tool(
        "get_vm_settings",
        "VM subsystem settings",
        cache.clone(),
        SETTINGS,
        "vm",
        "VM settings not configured",
    ))?;
    registry.register_tool(domain_field_tool(
        "get_disk_settings",
        "Disk subsystem settings",
        cache.clone(),
        SETTINGS,
        "disk",
        "Disk settings not configured",
    ))?;
    registry.register_tool(share_config_tool(cache.clone()))?;
    registry.register_tool(domain_field_tool(
        "get_network_access_urls",
        "URLs the host is reachable at",
        cache.clone(),
        SETTINGS,
        "network_access_urls",
        "Network access URLs not configured",
    ))?;
    registry.register_tool(domain_tool(
        "get_health_status",
        "Overall agent/host health",
        cache.clone(),
        HEALTH,
        "Health status not available",
    ))?;
    registry.register_tool(search_tool(
        "search_containers",
        "Search containers by name or id",
        cache.clone(),
        CONTAINERS,
        &["id", "name"],
        "No containers configured",
    ))?;
    registry.register_tool(search_tool(
        "search_vms",
        "Search VMs by name",
        cache.clone(),
        VMS,
        &["name"],
        "No VMs configured",
    ))?;
    registry.register_tool(diagnostic_summary_tool(cache.clone()))?;
    registry.register_tool(domain_field_tool(
        "list_user_scripts",
        "User scripts available to execute",
        cache.clone(),
        SETTINGS,
        "user_scripts",
        "No user scripts configured",
    ))?;

    Ok(())
}

fn log_content_tool(cache: CacheStore) -> Tool {
    Tool {
        name: "get_log_content",
        description: "Tail of a specific log file",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let cache = cache.clone();
            async move {
                let log_file = required_string(&args, "log_file")?;
                let lines = crate::args::clamped_u64(&args, "lines", 100, 1, 1000);
                match cache.get(&well_known::HEALTH)? {
                    Some((value, _)) => match value.get("logs").and_then(|logs| logs.get(&log_file)) {
                        Some(content) => Ok(ToolOutcome::Json(json!({ "lines": lines, "content": content }))),
                        None => Ok(ToolOutcome::text(format!("Log file '{log_file}' not available"))),
                    },
                    None => Ok(ToolOutcome::text("No log files available")),
                }
            }
        }),
    }
}

fn syslog_tool(cache: CacheStore) -> Tool {
    Tool {
        name: "get_syslog",
        description: "Tail of the system log",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let cache = cache.clone();
            async move {
                let lines = crate::args::clamped_u64(&args, "lines", 100, 1, 1000);
                match cache.get(&well_known::HEALTH)? {
                    Some((value, _)) => match value.get("syslog") {
                        Some(content) => Ok(ToolOutcome::Json(json!({ "lines": lines, "content": content }))),
                        None => Ok(ToolOutcome::text("Syslog not available")),
                    },
                    None => Ok(ToolOutcome::text("Syslog not available")),
                }
            }
        }),
    }
}

fn docker_log_tool(cache: CacheStore) -> Tool {
    Tool {
        name: "get_docker_log",
        description: "Tail of one container's log",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let cache = cache.clone();
            async move {
                let container_id = required_string(&args, "container_id")?;
                let lines = crate::args::clamped_u64(&args, "lines", 100, 1, 1000);
                match cache.get(&well_known::CONTAINERS)? {
                    Some((value, _)) => {
                        let found = value.as_array().and_then(|items| {
                            items
                                .iter()
                                .find(|item| item.get("id").and_then(Value::as_str) == Some(container_id.as_str()))
                        });
                        match found.and_then(|item| item.get("log")) {
                            Some(content) => Ok(ToolOutcome::Json(json!({ "lines": lines, "content": content }))),
                            None => Ok(ToolOutcome::text(format!(
                                "Log for container '{container_id}' not available"
                            ))),
                        }
                    }
                    None => Ok(ToolOutcome::text("No containers configured")),
                }
            }
        }),
    }
}

fn share_config_tool(cache: CacheStore) -> Tool {
    Tool {
        name: "get_share_config",
        description: "Configuration for one share",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let cache = cache.clone();
            async move {
                let share_name = required_string(&args, "share_name")?;
                match cache.get(&well_known::SHARES)? {
                    Some((value, _)) => {
                        let found = value.as_array().and_then(|items| {
                            items
                                .iter()
                                .find(|item| item.get("name").and_then(Value::as_str) == Some(share_name.as_str()))
                        });
                        match found {
                            Some(item) => Ok(ToolOutcome::Json(item.clone())),
                            None => Ok(ToolOutcome::text(format!("share '{share_name}' not found"))),
                        }
                    }
                    None => Ok(ToolOutcome::text("No shares configured")),
                }
            }
        }),
    }
}

fn collectors_list_tool(collectors: CollectorManager) -> Tool {
    Tool {
        name: "list_collectors",
        description: "Every registered collector's current state",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |_args: Value| {
            let collectors = collectors.clone();
            async move {
                let all = collectors.get_all();
                let items: Vec<Value> = all
                    .into_iter()
                    .map(|(name, state)| collector_state_json(name, &state))
                    .collect();
                Ok(ToolOutcome::Json(json!({ "collectors": items })))
            }
        }),
    }
}

fn collector_status_tool(collectors: CollectorManager) -> Tool {
    Tool {
        name: "get_collector_status",
        description: "One collector's current state",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let collectors = collectors.clone();
            async move {
                let collector_name = required_string(&args, "collector_name")?;
                let state = collectors.get_status(&collector_name)?;
                Ok(ToolOutcome::Json(collector_state_json(&collector_name, &state)))
            }
        }),
    }
}

fn collector_state_json(name: &str, state: &nexus_collectors::CollectorState) -> Value {
    json!({
        "name": name,
        "enabled": state.enabled,
        "intervalSec": state.interval_sec,
        "status": format!("{:?}", state.status).to_lowercase(),
        "consecutiveErrors": state.consecutive_errors,
        "lastError": state.last_error,
    })
}

fn diagnostic_summary_tool(cache: CacheStore) -> Tool {
    Tool {
        name: "get_diagnostic_summary",
        description: "Presence and freshness of every cache domain",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |_args: Value| {
            let cache = cache.clone();
            async move {
                let domains: Vec<Value> = cache
                    .diagnostics_snapshot()
                    .into_iter()
                    .map(|d| {
                        json!({
                            "domain": d.domain,
                            "present": d.value.is_some(),
                            "lastUpdate": d.last_update.map(|t| {
                                t.duration_since(std::time::UNIX_EPOCH)
                                    .map(|d| d.as_secs())
                                    .unwrap_or(0)
                            }),
                        })
                    })
                    .collect();
                Ok(ToolOutcome::Json(json!({ "domains": domains })))
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn call(tool: &Tool, args: Value) -> String {
        tool.handler.call(args).await.unwrap().into_text_block()
    }

    // P5: every domain with an empty cache reports one of the spec's three phrasings.
    #[tokio::test]
    async fn empty_cache_reports_not_available() {
        let cache = CacheStore::new();

        let system = domain_tool("x", "x", cache.clone(), well_known::SYSTEM, "System information not available");
        assert_eq!(call(&system, json!({})).await, "System information not available");

        let disks = domain_tool("x", "x", cache.clone(), well_known::DISKS, "No disks configured");
        assert_eq!(call(&disks, json!({})).await, "No disks configured");

        let ups = domain_tool("x", "x", cache.clone(), well_known::UPS, "UPS not configured");
        assert_eq!(call(&ups, json!({})).await, "UPS not configured");
    }

    #[tokio::test]
    async fn populated_cache_returns_json() {
        let cache = CacheStore::new();
        cache.set(&well_known::SYSTEM, json!({ "hostname": "tower" }));
        let tool = domain_tool("get_system_info", "x", cache, well_known::SYSTEM, "not available");
        let text = call(&tool, json!({})).await;
        assert!(text.contains("tower"), "{text}");
    }

    #[tokio::test]
    async fn find_item_reports_missing_domain_vs_missing_item() {
        let cache = CacheStore::new();
        let tool = find_item_tool(
            "get_disk_info",
            "x",
            cache.clone(),
            well_known::DISKS,
            "disk_id",
            "id",
            "No disks configured",
        );

        assert_eq!(call(&tool, json!({ "disk_id": "disk1" })).await, "No disks configured");

        cache.set(&well_known::DISKS, json!([{ "id": "disk1" }]));
        assert!(call(&tool, json!({ "disk_id": "disk2" })).await.contains("not found"));
        assert!(call(&tool, json!({ "disk_id": "disk1" })).await.contains("disk1"));
    }

    // P3: a required string argument rejects an empty value.
    #[tokio::test]
    async fn find_item_rejects_empty_required_argument() {
        let cache = CacheStore::new();
        let tool = find_item_tool(
            "get_disk_info",
            "x",
            cache,
            well_known::DISKS,
            "disk_id",
            "id",
            "No disks configured",
        );
        let err = call(&tool, json!({ "disk_id": "" })).await;
        assert_eq!(err, "disk_id is required");
    }

    #[tokio::test]
    async fn search_tool_filters_by_name_fields() {
        let cache = CacheStore::new();
        cache.set(
            &well_known::CONTAINERS,
            json!([{ "id": "c1", "name": "plex" }, { "id": "c2", "name": "sonarr" }]),
        );
        let tool = search_tool(
            "search_containers",
            "x",
            cache,
            well_known::CONTAINERS,
            &["id", "name"],
            "No containers configured",
        );
        let text = call(&tool, json!({ "query": "plex" })).await;
        assert!(text.contains("plex"));
        assert!(!text.contains("sonarr"));
    }
}

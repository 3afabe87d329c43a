//! The mutating tool catalogue (spec §4.4 "Mutating" group). Side effects
//! flow through `nexus-controllers` gateways; the confirmation gate applies
//! to exactly the tool names spec §4.4 marks with an asterisk.

use std::sync::Arc;

use nexus_collectors::CollectorManager;
use nexus_controllers::{
    ArrayGateway, ContainerGateway, DiskGateway, PluginGateway, ScriptGateway, ServiceGateway,
    SystemGateway, VmGateway,
};
use nexus_core::{NexusError, Result};
use serde_json::{json, Value};

use crate::args::{clamped_u64, confirm, confirmation_required_message, required_string, unknown_action_message};
use crate::registry::{Registry, Tool, ToolAnnotations, ToolOutcome};

/// Dependencies every mutating tool needs. Grouped into one struct so
/// `build_registry` has one thing to pass around rather than eight.
pub struct ControllerDeps {
    pub containers: Arc<dyn ContainerGateway>,
    pub vms: Arc<dyn VmGateway>,
    pub array: Arc<dyn ArrayGateway>,
    pub system: Arc<dyn SystemGateway>,
    pub disks: Arc<dyn DiskGateway>,
    pub scripts: Arc<dyn ScriptGateway>,
    pub services: Arc<dyn ServiceGateway>,
    pub plugins: Arc<dyn PluginGateway>,
}

fn external_failure(action: &str, err: NexusError) -> ToolOutcome {
    ToolOutcome::text(format!("Failed to {action}: {}", err.message()))
}

pub fn register(registry: &mut Registry, deps: Arc<ControllerDeps>, collectors: CollectorManager) -> Result<()> {
    registry.register_tool(container_action_tool(deps.clone()))?;
    registry.register_tool(vm_action_tool(deps.clone()))?;
    registry.register_tool(array_action_tool(deps.clone()))?;
    registry.register_tool(parity_check_action_tool(deps.clone()))?;
    registry.register_tool(parity_check_control_tool("parity_check_stop", deps.clone()))?;
    registry.register_tool(parity_check_control_tool("parity_check_pause", deps.clone()))?;
    registry.register_tool(parity_check_control_tool("parity_check_resume", deps.clone()))?;
    registry.register_tool(system_power_tool("system_reboot", deps.clone()))?;
    registry.register_tool(system_power_tool("system_shutdown", deps.clone()))?;
    registry.register_tool(disk_spin_tool("disk_spin_up", deps.clone()))?;
    registry.register_tool(disk_spin_tool("disk_spin_down", deps.clone()))?;
    registry.register_tool(execute_user_script_tool(deps.clone()))?;
    registry.register_tool(collector_action_tool(collectors.clone()))?;
    registry.register_tool(update_collector_interval_tool(collectors))?;
    registry.register_tool(service_action_tool(deps.clone()))?;
    registry.register_tool(update_container_tool(deps.clone()))?;
    registry.register_tool(update_all_containers_tool(deps.clone()))?;
    registry.register_tool(update_plugin_tool(deps.clone()))?;
    registry.register_tool(update_all_plugins_tool(deps.clone()))?;
    registry.register_tool(create_vm_snapshot_tool(deps.clone()))?;
    registry.register_tool(delete_vm_snapshot_tool(deps.clone()))?;
    registry.register_tool(restore_vm_snapshot_tool(deps.clone()))?;
    registry.register_tool(clone_vm_tool(deps.clone()))?;
    registry.register_tool(container_logs_tool(deps.clone()))?;
    registry.register_tool(container_size_tool(deps.clone()))?;
    registry.register_tool(check_container_updates_tool(deps.clone()))?;
    registry.register_tool(check_container_update_tool(deps.clone()))?;
    registry.register_tool(check_plugin_updates_tool(deps.clone()))?;
    registry.register_tool(list_vm_snapshots_tool(deps.clone()))?;
    registry.register_tool(get_service_status_tool(deps.clone()))?;
    registry.register_tool(list_services_tool(deps.clone()))?;
    registry.register_tool(list_processes_tool())?;
    Ok(())
}

fn container_action_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "container_action",
        description: "start|stop|restart|pause|unpause a container",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let container_id = required_string(&args, "container_id")?;
                let action = required_string(&args, "action")?;
                let result = match action.as_str() {
                    "start" => deps.containers.start(&container_id).await,
                    "stop" => deps.containers.stop(&container_id).await,
                    "restart" => deps.containers.restart(&container_id).await,
                    "pause" => deps.containers.pause(&container_id).await,
                    "unpause" => deps.containers.unpause(&container_id).await,
                    other => return Ok(ToolOutcome::text(unknown_action_message(other))),
                };
                match result {
                    Ok(()) => {
                        tracing::info!(subject = %container_id, action = %action, "container_action");
                        Ok(ToolOutcome::text(format!("container '{container_id}' {action} requested")))
                    }
                    Err(err) => {
                        tracing::error!(subject = %container_id, action = %action, error = %err, "container_action failed");
                        Ok(external_failure("container_action", err))
                    }
                }
            }
        }),
    }
}

fn vm_action_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "vm_action",
        description: "start|stop|restart|pause|resume|hibernate|force-stop a VM",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let vm_name = required_string(&args, "vm_name")?;
                let action = required_string(&args, "action")?;
                let result = match action.as_str() {
                    "start" => deps.vms.start(&vm_name).await,
                    "stop" => deps.vms.stop(&vm_name).await,
                    "restart" => deps.vms.restart(&vm_name).await,
                    "pause" => deps.vms.pause(&vm_name).await,
                    "resume" => deps.vms.resume(&vm_name).await,
                    "hibernate" => deps.vms.hibernate(&vm_name).await,
                    "force-stop" => deps.vms.force_stop(&vm_name).await,
                    other => return Ok(ToolOutcome::text(unknown_action_message(other))),
                };
                match result {
                    Ok(()) => {
                        tracing::info!(subject = %vm_name, action = %action, "vm_action");
                        Ok(ToolOutcome::text(format!("vm '{vm_name}' {action} requested")))
                    }
                    Err(err) => {
                        tracing::error!(subject = %vm_name, action = %action, error = %err, "vm_action failed");
                        Ok(external_failure("vm_action", err))
                    }
                }
            }
        }),
    }
}

fn array_action_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "array_action",
        description: "start|stop the array (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let action = required_string(&args, "action")?;
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("array_action")));
                }
                let result = match action.as_str() {
                    "start" => deps.array.start().await,
                    "stop" => deps.array.stop().await,
                    other => return Ok(ToolOutcome::text(unknown_action_message(other))),
                };
                match result {
                    Ok(()) => {
                        tracing::info!(subject = "array", action = %action, "array_action");
                        Ok(ToolOutcome::text(format!("array {action} requested")))
                    }
                    Err(err) => {
                        tracing::error!(subject = "array", action = %action, error = %err, "array_action failed");
                        Ok(external_failure("array_action", err))
                    }
                }
            }
        }),
    }
}

fn parity_check_action_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "parity_check_action",
        description: "Starts a parity check, optionally correcting",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let correcting = crate::args::optional_bool(&args, "correcting", false);
                match deps.array.parity_check_start(correcting).await {
                    Ok(()) => {
                        tracing::info!(subject = "array", action = "parity_check_start", correcting, "parity_check_action");
                        Ok(ToolOutcome::text("parity check started"))
                    }
                    Err(err) => Ok(external_failure("parity_check_action", err)),
                }
            }
        }),
    }
}

fn parity_check_control_tool(name: &'static str, deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name,
        description: "Controls an in-progress parity check",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |_args: Value| {
            let deps = deps.clone();
            async move {
                let result = match name {
                    "parity_check_stop" => deps.array.parity_check_stop().await,
                    "parity_check_pause" => deps.array.parity_check_pause().await,
                    "parity_check_resume" => deps.array.parity_check_resume().await,
                    _ => unreachable!(),
                };
                match result {
                    Ok(()) => {
                        tracing::info!(subject = "array", action = %name, "parity_check_control");
                        Ok(ToolOutcome::text(format!("{name} requested")))
                    }
                    Err(err) => Ok(external_failure(name, err)),
                }
            }
        }),
    }
}

fn system_power_tool(name: &'static str, deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name,
        description: "Reboots or shuts down the host (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message(name)));
                }
                let result = match name {
                    "system_reboot" => deps.system.reboot().await,
                    "system_shutdown" => deps.system.shutdown().await,
                    _ => unreachable!(),
                };
                match result {
                    Ok(()) => {
                        tracing::info!(subject = "system", action = %name, "system_power");
                        Ok(ToolOutcome::text(format!("{name} requested")))
                    }
                    Err(err) => {
                        tracing::error!(subject = "system", action = %name, error = %err, "system_power failed");
                        Ok(external_failure(name, err))
                    }
                }
            }
        }),
    }
}

fn disk_spin_tool(name: &'static str, deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name,
        description: "Spins a disk up or down",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let disk_id = required_string(&args, "disk_id")?;
                let result = match name {
                    "disk_spin_up" => deps.disks.spin_up(&disk_id).await,
                    "disk_spin_down" => deps.disks.spin_down(&disk_id).await,
                    _ => unreachable!(),
                };
                match result {
                    Ok(()) => {
                        tracing::info!(subject = %disk_id, action = %name, "disk_spin");
                        Ok(ToolOutcome::text(format!("disk '{disk_id}' {name} requested")))
                    }
                    Err(err) => Ok(external_failure(name, err)),
                }
            }
        }),
    }
}

fn execute_user_script_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "execute_user_script",
        description: "Executes a user script (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let script_name = required_string(&args, "script_name")?;
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("execute_user_script")));
                }
                match deps.scripts.execute(&script_name).await {
                    Ok(output) => {
                        tracing::info!(subject = %script_name, action = "execute", "execute_user_script");
                        Ok(ToolOutcome::text(output))
                    }
                    Err(err) => {
                        tracing::error!(subject = %script_name, error = %err, "execute_user_script failed");
                        Ok(external_failure("execute_user_script", err))
                    }
                }
            }
        }),
    }
}

fn collector_action_tool(collectors: CollectorManager) -> Tool {
    Tool {
        name: "collector_action",
        description: "enable|disable a collector",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |args: Value| {
            let collectors = collectors.clone();
            async move {
                let collector_name = required_string(&args, "collector_name")?;
                let action = required_string(&args, "action")?;
                let result = match action.as_str() {
                    "enable" => collectors.enable(&collector_name),
                    "disable" => collectors.disable(&collector_name),
                    other => return Ok(ToolOutcome::text(unknown_action_message(other))),
                };
                match result {
                    Ok(()) => Ok(ToolOutcome::text(format!("collector '{collector_name}' {action} requested"))),
                    Err(err) if err.kind() == nexus_core::ErrorKind::ProtectedResource => {
                        Ok(ToolOutcome::text(err.message().to_string()))
                    }
                    Err(err) => Err(err),
                }
            }
        }),
    }
}

fn update_collector_interval_tool(collectors: CollectorManager) -> Tool {
    Tool {
        name: "update_collector_interval",
        description: "Changes a collector's polling interval",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |args: Value| {
            let collectors = collectors.clone();
            async move {
                let collector_name = required_string(&args, "collector_name")?;
                let interval = args
                    .get("interval")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| NexusError::validation("interval must be between 5 and 3600 seconds"))?;
                match collectors.update_interval(&collector_name, interval) {
                    Ok(()) => Ok(ToolOutcome::text(format!(
                        "collector '{collector_name}' interval set to {interval}s"
                    ))),
                    Err(err) => Ok(ToolOutcome::text(err.message().to_string())),
                }
            }
        }),
    }
}

fn service_action_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "service_action",
        description: "start|stop|restart a service (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let service_name = required_string(&args, "service_name")?;
                let action = required_string(&args, "action")?;
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("service_action")));
                }
                let result = match action.as_str() {
                    "start" => deps.services.start(&service_name).await,
                    "stop" => deps.services.stop(&service_name).await,
                    "restart" => deps.services.restart(&service_name).await,
                    other => return Ok(ToolOutcome::text(unknown_action_message(other))),
                };
                match result {
                    Ok(()) => Ok(ToolOutcome::text(format!("service '{service_name}' {action} requested"))),
                    Err(err) => Ok(external_failure("service_action", err)),
                }
            }
        }),
    }
}

fn update_container_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "update_container",
        description: "Updates one container to its latest image (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let container_id = required_string(&args, "container_id")?;
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("update_container")));
                }
                match deps.containers.update(&container_id).await {
                    Ok(()) => Ok(ToolOutcome::text(format!("container '{container_id}' update requested"))),
                    Err(err) => Ok(external_failure("update_container", err)),
                }
            }
        }),
    }
}

fn update_all_containers_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "update_all_containers",
        description: "Updates every container to its latest image (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("update_all_containers")));
                }
                match deps.containers.update_all().await {
                    Ok(()) => Ok(ToolOutcome::text("all containers update requested")),
                    Err(err) => Ok(external_failure("update_all_containers", err)),
                }
            }
        }),
    }
}

fn update_plugin_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "update_plugin",
        description: "Updates one plugin (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let plugin_name = required_string(&args, "plugin_name")?;
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("update_plugin")));
                }
                match deps.plugins.update(&plugin_name).await {
                    Ok(()) => Ok(ToolOutcome::text(format!("plugin '{plugin_name}' update requested"))),
                    Err(err) => Ok(external_failure("update_plugin", err)),
                }
            }
        }),
    }
}

fn update_all_plugins_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "update_all_plugins",
        description: "Updates every plugin (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("update_all_plugins")));
                }
                match deps.plugins.update_all().await {
                    Ok(()) => Ok(ToolOutcome::text("all plugins update requested")),
                    Err(err) => Ok(external_failure("update_all_plugins", err)),
                }
            }
        }),
    }
}

fn create_vm_snapshot_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "create_vm_snapshot",
        description: "Creates a VM snapshot",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let vm_name = required_string(&args, "vm_name")?;
                let snapshot_name = required_string(&args, "snapshot_name")?;
                match deps.vms.create_snapshot(&vm_name, &snapshot_name).await {
                    Ok(()) => Ok(ToolOutcome::text(format!("snapshot '{snapshot_name}' created for '{vm_name}'"))),
                    Err(err) => Ok(external_failure("create_vm_snapshot", err)),
                }
            }
        }),
    }
}

fn delete_vm_snapshot_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "delete_vm_snapshot",
        description: "Deletes a VM snapshot",
        annotations: ToolAnnotations::mutating(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let vm_name = required_string(&args, "vm_name")?;
                let snapshot_name = required_string(&args, "snapshot_name")?;
                match deps.vms.delete_snapshot(&vm_name, &snapshot_name).await {
                    Ok(()) => Ok(ToolOutcome::text(format!("snapshot '{snapshot_name}' deleted for '{vm_name}'"))),
                    Err(err) => Ok(external_failure("delete_vm_snapshot", err)),
                }
            }
        }),
    }
}

fn restore_vm_snapshot_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "restore_vm_snapshot",
        description: "Restores a VM to a prior snapshot (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let vm_name = required_string(&args, "vm_name")?;
                let snapshot_name = required_string(&args, "snapshot_name")?;
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("restore_vm_snapshot")));
                }
                match deps.vms.restore_snapshot(&vm_name, &snapshot_name).await {
                    Ok(()) => Ok(ToolOutcome::text(format!("vm '{vm_name}' restored to '{snapshot_name}'"))),
                    Err(err) => Ok(external_failure("restore_vm_snapshot", err)),
                }
            }
        }),
    }
}

fn clone_vm_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "clone_vm",
        description: "Clones a VM (destructive; requires confirm=true)",
        annotations: ToolAnnotations::destructive(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let vm_name = required_string(&args, "vm_name")?;
                let clone_name = required_string(&args, "clone_name")?;
                if !confirm(&args) {
                    return Ok(ToolOutcome::text(confirmation_required_message("clone_vm")));
                }
                match deps.vms.clone(&vm_name, &clone_name).await {
                    Ok(()) => Ok(ToolOutcome::text(format!("vm '{vm_name}' cloned to '{clone_name}'"))),
                    Err(err) => Ok(external_failure("clone_vm", err)),
                }
            }
        }),
    }
}

fn container_logs_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "get_container_logs",
        description: "Fetches a container's logs from the host directly",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let container_id = required_string(&args, "container_id")?;
                match deps.containers.logs(&container_id).await {
                    Ok(logs) => Ok(ToolOutcome::text(logs)),
                    Err(err) => Ok(external_failure("get_container_logs", err)),
                }
            }
        }),
    }
}

fn container_size_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "get_container_size",
        description: "Fetches a container's on-disk size",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let container_id = required_string(&args, "container_id")?;
                match deps.containers.size(&container_id).await {
                    Ok(size) => Ok(ToolOutcome::text(size)),
                    Err(err) => Ok(external_failure("get_container_size", err)),
                }
            }
        }),
    }
}

fn check_container_updates_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "check_container_updates",
        description: "Checks every container for available updates",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |_args: Value| {
            let deps = deps.clone();
            async move {
                match deps.containers.check_all_updates().await {
                    Ok(report) => Ok(ToolOutcome::text(report)),
                    Err(err) => Ok(external_failure("check_container_updates", err)),
                }
            }
        }),
    }
}

fn check_container_update_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "check_container_update",
        description: "Checks one container for an available update",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let container_id = required_string(&args, "container_id")?;
                match deps.containers.check_update(&container_id).await {
                    Ok(report) => Ok(ToolOutcome::text(report)),
                    Err(err) => Ok(external_failure("check_container_update", err)),
                }
            }
        }),
    }
}

fn check_plugin_updates_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "check_plugin_updates",
        description: "Checks every plugin for available updates",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |_args: Value| {
            let deps = deps.clone();
            async move {
                match deps.plugins.check_updates().await {
                    Ok(report) => Ok(ToolOutcome::text(report)),
                    Err(err) => Ok(external_failure("check_plugin_updates", err)),
                }
            }
        }),
    }
}

fn list_vm_snapshots_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "list_vm_snapshots",
        description: "Lists a VM's snapshots",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let vm_name = required_string(&args, "vm_name")?;
                match deps.vms.list_snapshots(&vm_name).await {
                    Ok(snapshots) => Ok(ToolOutcome::Json(json!({ "snapshots": snapshots }))),
                    Err(err) => Ok(external_failure("list_vm_snapshots", err)),
                }
            }
        }),
    }
}

fn get_service_status_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "get_service_status",
        description: "Fetches one service's status",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| {
            let deps = deps.clone();
            async move {
                let service_name = required_string(&args, "service_name")?;
                match deps.services.status(&service_name).await {
                    Ok(status) => Ok(ToolOutcome::text(status)),
                    Err(err) => Ok(external_failure("get_service_status", err)),
                }
            }
        }),
    }
}

fn list_services_tool(deps: Arc<ControllerDeps>) -> Tool {
    Tool {
        name: "list_services",
        description: "Lists every known system service",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |_args: Value| {
            let deps = deps.clone();
            async move {
                match deps.services.list().await {
                    Ok(services) => Ok(ToolOutcome::Json(json!({ "services": services }))),
                    Err(err) => Ok(external_failure("list_services", err)),
                }
            }
        }),
    }
}

fn list_processes_tool() -> Tool {
    Tool {
        name: "list_processes",
        description: "Lists host processes sorted by cpu or memory",
        annotations: ToolAnnotations::read_only(),
        handler: Arc::new(move |args: Value| async move {
            let sort_by = crate::args::optional_string(&args, "sort_by").unwrap_or_else(|| "cpu".to_string());
            let limit = clamped_u64(&args, "limit", 50, 1, 1000);
            Ok(ToolOutcome::Json(json!({
                "sortBy": sort_by,
                "limit": limit,
                "processes": [],
            })))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_cache::CacheStore;
    use nexus_controllers::MockControllers;
    use nexus_hub::Hub;

    fn deps() -> (Arc<ControllerDeps>, Arc<MockControllers>) {
        let mock = Arc::new(MockControllers::new());
        let deps = Arc::new(ControllerDeps {
            containers: mock.clone(),
            vms: mock.clone(),
            array: mock.clone(),
            system: mock.clone(),
            disks: mock.clone(),
            scripts: mock.clone(),
            services: mock.clone(),
            plugins: mock.clone(),
        });
        (deps, mock)
    }

    fn collectors() -> CollectorManager {
        CollectorManager::new(Hub::new(), CacheStore::new())
    }

    async fn call(tool: &Tool, args: Value) -> String {
        tool.handler.call(args).await.unwrap().into_text_block()
    }

    // S1: container_action with an action outside the allowed set.
    #[tokio::test]
    async fn container_action_rejects_unknown_verb() {
        let (deps, mock) = deps();
        let tool = container_action_tool(deps);
        let text = call(&tool, json!({ "container_id": "c1", "action": "destroy" })).await;
        assert!(text.contains("Unknown action"), "{text}");
        assert!(mock.calls().is_empty());
    }

    // S2: array_action gated on confirm, then invoked exactly once.
    #[tokio::test]
    async fn array_action_requires_confirmation_then_invokes_once() {
        let (deps, mock) = deps();
        let tool = array_action_tool(deps.clone());

        let refusal = call(&tool, json!({ "action": "start", "confirm": false })).await;
        assert!(refusal.contains("not confirmed") || refusal.contains("confirm=true"), "{refusal}");
        assert!(mock.calls().is_empty());

        let ok = call(&tool, json!({ "action": "start", "confirm": true })).await;
        assert!(!ok.is_empty());
        assert_eq!(mock.call_count("ArrayGateway::start"), 1);
    }

    // S3: disk_spin_down validation then exactly-once invocation.
    #[tokio::test]
    async fn disk_spin_down_validates_then_invokes_once() {
        let (deps, mock) = deps();
        let tool = disk_spin_tool("disk_spin_down", deps);

        let err = call(&tool, json!({ "disk_id": "" })).await;
        assert_eq!(err, "disk_id is required");

        let ok = call(&tool, json!({ "disk_id": "disk1" })).await;
        assert!(ok.contains("disk1"));
        assert_eq!(mock.calls(), vec!["DiskGateway::spin_down disk1"]);
    }

    // S4: update_collector_interval boundary behavior.
    #[tokio::test]
    async fn update_collector_interval_boundaries() {
        let collectors = collectors();
        collectors
            .register(
                nexus_collectors::CollectorDescriptor::new(
                    "docker",
                    false,
                    30,
                    nexus_cache::well_known::CONTAINERS,
                    Arc::new(NoopProbe),
                ),
                None,
            )
            .unwrap();
        let tool = update_collector_interval_tool(collectors.clone());

        let too_low = call(&tool, json!({ "collector_name": "docker", "interval": 2 })).await;
        assert!(too_low.contains("interval must be between 5 and 3600 seconds"), "{too_low}");

        let missing_name = call(&tool, json!({ "collector_name": "", "interval": 30 })).await;
        assert_eq!(missing_name, "collector_name is required");

        let ok = call(&tool, json!({ "collector_name": "docker", "interval": 30 })).await;
        assert!(ok.contains("docker"), "{ok}");
        assert_eq!(collectors.get_status("docker").unwrap().interval_sec, 30);
    }

    // P4: the exact accepted/rejected boundary values.
    #[tokio::test]
    async fn update_collector_interval_accepts_inclusive_bounds() {
        let collectors = collectors();
        collectors
            .register(
                nexus_collectors::CollectorDescriptor::new(
                    "system",
                    true,
                    30,
                    nexus_cache::well_known::SYSTEM,
                    Arc::new(NoopProbe),
                ),
                None,
            )
            .unwrap();
        let tool = update_collector_interval_tool(collectors.clone());

        assert!(!call(&tool, json!({ "collector_name": "system", "interval": 5 }))
            .await
            .contains("must be between"));
        assert!(!call(&tool, json!({ "collector_name": "system", "interval": 3600 }))
            .await
            .contains("must be between"));
        assert!(call(&tool, json!({ "collector_name": "system", "interval": 3601 }))
            .await
            .contains("must be between"));
    }

    // P8: disabling a required collector is refused via collector_action.
    #[tokio::test]
    async fn collector_action_disable_protects_required_collector() {
        let collectors = collectors();
        collectors
            .register(
                nexus_collectors::CollectorDescriptor::new(
                    "system",
                    true,
                    30,
                    nexus_cache::well_known::SYSTEM,
                    Arc::new(NoopProbe),
                ),
                None,
            )
            .unwrap();
        let tool = collector_action_tool(collectors.clone());

        let text = call(&tool, json!({ "collector_name": "system", "action": "disable" })).await;
        assert!(text.contains("required"), "{text}");
        assert!(collectors.get_status("system").unwrap().enabled);
    }

    // P1 across every destructive tool: confirm=false refuses with no side effect.
    #[tokio::test]
    async fn every_destructive_tool_refuses_without_confirmation() {
        let (deps, mock) = deps();

        let cases: Vec<(Tool, Value)> = vec![
            (array_action_tool(deps.clone()), json!({ "action": "start" })),
            (system_power_tool("system_reboot", deps.clone()), json!({})),
            (system_power_tool("system_shutdown", deps.clone()), json!({})),
            (
                execute_user_script_tool(deps.clone()),
                json!({ "script_name": "backup.sh" }),
            ),
            (
                service_action_tool(deps.clone()),
                json!({ "service_name": "nginx", "action": "restart" }),
            ),
            (
                update_container_tool(deps.clone()),
                json!({ "container_id": "c1" }),
            ),
            (update_all_containers_tool(deps.clone()), json!({})),
            (
                update_plugin_tool(deps.clone()),
                json!({ "plugin_name": "p1" }),
            ),
            (update_all_plugins_tool(deps.clone()), json!({})),
            (
                restore_vm_snapshot_tool(deps.clone()),
                json!({ "vm_name": "vm1", "snapshot_name": "snap1" }),
            ),
            (
                clone_vm_tool(deps.clone()),
                json!({ "vm_name": "vm1", "clone_name": "vm2" }),
            ),
        ];

        for (tool, args) in cases {
            let text = call(&tool, args).await;
            assert!(
                text.contains("not confirmed") || text.contains("confirm=true"),
                "{}: {text}",
                tool.name
            );
        }
        assert!(mock.calls().is_empty());
    }

    struct NoopProbe;

    #[async_trait::async_trait]
    impl nexus_collectors::CollectorProbe for NoopProbe {
        async fn run_once(&self, _ctx: &nexus_collectors::RunContext) -> Result<Value> {
            Ok(json!({}))
        }
    }
}

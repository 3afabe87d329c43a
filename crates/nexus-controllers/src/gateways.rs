//! Controller gateway traits (spec §4, component C2).
//!
//! Each trait is a narrow capability set for one target kind, per spec §9's
//! "polymorphic controller surface" pattern: tool handlers dispatch on an
//! action enum and call exactly one narrow method, rather than routing
//! through one fat controller interface. `nexus-mcp`'s tool handlers are the
//! only callers; this crate has no opinion on argument validation, which is
//! the MCP core's job.

use async_trait::async_trait;
use nexus_core::Result;

/// Docker container lifecycle and maintenance actions.
#[async_trait]
pub trait ContainerGateway: Send + Sync {
    async fn start(&self, container_id: &str) -> Result<()>;
    async fn stop(&self, container_id: &str) -> Result<()>;
    async fn restart(&self, container_id: &str) -> Result<()>;
    async fn pause(&self, container_id: &str) -> Result<()>;
    async fn unpause(&self, container_id: &str) -> Result<()>;
    async fn logs(&self, container_id: &str) -> Result<String>;
    async fn size(&self, container_id: &str) -> Result<String>;
    async fn check_update(&self, container_id: &str) -> Result<String>;
    async fn check_all_updates(&self) -> Result<String>;
    async fn update(&self, container_id: &str) -> Result<()>;
    async fn update_all(&self) -> Result<()>;
}

/// Virtual machine lifecycle and snapshot actions.
#[async_trait]
pub trait VmGateway: Send + Sync {
    async fn start(&self, vm_name: &str) -> Result<()>;
    async fn stop(&self, vm_name: &str) -> Result<()>;
    async fn restart(&self, vm_name: &str) -> Result<()>;
    async fn pause(&self, vm_name: &str) -> Result<()>;
    async fn resume(&self, vm_name: &str) -> Result<()>;
    async fn hibernate(&self, vm_name: &str) -> Result<()>;
    async fn force_stop(&self, vm_name: &str) -> Result<()>;
    async fn create_snapshot(&self, vm_name: &str, snapshot_name: &str) -> Result<()>;
    async fn delete_snapshot(&self, vm_name: &str, snapshot_name: &str) -> Result<()>;
    async fn restore_snapshot(&self, vm_name: &str, snapshot_name: &str) -> Result<()>;
    async fn clone(&self, vm_name: &str, clone_name: &str) -> Result<()>;
    async fn list_snapshots(&self, vm_name: &str) -> Result<Vec<String>>;
}

/// Array (the storage pool as a whole) and parity-check actions.
#[async_trait]
pub trait ArrayGateway: Send + Sync {
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    async fn parity_check_start(&self, correcting: bool) -> Result<()>;
    async fn parity_check_stop(&self) -> Result<()>;
    async fn parity_check_pause(&self) -> Result<()>;
    async fn parity_check_resume(&self) -> Result<()>;
}

/// Whole-system power actions.
#[async_trait]
pub trait SystemGateway: Send + Sync {
    async fn reboot(&self) -> Result<()>;
    async fn shutdown(&self) -> Result<()>;
}

/// Individual-disk spin actions.
#[async_trait]
pub trait DiskGateway: Send + Sync {
    async fn spin_up(&self, disk_id: &str) -> Result<()>;
    async fn spin_down(&self, disk_id: &str) -> Result<()>;
}

/// User-script execution.
#[async_trait]
pub trait ScriptGateway: Send + Sync {
    async fn execute(&self, script_name: &str) -> Result<String>;
}

/// System-service (daemon) actions.
#[async_trait]
pub trait ServiceGateway: Send + Sync {
    async fn start(&self, service_name: &str) -> Result<()>;
    async fn stop(&self, service_name: &str) -> Result<()>;
    async fn restart(&self, service_name: &str) -> Result<()>;
    async fn status(&self, service_name: &str) -> Result<String>;
    async fn list(&self) -> Result<Vec<String>>;
}

/// Plugin maintenance actions.
#[async_trait]
pub trait PluginGateway: Send + Sync {
    async fn update(&self, plugin_name: &str) -> Result<()>;
    async fn update_all(&self) -> Result<()>;
    async fn check_updates(&self) -> Result<String>;
}

//! In-memory mock controllers, for tests exercising `nexus-mcp` tool
//! handlers without a live host (spec §8 scenarios S2/S3/S4: "controller.X
//! invoked exactly once").

use std::sync::Mutex;

use async_trait::async_trait;
use nexus_core::Result;

use crate::gateways::{
    ArrayGateway, ContainerGateway, DiskGateway, PluginGateway, ScriptGateway, ServiceGateway,
    SystemGateway, VmGateway,
};

/// Records every call made through it as `"<method> <args>"`, in order.
/// Every action succeeds; callers assert on `calls()` rather than on
/// return values.
#[derive(Default)]
pub struct MockControllers {
    calls: Mutex<Vec<String>>,
}

impl MockControllers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("mock call log poisoned").push(call.into());
    }
}

#[async_trait]
impl ContainerGateway for MockControllers {
    async fn start(&self, container_id: &str) -> Result<()> {
        self.record(format!("ContainerGateway::start {container_id}"));
        Ok(())
    }
    async fn stop(&self, container_id: &str) -> Result<()> {
        self.record(format!("ContainerGateway::stop {container_id}"));
        Ok(())
    }
    async fn restart(&self, container_id: &str) -> Result<()> {
        self.record(format!("ContainerGateway::restart {container_id}"));
        Ok(())
    }
    async fn pause(&self, container_id: &str) -> Result<()> {
        self.record(format!("ContainerGateway::pause {container_id}"));
        Ok(())
    }
    async fn unpause(&self, container_id: &str) -> Result<()> {
        self.record(format!("ContainerGateway::unpause {container_id}"));
        Ok(())
    }
    async fn logs(&self, container_id: &str) -> Result<String> {
        self.record(format!("ContainerGateway::logs {container_id}"));
        Ok(String::new())
    }
    async fn size(&self, container_id: &str) -> Result<String> {
        self.record(format!("ContainerGateway::size {container_id}"));
        Ok("0B".into())
    }
    async fn check_update(&self, container_id: &str) -> Result<String> {
        self.record(format!("ContainerGateway::check_update {container_id}"));
        Ok("up to date".into())
    }
    async fn check_all_updates(&self) -> Result<String> {
        self.record("ContainerGateway::check_all_updates");
        Ok("up to date".into())
    }
    async fn update(&self, container_id: &str) -> Result<()> {
        self.record(format!("ContainerGateway::update {container_id}"));
        Ok(())
    }
    async fn update_all(&self) -> Result<()> {
        self.record("ContainerGateway::update_all");
        Ok(())
    }
}

#[async_trait]
impl VmGateway for MockControllers {
    async fn start(&self, vm_name: &str) -> Result<()> {
        self.record(format!("VmGateway::start {vm_name}"));
        Ok(())
    }
    async fn stop(&self, vm_name: &str) -> Result<()> {
        self.record(format!("VmGateway::stop {vm_name}"));
        Ok(())
    }
    async fn restart(&self, vm_name: &str) -> Result<()> {
        self.record(format!("VmGateway::restart {vm_name}"));
        Ok(())
    }
    async fn pause(&self, vm_name: &str) -> Result<()> {
        self.record(format!("VmGateway::pause {vm_name}"));
        Ok(())
    }
    async fn resume(&self, vm_name: &str) -> Result<()> {
        self.record(format!("VmGateway::resume {vm_name}"));
        Ok(())
    }
    async fn hibernate(&self, vm_name: &str) -> Result<()> {
        self.record(format!("VmGateway::hibernate {vm_name}"));
        Ok(())
    }
    async fn force_stop(&self, vm_name: &str) -> Result<()> {
        self.record(format!("VmGateway::force_stop {vm_name}"));
        Ok(())
    }
    async fn create_snapshot(&self, vm_name: &str, snapshot_name: &str) -> Result<()> {
        self.record(format!("VmGateway::create_snapshot {vm_name} {snapshot_name}"));
        Ok(())
    }
    async fn delete_snapshot(&self, vm_name: &str, snapshot_name: &str) -> Result<()> {
        self.record(format!("VmGateway::delete_snapshot {vm_name} {snapshot_name}"));
        Ok(())
    }
    async fn restore_snapshot(&self, vm_name: &str, snapshot_name: &str) -> Result<()> {
        self.record(format!("VmGateway::restore_snapshot {vm_name} {snapshot_name}"));
        Ok(())
    }
    async fn clone(&self, vm_name: &str, clone_name: &str) -> Result<()> {
        self.record(format!("VmGateway::clone {vm_name} {clone_name}"));
        Ok(())
    }
    async fn list_snapshots(&self, vm_name: &str) -> Result<Vec<String>> {
        self.record(format!("VmGateway::list_snapshots {vm_name}"));
        Ok(Vec::new())
    }
}

#[async_trait]
impl ArrayGateway for MockControllers {
    async fn start(&self) -> Result<()> {
        self.record("ArrayGateway::start");
        Ok(())
    }
    async fn stop(&self) -> Result<()> {
        self.record("ArrayGateway::stop");
        Ok(())
    }
    async fn parity_check_start(&self, correcting: bool) -> Result<()> {
        self.record(format!("ArrayGateway::parity_check_start {correcting}"));
        Ok(())
    }
    async fn parity_check_stop(&self) -> Result<()> {
        self.record("ArrayGateway::parity_check_stop");
        Ok(())
    }
    async fn parity_check_pause(&self) -> Result<()> {
        self.record("ArrayGateway::parity_check_pause");
        Ok(())
    }
    async fn parity_check_resume(&self) -> Result<()> {
        self.record("ArrayGateway::parity_check_resume");
        Ok(())
    }
}

#[async_trait]
impl SystemGateway for MockControllers {
    async fn reboot(&self) -> Result<()> {
        self.record("SystemGateway::reboot");
        Ok(())
    }
    async fn shutdown(&self) -> Result<()> {
        self.record("SystemGateway::shutdown");
        Ok(())
    }
}

#[async_trait]
impl DiskGateway for MockControllers {
    async fn spin_up(&self, disk_id: &str) -> Result<()> {
        self.record(format!("DiskGateway::spin_up {disk_id}"));
        Ok(())
    }
    async fn spin_down(&self, disk_id: &str) -> Result<()> {
        self.record(format!("DiskGateway::spin_down {disk_id}"));
        Ok(())
    }
}

#[async_trait]
impl ScriptGateway for MockControllers {
    async fn execute(&self, script_name: &str) -> Result<String> {
        self.record(format!("ScriptGateway::execute {script_name}"));
        Ok(format!("script '{script_name}' completed"))
    }
}

#[async_trait]
impl ServiceGateway for MockControllers {
    async fn start(&self, service_name: &str) -> Result<()> {
        self.record(format!("ServiceGateway::start {service_name}"));
        Ok(())
    }
    async fn stop(&self, service_name: &str) -> Result<()> {
        self.record(format!("ServiceGateway::stop {service_name}"));
        Ok(())
    }
    async fn restart(&self, service_name: &str) -> Result<()> {
        self.record(format!("ServiceGateway::restart {service_name}"));
        Ok(())
    }
    async fn status(&self, service_name: &str) -> Result<String> {
        self.record(format!("ServiceGateway::status {service_name}"));
        Ok("running".into())
    }
    async fn list(&self) -> Result<Vec<String>> {
        self.record("ServiceGateway::list");
        Ok(Vec::new())
    }
}

#[async_trait]
impl PluginGateway for MockControllers {
    async fn update(&self, plugin_name: &str) -> Result<()> {
        self.record(format!("PluginGateway::update {plugin_name}"));
        Ok(())
    }
    async fn update_all(&self) -> Result<()> {
        self.record("PluginGateway::update_all");
        Ok(())
    }
    async fn check_updates(&self) -> Result<String> {
        self.record("PluginGateway::check_updates");
        Ok("up to date".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn array_start_is_recorded_exactly_once() {
        let mock = MockControllers::new();
        ArrayGateway::start(&mock).await.unwrap();
        assert_eq!(mock.call_count("ArrayGateway::start"), 1);
    }

    #[tokio::test]
    async fn disk_spin_down_records_the_disk_id() {
        let mock = MockControllers::new();
        DiskGateway::spin_down(&mock, "disk1").await.unwrap();
        assert_eq!(mock.calls(), vec!["DiskGateway::spin_down disk1"]);
    }
}

//! Wires one shared controller-gateway implementation into both C5's tool
//! handlers and C9's command dispatch.
//!
//! The concrete Docker/libvirt/array-CLI glue is explicitly out of scope
//! (spec §1: "the concrete controller actions ... are external
//! collaborators"), and `nexus-controllers` ships no implementation beyond
//! its in-memory `MockControllers` test double. Rather than invent a second,
//! equally-fake implementation for this binary, this module uses the same
//! `MockControllers` instance for both surfaces, so an MCP tool call and an
//! MQTT command against the same entity are observable on one call log.
//! Wiring a real host-facing implementation in its place is a drop-in swap
//! at this seam.

use std::sync::Arc;

use nexus_controllers::MockControllers;
use nexus_mcp::tools::ControllerDeps;
use nexus_mqtt::ControllerHandles;

pub fn mcp_deps(mock: Arc<MockControllers>) -> Arc<ControllerDeps> {
    Arc::new(ControllerDeps {
        containers: mock.clone(),
        vms: mock.clone(),
        array: mock.clone(),
        system: mock.clone(),
        disks: mock.clone(),
        scripts: mock.clone(),
        services: mock.clone(),
        plugins: mock.clone(),
    })
}

pub fn mqtt_handles(mock: Arc<MockControllers>) -> Arc<ControllerHandles> {
    Arc::new(ControllerHandles {
        containers: mock.clone(),
        vms: mock.clone(),
        array: mock.clone(),
        disks: mock.clone(),
        services: mock.clone(),
        system: mock,
    })
}

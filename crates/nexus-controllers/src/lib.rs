//! Controller gateways (spec §4, component C2): thin, narrow interfaces onto
//! host actions that `nexus-mcp` tool handlers and `nexus-mqtt`'s command
//! dispatch invoke. The concrete host-facing implementation (Docker,
//! libvirt, array CLI calls) is an external collaborator outside this
//! crate's scope; only the contract and an in-memory mock live here.

mod gateways;
mod mock;

pub use gateways::{
    ArrayGateway, ContainerGateway, DiskGateway, PluginGateway, ScriptGateway, ServiceGateway,
    SystemGateway, VmGateway,
};
pub use mock::MockControllers;

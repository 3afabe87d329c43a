//! Model Context Protocol core (C5), Streamable-HTTP transport (C6), and
//! stdio transport (C7).
//!
//! [`build_registry`] assembles the tool/resource/prompt catalogue from the
//! host's collaborators (cache, collectors, controller gateways); the
//! resulting [`McpCore`] is shared by whichever transport(s) the
//! orchestrator mounts.

mod args;
pub mod dispatch;
mod prompts;
mod protocol;
mod registry;
mod resources;
mod sse;
mod state;
pub mod tools;
pub mod transport_http;
pub mod transport_stdio;

use std::sync::Arc;

use nexus_cache::CacheStore;
use nexus_collectors::CollectorManager;
use nexus_core::Result;

pub use dispatch::McpCore;
pub use registry::{Prompt, PromptMessage, Registry, Resource, Tool, ToolAnnotations, ToolOutcome};
pub use tools::ControllerDeps;

/// Builds the full tool/resource/prompt registry (spec §4.9 step 5).
pub fn build_registry(
    cache: CacheStore,
    collectors: CollectorManager,
    controllers: Arc<ControllerDeps>,
) -> Result<Registry> {
    let mut registry = Registry::new();
    tools::register_all(&mut registry, cache.clone(), collectors, controllers)?;
    resources::register(&mut registry, cache.clone())?;
    prompts::register(&mut registry, cache)?;
    Ok(registry)
}

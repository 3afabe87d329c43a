//! The orchestrator binary's library half: CLI parsing, layered
//! configuration, collector/controller wiring, and the startup/shutdown
//! sequence (spec §4.9, component C10) that ties every other crate in this
//! workspace together into one running process.

mod cli;
mod collectors;
mod config;
mod controllers;
mod orchestrator;

pub use cli::Cli;
pub use config::AgentConfig;
pub use orchestrator::{run, RunMode};

/// Builds a `tracing` subscriber from a `RUST_LOG`-style filter string,
/// falling back to `level` when the environment variable is unset.
pub fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

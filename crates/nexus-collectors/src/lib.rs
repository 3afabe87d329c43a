//! The collector scheduler and manager (spec §4.3, component C4).
//!
//! Grounded on the pack's `alfredjeanlab/oddjobs` daemon lifecycle module
//! (`thiserror`-based errors, a registry of named units, explicit
//! start/stop) generalized from a one-shot job registry to a
//! continuously-ticking one, and on the teacher's adaptive-retry module for
//! the doubling-with-a-cap backoff shape (reimplemented here directly
//! against the spec's exact thresholds rather than reused, since the
//! teacher's version computes jittered exponential backoff for request
//! retries, a different policy than fixed-step collector backoff).

mod descriptor;
mod manager;
mod state;

pub use descriptor::{CollectorDescriptor, CollectorProbe, RunContext};
pub use manager::{CollectorManager, MAX_INTERVAL_SEC, MIN_INTERVAL_SEC};
pub use state::{CollectorState, CollectorStatus};

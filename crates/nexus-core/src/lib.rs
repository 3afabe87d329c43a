//! Shared contracts used across the NAS management agent's crates.

pub mod contract;
pub mod error;
pub mod ids;
pub mod observability;
pub mod readiness;
pub mod shutdown;

pub use contract::{CloseReason, Deadline};
pub use error::{ErrorKind, NexusError, Result};
pub use readiness::{ReadinessReceiver, ReadinessSender, ReadyState};
pub use shutdown::{ShutdownToken, ShutdownTrigger};

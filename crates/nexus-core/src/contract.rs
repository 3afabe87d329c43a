//! `Deadline` and `CloseReason`, the two small value types every shutdown
//! and timeout path in the agent shares. Adapted from the teacher's
//! `spark_core::contract` module (which expresses the same two concepts for
//! a no_std transport framework) down to a plain `std::time`-based shape,
//! since the agent always runs on tokio.

use std::time::{Duration, Instant};

/// An absolute point in time after which an operation should be abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.0
    }
}

/// Why a shutdown or close happened, carried through logs and, where a
/// transport exposes it, to the client.
#[derive(Debug, Clone)]
pub struct CloseReason {
    code: &'static str,
    message: String,
}

impl CloseReason {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn signal(name: &'static str) -> Self {
        Self::new("signal", format!("received {name}"))
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_after_zero_has_passed_immediately() {
        let deadline = Deadline::after(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(1));
        assert!(deadline.has_passed());
    }

    #[test]
    fn deadline_remaining_is_bounded_by_duration() {
        let deadline = Deadline::after(Duration::from_secs(5));
        assert!(deadline.remaining() <= Duration::from_secs(5));
    }
}

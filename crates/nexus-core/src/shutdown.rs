//! A broadcastable cancellation signal, the root of the shutdown tree spec
//! §9 describes ("a tree of cancellation tokens rooted at the orchestrator;
//! each subsystem owns its branch"). Modeled on the teacher's
//! `spark_hosting::shutdown::GracefulShutdownCoordinator`, collapsed from a
//! coordinator-plus-registry down to a single cheaply-cloned token built on
//! `tokio::sync::watch`, since every subsystem here only ever needs to ask
//! "has shutdown started" and to wait for it.

use tokio::sync::watch;

use crate::contract::CloseReason;

/// The write side. Held by the orchestrator; dropped after the one call to
/// [`ShutdownTrigger::cancel`] that matters — further calls are harmless.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger(watch::Sender<Option<CloseReason>>);

/// The read side. Cloned into every collector task, transport handler, and
/// background subsystem that must stop cooperatively.
#[derive(Debug, Clone)]
pub struct ShutdownToken(watch::Receiver<Option<CloseReason>>);

pub fn channel() -> (ShutdownTrigger, ShutdownToken) {
    let (tx, rx) = watch::channel(None);
    (ShutdownTrigger(tx), ShutdownToken(rx))
}

impl ShutdownTrigger {
    /// Broadcasts `reason` to every outstanding [`ShutdownToken`]. Idempotent:
    /// only the first call's reason is observed.
    pub fn cancel(&self, reason: CloseReason) {
        let _ = self.0.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }
}

impl ShutdownToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Resolves as soon as cancellation is triggered; resolves immediately
    /// if it already was.
    pub async fn cancelled(&mut self) -> CloseReason {
        loop {
            if let Some(reason) = self.0.borrow().clone() {
                return reason;
            }
            if self.0.changed().await.is_err() {
                return CloseReason::new("trigger_dropped", "shutdown trigger was dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let (trigger, mut token) = channel();
        assert!(!token.is_cancelled());
        trigger.cancel(CloseReason::signal("SIGTERM"));
        let reason = token.cancelled().await;
        assert_eq!(reason.code(), "signal");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn second_cancel_does_not_override_first_reason() {
        let (trigger, token) = channel();
        trigger.cancel(CloseReason::new("first", "first reason"));
        trigger.cancel(CloseReason::new("second", "second reason"));
        assert_eq!(token.0.borrow().as_ref().unwrap().code(), "first");
    }
}

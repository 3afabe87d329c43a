//! A one-shot readiness signal used by the orchestrator (spec §4.9 step 3:
//! "wait for the `Ready` signal before proceeding"). Named after the
//! teacher's `ReadyState` vocabulary in `spark_core::status::ready`, but
//! collapsed to the single transition the agent actually needs: not-ready to
//! ready, observed at most once per subscriber.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    NotReady,
    Ready,
}

/// The write side, held by whatever subsystem determines readiness (the API
/// layer, in the orchestrator's startup sequence).
#[derive(Debug, Clone)]
pub struct ReadinessSender(watch::Sender<ReadyState>);

/// The read side, held by callers that must wait for readiness.
#[derive(Debug, Clone)]
pub struct ReadinessReceiver(watch::Receiver<ReadyState>);

pub fn channel() -> (ReadinessSender, ReadinessReceiver) {
    let (tx, rx) = watch::channel(ReadyState::NotReady);
    (ReadinessSender(tx), ReadinessReceiver(rx))
}

impl ReadinessSender {
    pub fn mark_ready(&self) {
        let _ = self.0.send(ReadyState::Ready);
    }
}

impl ReadinessReceiver {
    pub fn state(&self) -> ReadyState {
        *self.0.borrow()
    }

    /// Resolves as soon as the state transitions to `Ready`; resolves
    /// immediately if it already is.
    pub async fn wait_ready(&mut self) {
        if self.state() == ReadyState::Ready {
            return;
        }
        while self.0.changed().await.is_ok() {
            if self.state() == ReadyState::Ready {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_ready_resolves_after_mark() {
        let (tx, mut rx) = channel();
        assert_eq!(rx.state(), ReadyState::NotReady);
        tx.mark_ready();
        rx.wait_ready().await;
        assert_eq!(rx.state(), ReadyState::Ready);
    }

    #[tokio::test]
    async fn wait_ready_resolves_immediately_if_already_ready() {
        let (tx, rx) = channel();
        tx.mark_ready();
        let mut rx2 = rx.clone();
        rx2.wait_ready().await;
        assert_eq!(rx2.state(), ReadyState::Ready);
    }
}

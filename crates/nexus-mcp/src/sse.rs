//! `SSEStream` (spec §3): a bounded outbox per SSE connection that silently
//! drops the newest frame on overflow rather than blocking the publisher.

use tokio::sync::mpsc;

/// Capacity of the per-stream outbox (spec: "a small constant... 100").
pub const SSE_OUTBOX_CAPACITY: usize = 100;

/// The write side: held by the transport and by the session's broadcast
/// fan-out.
#[derive(Clone)]
pub struct SseSender(mpsc::Sender<String>);

/// The read side: consumed by one writer task per SSE connection.
pub struct SseReceiver(mpsc::Receiver<String>);

pub fn channel() -> (SseSender, SseReceiver) {
    let (tx, rx) = mpsc::channel(SSE_OUTBOX_CAPACITY);
    (SseSender(tx), SseReceiver(rx))
}

impl SseSender {
    /// Enqueues `payload`. If the outbox is full, drops `payload` (the
    /// newest frame) without error, per spec's overflow policy.
    pub fn send(&self, payload: String) {
        if self.0.try_send(payload).is_err() {
            tracing::debug!("SSE outbox full; dropping frame");
        }
    }
}

impl SseReceiver {
    pub async fn recv(&mut self) -> Option<String> {
        self.0.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overflow_drops_newest_frame_without_error() {
        let (tx, mut rx) = channel();
        for i in 0..(SSE_OUTBOX_CAPACITY + 5) {
            tx.send(format!("frame-{i}"));
        }
        let first = rx.recv().await.unwrap();
        assert_eq!(first, "frame-0");
    }
}

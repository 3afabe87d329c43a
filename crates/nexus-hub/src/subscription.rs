//! Subscriber-facing stream types returned by [`crate::Hub`].

use std::any::Any;
use std::sync::Arc;

use nexus_core::{ErrorKind, NexusError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

type ErasedValue = Arc<dyn Any + Send + Sync>;

/// One message observed on a [`Subscription`]: the topic it arrived on plus
/// its still-erased payload.
pub struct HubMessage {
    pub topic: &'static str,
    pub payload: ErasedValue,
}

impl HubMessage {
    /// Downcasts the payload to `T`, returning `None` if this message came
    /// from a topic the caller didn't expect to carry `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::downcast(self.payload.clone()).ok()
    }
}

fn lag_err(topic: &str) -> NexusError {
    NexusError::new(
        ErrorKind::Transport,
        format!("subscriber to topic '{topic}' lagged and missed buffered messages"),
    )
}

/// A stream over a single topic whose items are already the concrete type
/// `T`, for callers that only ever care about one topic.
pub struct TypedSubscription<T> {
    topic: &'static str,
    inner: BroadcastStream<ErasedValue>,
    _payload: std::marker::PhantomData<T>,
}

impl<T: Send + Sync + 'static> TypedSubscription<T> {
    pub(crate) fn new(topic: &'static str, receiver: broadcast::Receiver<ErasedValue>) -> Self {
        Self {
            topic,
            inner: BroadcastStream::new(receiver),
            _payload: std::marker::PhantomData,
        }
    }

    /// Awaits the next value. A lagged receiver (spec's drop-oldest slow
    /// consumer policy) surfaces as a single `Transport` error for the gap
    /// rather than terminating the stream; callers simply call `recv` again.
    pub async fn recv(&mut self) -> Result<Arc<T>, NexusError> {
        loop {
            match self.inner.next().await {
                Some(Ok(value)) => {
                    return Arc::downcast(value).map_err(|_| {
                        NexusError::new(
                            ErrorKind::Validation,
                            format!("topic '{}' yielded an unexpected payload type", self.topic),
                        )
                    });
                }
                Some(Err(BroadcastStreamRecvError::Lagged(_))) => {
                    return Err(lag_err(self.topic));
                }
                None => {
                    return Err(NexusError::new(
                        ErrorKind::Transport,
                        format!("topic '{}' has no more publishers", self.topic),
                    ));
                }
            }
        }
    }
}

/// An interleaved stream over several topics, potentially of differing
/// payload types, delivered as [`HubMessage`] envelopes in arrival order.
pub struct Subscription {
    streams: Vec<(&'static str, BroadcastStream<ErasedValue>)>,
}

impl Subscription {
    pub(crate) fn from_receivers(
        receivers: Vec<(&'static str, broadcast::Receiver<ErasedValue>)>,
    ) -> Self {
        Self {
            streams: receivers
                .into_iter()
                .map(|(topic, rx)| (topic, BroadcastStream::new(rx)))
                .collect(),
        }
    }

    /// Awaits the next message across all subscribed topics. Topics are
    /// polled in round-robin order; a lagged topic surfaces as a `Transport`
    /// error attributed to that topic, without disturbing the others.
    pub async fn recv(&mut self) -> Result<HubMessage, NexusError> {
        use std::future::poll_fn;
        use std::task::Poll;

        poll_fn(|cx| {
            for (topic, stream) in self.streams.iter_mut() {
                match std::pin::Pin::new(stream).poll_next(cx) {
                    Poll::Ready(Some(Ok(payload))) => {
                        return Poll::Ready(Ok(HubMessage { topic, payload }))
                    }
                    Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(_)))) => {
                        return Poll::Ready(Err(lag_err(topic)))
                    }
                    Poll::Ready(None) | Poll::Pending => continue,
                }
            }
            Poll::Pending
        })
        .await
    }
}

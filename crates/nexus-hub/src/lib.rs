//! The typed event hub (spec §4.1, component C1).
//!
//! Grounded on the pack's `cashubtc/cdk` `pub_sub::Manager` (a generic
//! broadcast-by-index subscription manager over `tokio::sync::mpsc`) and on
//! `tokio::sync::broadcast`'s native "drop oldest when a receiver lags"
//! behavior, which is exactly the slow-consumer policy spec §4.1/§5
//! prescribes: a bounded per-subscriber buffer that silently drops the
//! oldest entry once full rather than blocking the publisher or the other
//! subscribers.
//!
//! A [`Topic<T>`] statically pairs a topic name with the payload type
//! published on it. [`Hub::publish`] rejects (returns an error) only when a
//! caller passes a value whose type doesn't match the type previously
//! associated with that topic name — the single failure mode spec §4.1
//! allows.

mod subscription;
mod topic;

pub use subscription::{HubMessage, Subscription};
pub use topic::{AnyTopic, Topic};

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use nexus_core::{ErrorKind, NexusError};
use tokio::sync::broadcast;

/// Capacity of each per-topic broadcast channel. Suggested by spec §4.1 as
/// "64"; once a subscriber falls this far behind, its oldest buffered value
/// is dropped in favor of the newest.
pub const SUBSCRIBER_BUFFER_CAPACITY: usize = 64;

type ErasedValue = Arc<dyn Any + Send + Sync>;

struct TopicChannel {
    type_id: TypeId,
    sender: broadcast::Sender<ErasedValue>,
}

/// The hub itself. Cheap to clone (internally `Arc`-backed via `DashMap`
/// entries holding `broadcast::Sender`, which is itself a cheap clone).
#[derive(Clone, Default)]
pub struct Hub {
    channels: Arc<DashMap<&'static str, TopicChannel>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel_for<T: Send + Sync + 'static>(
        &self,
        topic: &Topic<T>,
    ) -> Result<broadcast::Sender<ErasedValue>, NexusError> {
        self.channel_for_erased(topic.name(), TypeId::of::<T>())
    }

    fn channel_for_erased(
        &self,
        name: &'static str,
        type_id: TypeId,
    ) -> Result<broadcast::Sender<ErasedValue>, NexusError> {
        if let Some(existing) = self.channels.get(name) {
            if existing.type_id != type_id {
                return Err(NexusError::new(
                    ErrorKind::Validation,
                    format!("topic '{name}' is declared for a different payload type"),
                ));
            }
            return Ok(existing.sender.clone());
        }

        let (sender, _receiver) = broadcast::channel(SUBSCRIBER_BUFFER_CAPACITY);
        let entry = TopicChannel {
            type_id,
            sender: sender.clone(),
        };
        self.channels.insert(name, entry);
        Ok(sender)
    }

    /// Publishes `value` to every current subscriber of `topic`. Never
    /// blocks: `broadcast::Sender::send` is synchronous and only fails when
    /// there are zero subscribers, which this hub treats as a no-op rather
    /// than an error (spec §4.1: publication never propagates subscriber
    /// errors back to the publisher).
    pub fn publish<T: Send + Sync + 'static>(
        &self,
        topic: &Topic<T>,
        value: T,
    ) -> Result<(), NexusError> {
        let sender = self.channel_for(topic)?;
        let erased: ErasedValue = Arc::new(value);
        let _ = sender.send(erased);
        Ok(())
    }

    /// Subscribes to exactly one typed topic, returning a stream whose items
    /// are already the right concrete type.
    pub fn subscribe_one<T: Send + Sync + 'static>(
        &self,
        topic: &Topic<T>,
    ) -> Result<subscription::TypedSubscription<T>, NexusError> {
        let sender = self.channel_for(topic)?;
        Ok(subscription::TypedSubscription::new(
            topic.name(),
            sender.subscribe(),
        ))
    }

    /// Subscribes to several topics at once, potentially of different
    /// payload types, returning a single interleaved stream of
    /// [`HubMessage`] envelopes the caller downcasts per-message.
    pub fn subscribe_many(&self, topics: &[&dyn AnyTopic]) -> Result<Subscription, NexusError> {
        let mut receivers = Vec::with_capacity(topics.len());
        for topic in topics {
            let sender = self.channel_for_erased(topic.name(), topic.payload_type_id())?;
            receivers.push((topic.name(), sender.subscribe()));
        }
        Ok(Subscription::from_receivers(receivers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct SystemSnapshot {
        hostname: String,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct ArraySnapshot {
        state: String,
    }

    #[tokio::test]
    async fn publish_then_receive_round_trips_equal_value() {
        let hub = Hub::new();
        let topic: Topic<SystemSnapshot> = Topic::new("system");
        let mut sub = hub.subscribe_one(&topic).unwrap();

        hub.publish(
            &topic,
            SystemSnapshot {
                hostname: "tower".into(),
            },
        )
        .unwrap();

        let got = sub.recv().await.unwrap();
        assert_eq!(
            *got,
            SystemSnapshot {
                hostname: "tower".into()
            }
        );
    }

    #[tokio::test]
    async fn unsubscribed_before_publish_receives_nothing() {
        let hub = Hub::new();
        let topic: Topic<SystemSnapshot> = Topic::new("system");
        let sub = hub.subscribe_one(&topic).unwrap();
        drop(sub);

        hub.publish(
            &topic,
            SystemSnapshot {
                hostname: "tower".into(),
            },
        )
        .unwrap();

        // No receiver observed the value; publish must still succeed (no
        // subscriber is not an error).
    }

    #[tokio::test]
    async fn publish_with_mismatched_type_is_rejected() {
        let hub = Hub::new();
        let topic_a: Topic<SystemSnapshot> = Topic::new("shared");
        let _sub = hub.subscribe_one(&topic_a).unwrap();

        let topic_b: Topic<ArraySnapshot> = Topic::new("shared");
        let err = hub
            .publish(
                &topic_b,
                ArraySnapshot {
                    state: "started".into(),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn per_subscriber_delivery_is_fifo_within_a_topic() {
        let hub = Hub::new();
        let topic: Topic<u32> = Topic::new("counter");
        let mut sub = hub.subscribe_one(&topic).unwrap();

        for v in 0..5u32 {
            hub.publish(&topic, v).unwrap();
        }

        for expected in 0..5u32 {
            assert_eq!(*sub.recv().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn subscribe_many_interleaves_different_payload_types() {
        let hub = Hub::new();
        let system: Topic<SystemSnapshot> = Topic::new("system");
        let array: Topic<ArraySnapshot> = Topic::new("array");
        let mut sub = hub.subscribe_many(&[&system, &array]).unwrap();

        hub.publish(
            &system,
            SystemSnapshot {
                hostname: "tower".into(),
            },
        )
        .unwrap();
        hub.publish(
            &array,
            ArraySnapshot {
                state: "started".into(),
            },
        )
        .unwrap();

        let mut saw_system = false;
        let mut saw_array = false;
        for _ in 0..2 {
            let msg = sub.recv().await.unwrap();
            match msg.topic {
                "system" => {
                    assert_eq!(
                        *msg.downcast::<SystemSnapshot>().unwrap(),
                        SystemSnapshot {
                            hostname: "tower".into()
                        }
                    );
                    saw_system = true;
                }
                "array" => {
                    assert_eq!(
                        *msg.downcast::<ArraySnapshot>().unwrap(),
                        ArraySnapshot {
                            state: "started".into()
                        }
                    );
                    saw_array = true;
                }
                other => panic!("unexpected topic: {other}"),
            }
        }
        assert!(saw_system && saw_array);
    }
}

//! The MQTT client (spec §4.7, component C8): connect/reconnect over
//! `rumqttc`, the availability last-will, publish helpers, and status
//! counters. Modeled on the teacher's shutdown-token-driven background task
//! pattern ([`nexus_core::shutdown`]) rather than its own connection
//! machinery, since the teacher has no MQTT client of its own to imitate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use nexus_core::ShutdownToken;
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::MqttConfig;
use crate::topics;

/// Counters and timestamps spec §4.7 names: "messages sent, publish errors,
/// last-connected, last-disconnected, last-error, uptime since first
/// connect".
#[derive(Debug, Clone, Default)]
pub struct MqttStatus {
    pub messages_sent: u64,
    pub publish_errors: u64,
    pub last_connected: Option<SystemTime>,
    pub last_disconnected: Option<SystemTime>,
    pub last_error: Option<String>,
    first_connected: Option<SystemTime>,
}

impl MqttStatus {
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.first_connected.and_then(|t| SystemTime::now().duration_since(t).ok())
    }
}

/// One inbound application message, handed to whatever command dispatcher
/// subscribed via [`MqttClient::on_message`].
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

struct Inner {
    config: MqttConfig,
    client: AsyncClient,
    status: Mutex<MqttStatus>,
    connected: std::sync::atomic::AtomicBool,
    /// Bumped on every successful (re)connect. The previous cycle's spawned
    /// discovery-sweep task is aborted before a new one starts under the new
    /// generation, per spec §4.7 ("no two discovery sweeps run
    /// concurrently").
    generation: AtomicU64,
    cycle_task: Mutex<Option<JoinHandle<()>>>,
}

/// Cheaply cloned handle to the running client. Dropping every clone does
/// not stop the background event loop task; call [`MqttClient::disconnect`]
/// explicitly during shutdown.
#[derive(Clone)]
pub struct MqttClient {
    inner: std::sync::Arc<Inner>,
}

impl MqttClient {
    pub fn config(&self) -> &MqttConfig {
        &self.inner.config
    }

    pub fn status(&self) -> MqttStatus {
        self.inner.status.lock().expect("mqtt status poisoned").clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Builds the client and spawns its event-loop driver task. `on_connect`
    /// runs once per successful (re)connect, inside a task this client owns
    /// and cancels at the start of the next connect cycle; callers use it to
    /// run the discovery engine's 3-phase connect sequence. `on_message` runs
    /// inline on the driver task for every inbound `PUBLISH`; callers use it
    /// to route command-topic messages into the discovery engine's dispatch.
    pub fn connect<F, Fut, M>(config: MqttConfig, shutdown: ShutdownToken, on_connect: F, on_message: M) -> Self
    where
        F: Fn(MqttClient) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
        M: Fn(InboundMessage) + Send + Sync + 'static,
    {
        let mut options = MqttOptions::new(config.client_id.clone(), config.broker_host.clone(), config.broker_port);
        options.set_keep_alive(config.keepalive);
        options.set_connection_timeout(config.connect_timeout.as_secs());
        options.set_clean_session(config.clean_session);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }
        options.set_last_will(LastWill::new(
            topics::availability(&config.topic_prefix),
            b"offline".to_vec(),
            QoS::AtLeastOnce,
            true,
        ));

        let (client, mut eventloop) = AsyncClient::new(options, 64);

        let inner = std::sync::Arc::new(Inner {
            config,
            client,
            status: Mutex::new(MqttStatus::default()),
            connected: std::sync::atomic::AtomicBool::new(false),
            generation: AtomicU64::new(0),
            cycle_task: Mutex::new(None),
        });
        let handle = MqttClient { inner };

        let driver_handle = handle.clone();
        let mut shutdown_for_driver = shutdown.clone();
        let on_connect = std::sync::Arc::new(on_connect);
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = shutdown_for_driver.cancelled() => break,
                    event = eventloop.poll() => event,
                };
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        driver_handle.begin_connect_cycle(on_connect.clone());
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        driver_handle.mark_disconnected();
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        on_message(InboundMessage {
                            topic: publish.topic,
                            payload: publish.payload.to_vec(),
                        });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        driver_handle.mark_error(err.to_string());
                        if !driver_handle.inner.config.auto_reconnect {
                            break;
                        }
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });

        handle
    }

    fn begin_connect_cycle<F, Fut>(&self, on_connect: std::sync::Arc<F>)
    where
        F: Fn(MqttClient) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.connected.store(true, Ordering::SeqCst);
        {
            let mut status = self.inner.status.lock().expect("mqtt status poisoned");
            let now = SystemTime::now();
            status.last_connected = Some(now);
            status.first_connected.get_or_insert(now);
        }

        let mut prior = self.inner.cycle_task.lock().expect("mqtt cycle task poisoned");
        if let Some(task) = prior.take() {
            task.abort();
        }

        self.publish_raw(&topics::availability(&self.inner.config.topic_prefix), b"online".to_vec(), true);

        let handle = self.clone();
        *prior = Some(tokio::spawn(async move {
            on_connect(handle).await;
        }));
    }

    fn mark_disconnected(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.status.lock().expect("mqtt status poisoned").last_disconnected = Some(SystemTime::now());
    }

    fn mark_error(&self, message: String) {
        tracing::debug!(error = %message, "mqtt event loop error");
        let mut status = self.inner.status.lock().expect("mqtt status poisoned");
        status.publish_errors += 1;
        status.last_error = Some(message);
    }

    fn publish_raw(&self, topic: &str, payload: Vec<u8>, retain: bool) {
        if !self.inner.config.enabled {
            return;
        }
        let client = self.inner.client.clone();
        let topic = topic.to_string();
        let qos = self.inner.config.qos;
        let handle = self.clone();
        tokio::spawn(async move {
            match client.publish(topic.clone(), qos, retain, payload).await {
                Ok(()) => {
                    handle.inner.status.lock().expect("mqtt status poisoned").messages_sent += 1;
                }
                Err(err) => {
                    tracing::debug!(mqtt.topic = %topic, error = %err, "mqtt publish failed");
                    let mut status = handle.inner.status.lock().expect("mqtt status poisoned");
                    status.publish_errors += 1;
                    status.last_error = Some(err.to_string());
                }
            }
        });
    }

    /// Publishes a raw string payload. Silently does nothing if the client
    /// is disabled or not currently connected (spec §4.7).
    pub fn publish(&self, topic: &str, payload: impl Into<String>, retained: bool) {
        if !self.inner.config.enabled || !self.is_connected() {
            return;
        }
        self.publish_raw(topic, payload.into().into_bytes(), retained);
    }

    /// Publishes `value` serialized as JSON, under this client's configured
    /// retain flag.
    pub fn publish_json<T: Serialize>(&self, topic: &str, value: &T) {
        if !self.inner.config.enabled || !self.is_connected() {
            return;
        }
        match serde_json::to_vec(value) {
            Ok(bytes) => self.publish_raw(topic, bytes, self.inner.config.retain),
            Err(err) => tracing::debug!(mqtt.topic = %topic, error = %err, "failed to serialize mqtt payload"),
        }
    }

    pub async fn subscribe(&self, topic: &str, qos: QoS) {
        if let Err(err) = self.inner.client.subscribe(topic, qos).await {
            tracing::warn!(mqtt.topic = %topic, error = %err, "mqtt subscribe failed");
        }
    }

    /// Publishes `offline` to the availability topic and cancels the
    /// current connect cycle's background task. Part of the orchestrator's
    /// shutdown sequence (spec §4.9: "disconnect MQTT (publishes
    /// `offline`)").
    pub async fn disconnect(&self) {
        if self.inner.config.enabled {
            let _ = self
                .inner
                .client
                .publish(
                    topics::availability(&self.inner.config.topic_prefix),
                    QoS::AtLeastOnce,
                    true,
                    b"offline".to_vec(),
                )
                .await;
            let _ = self.inner.client.disconnect().await;
        }
        if let Some(task) = self.inner.cycle_task.lock().expect("mqtt cycle task poisoned").take() {
            task.abort();
        }
        self.mark_disconnected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_default_has_no_uptime() {
        let status = MqttStatus::default();
        assert!(status.uptime().is_none());
    }
}

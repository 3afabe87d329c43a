//! MQTT client (spec §4.7, component C8) and Home Assistant discovery engine
//! (spec §4.8, component C9).
//!
//! [`start`] wires the two together: the client's connect callback runs the
//! discovery engine's 3-phase connect sequence and spawns its per-item
//! category watchers (once, on the first successful connect); the client's
//! inbound-message callback routes every `PUBLISH` on a command topic into
//! the discovery engine's dispatcher.

mod client;
mod config;
mod discovery;
mod topics;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use nexus_cache::CacheStore;
use nexus_core::ShutdownToken;
use nexus_hub::Hub;

pub use client::{InboundMessage, MqttClient, MqttStatus};
pub use config::MqttConfig;
pub use discovery::{ControllerHandles, Device, DiscoveryEngine, EntityExtras, EntityKind};

/// Connects the MQTT client and wires it to a fresh discovery engine. Runs
/// until `shutdown` resolves; callers that want a clean `offline` publish on
/// exit should also call [`MqttClient::disconnect`] as part of their own
/// shutdown sequence (spec §4.9).
///
/// The discovery engine needs a connected [`MqttClient`] handle to build
/// (it reads the client's configured topic prefix), and the client needs the
/// engine to run its connect/message callbacks — so the engine is built
/// lazily, on the first callback invocation, from whichever `MqttClient`
/// handle that callback receives.
pub fn start(
    config: MqttConfig,
    cache: CacheStore,
    hub: Hub,
    controllers: Arc<ControllerHandles>,
    device: Device,
    shutdown: ShutdownToken,
) -> MqttClient {
    let engine_slot: Arc<OnceLock<Arc<DiscoveryEngine>>> = Arc::new(OnceLock::new());
    let watchers_started = Arc::new(AtomicBool::new(false));

    let on_connect = {
        let engine_slot = engine_slot.clone();
        let hub = hub.clone();
        let shutdown = shutdown.clone();
        let watchers_started = watchers_started.clone();
        move |client: MqttClient| {
            let engine_slot = engine_slot.clone();
            let hub = hub.clone();
            let shutdown = shutdown.clone();
            let watchers_started = watchers_started.clone();
            let cache = cache.clone();
            let controllers = controllers.clone();
            let device = device.clone();
            async move {
                let engine = engine_slot.get_or_init(|| DiscoveryEngine::new(client, cache, device, controllers));
                engine.run_connect_sequence().await;
                if !watchers_started.swap(true, Ordering::SeqCst) {
                    engine.spawn_category_watchers(hub, shutdown);
                }
            }
        }
    };

    let on_message = {
        let engine_slot = engine_slot.clone();
        move |msg: InboundMessage| {
            let Some(engine) = engine_slot.get().cloned() else {
                tracing::debug!(topic = %msg.topic, "dropping inbound mqtt message: discovery engine not yet initialized");
                return;
            };
            tokio::spawn(async move {
                engine.dispatch_command(&msg.topic, &msg.payload).await;
            });
        }
    };

    MqttClient::connect(config, shutdown, on_connect, on_message)
}

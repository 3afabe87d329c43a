//! The orchestrator (spec §4.9, component C10): the 8-step startup order,
//! signal-triggered shutdown bounded by a 30 second deadline, and the
//! stdio-mode alternative.

use std::sync::Arc;
use std::time::Duration;

use nexus_cache::CacheStore;
use nexus_collectors::CollectorManager;
use nexus_controllers::MockControllers;
use nexus_core::{CloseReason, Deadline, ShutdownTrigger};
use nexus_hub::Hub;
use nexus_mcp::McpCore;
use nexus_mqtt::{Device, MqttClient};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::task::JoinHandle;

use crate::collectors;
use crate::config::AgentConfig;
use crate::controllers;

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub enum RunMode {
    Http,
    Stdio,
}

fn host_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "nexus-agent".to_string())
}

/// Runs the agent end to end: startup, the chosen run mode, and the
/// shutdown sequence. Returns once shutdown has completed (or the 30 second
/// deadline forced a hard exit).
pub async fn run(config: AgentConfig, mode: RunMode) -> anyhow::Result<()> {
    // Step 1: hub and cache.
    let hub = Hub::new();
    let cache = CacheStore::new();

    // Step 2: collector manager and descriptors.
    let collector_manager = CollectorManager::new(hub.clone(), cache.clone());
    collectors::register_all(&collector_manager, &config.collector_intervals)?;

    // Step 3: API-layer subscriptions are an external collaborator in this
    // build (spec §1 excludes REST/WebSocket shapes), so there is nothing
    // to wait on here beyond the signal itself; a real API layer would hold
    // the sender side and call `mark_ready` once its own subscriptions are
    // live.
    let (readiness_tx, mut readiness_rx) = nexus_core::readiness::channel();
    readiness_tx.mark_ready();
    readiness_rx.wait_ready().await;

    let (shutdown_trigger, shutdown_token) = nexus_core::shutdown::channel();

    // A single shared controller-gateway implementation, used by both the
    // MCP tool handlers (step 5) and MQTT command dispatch (step 4).
    let mock_controllers = Arc::new(MockControllers::new());

    // Step 4: optional MQTT client and discovery engine.
    let mqtt_client = if config.mqtt.enabled {
        let device = Device {
            host_id: host_id(),
            manufacturer: "Nexus",
            model: "NAS Management Agent",
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        Some(nexus_mqtt::start(
            config.mqtt.clone(),
            cache.clone(),
            hub.clone(),
            controllers::mqtt_handles(mock_controllers.clone()),
            device,
            shutdown_token.clone(),
        ))
    } else {
        None
    };

    // Step 5: MCP core, tool/resource/prompt registry.
    let registry = nexus_mcp::build_registry(
        cache.clone(),
        collector_manager.clone(),
        controllers::mcp_deps(mock_controllers.clone()),
    )?;
    let mcp_core = Arc::new(McpCore::new(Arc::new(registry)));

    // Step 6: alerting/watchdog subsystems are external collaborators
    // (spec §1); they would subscribe to `hub`/`cache` the same way a real
    // API layer does. Nothing to start here.

    // Step 7: start collectors.
    collector_manager.start_all(shutdown_token.clone());

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    match mode {
        // Step 8 (HTTP mode): mount /mcp and start the HTTP server.
        RunMode::Http => {
            let app = nexus_mcp::transport_http::router(mcp_core, hub.clone());
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
            tracing::info!(port = config.http_port, "nexus-agent listening");

            let mut graceful_watch = shutdown_token.clone();
            let server_task: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        graceful_watch.cancelled().await;
                    })
                    .await
            });

            wait_for_signal(&mut sigint, &mut sigterm, &shutdown_trigger).await;
            shutdown_sequence(shutdown_trigger, mqtt_client, collector_manager, Some(server_task)).await;
        }
        // Stdio mode: skip the HTTP server and block on C7 until stdin
        // closes or a signal arrives; collectors keep running underneath.
        RunMode::Stdio => {
            let stdio = nexus_mcp::transport_stdio::StdioTransport::new(mcp_core, tokio::io::stdout());
            tokio::select! {
                _ = stdio.run(tokio::io::stdin(), shutdown_token.clone()) => {
                    tracing::info!("stdio transport closed");
                }
                _ = wait_for_signal(&mut sigint, &mut sigterm, &shutdown_trigger) => {}
            }
            shutdown_sequence(shutdown_trigger, mqtt_client, collector_manager, None).await;
        }
    }

    Ok(())
}

async fn wait_for_signal(sigint: &mut Signal, sigterm: &mut Signal, trigger: &ShutdownTrigger) {
    let reason = tokio::select! {
        _ = sigint.recv() => CloseReason::signal("SIGINT"),
        _ = sigterm.recv() => CloseReason::signal("SIGTERM"),
    };
    tracing::info!(shutdown.reason_code = reason.code(), message = reason.message(), "shutdown signal received");
    trigger.cancel(reason);
}

/// Cancel root context → disconnect MQTT (publishes `offline`) → stop
/// collectors → stop the HTTP server (if any) → wait for all of it, bounded
/// by a 30 second deadline before a hard-exit fallback (spec §4.9).
async fn shutdown_sequence(
    trigger: ShutdownTrigger,
    mqtt_client: Option<MqttClient>,
    collectors: CollectorManager,
    server_task: Option<JoinHandle<std::io::Result<()>>>,
) {
    trigger.cancel(CloseReason::new("shutdown", "orchestrator shutdown sequence started"));
    let deadline = Deadline::after(SHUTDOWN_DEADLINE);

    let work = async {
        if let Some(client) = mqtt_client {
            client.disconnect().await;
        }
        collectors.stop_all().await;
        if let Some(task) = server_task {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "http server task did not shut down cleanly");
            }
        }
    };

    if tokio::time::timeout(deadline.remaining(), work).await.is_err() {
        tracing::error!("shutdown deadline exceeded, forcing exit");
        std::process::exit(1);
    }
}

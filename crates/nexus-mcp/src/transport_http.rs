//! The Streamable-HTTP transport (spec §4.5, component C6): one endpoint,
//! four methods, session lifecycle, request↔response correlation, and SSE
//! fan-out. Built on `axum`; message classification and dispatch are shared
//! with the stdio transport via [`crate::protocol`] and [`crate::dispatch`].

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, options, post};
use axum::Router;
use futures::stream::{self, Stream, StreamExt};
use nexus_hub::{AnyTopic, Hub, Topic};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::dispatch::McpCore;
use crate::protocol::{self, RpcMessage, SUPPORTED_PROTOCOL_VERSIONS};
use crate::state::TransportState;

const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_HEADER: &str = "mcp-protocol-version";

#[derive(Clone)]
struct HttpTransport {
    core: Arc<McpCore>,
    state: Arc<TransportState>,
    hub: Hub,
}

/// Builds the router mounting the transport at `/mcp`. `hub` feeds every
/// open SSE stream's notification fan-out; the caller (C10, the
/// orchestrator) is responsible for serving the returned router.
pub fn router(core: Arc<McpCore>, hub: Hub) -> Router {
    let transport = HttpTransport {
        core,
        state: Arc::new(TransportState::new()),
        hub,
    };
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            HeaderName::from_static(SESSION_HEADER),
            HeaderName::from_static(PROTOCOL_HEADER),
            HeaderName::from_static("last-event-id"),
        ])
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route(
            "/mcp",
            options(handle_options).post(handle_post).get(handle_get).delete(handle_delete),
        )
        .layer(cors)
        .with_state(transport)
}

async fn handle_options() -> impl IntoResponse {
    StatusCode::OK
}

fn protocol_version_ok(headers: &HeaderMap) -> bool {
    match headers.get(PROTOCOL_HEADER).and_then(|v| v.to_str().ok()) {
        None => true,
        Some(version) => SUPPORTED_PROTOCOL_VERSIONS.contains(&version),
    }
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle_post(State(transport): State<HttpTransport>, headers: HeaderMap, body: Bytes) -> Response {
    if !protocol_version_ok(&headers) {
        let supported = SUPPORTED_PROTOCOL_VERSIONS.join(", ");
        return (
            StatusCode::BAD_REQUEST,
            format!("unsupported MCP-Protocol-Version; supported: {supported}"),
        )
            .into_response();
    }

    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => return (StatusCode::BAD_REQUEST, format!("invalid JSON body: {err}")).into_response(),
    };

    match protocol::classify(&value) {
        RpcMessage::Notification { .. } => StatusCode::ACCEPTED.into_response(),
        RpcMessage::Response { id, result } => {
            if let Some(slot_id) = id.as_u64().and_then(|v| u32::try_from(v).ok()) {
                transport.state.resolve_response_slot(slot_id, result);
            }
            StatusCode::ACCEPTED.into_response()
        }
        RpcMessage::Error { id, error } => {
            if let Some(slot_id) = id.as_u64().and_then(|v| u32::try_from(v).ok()) {
                transport.state.resolve_response_slot(slot_id, error);
            }
            StatusCode::ACCEPTED.into_response()
        }
        RpcMessage::Unknown => (StatusCode::BAD_REQUEST, "not a valid JSON-RPC message").into_response(),
        RpcMessage::Request { id, method, params } => {
            handle_request(&transport, &headers, id, method, params).await
        }
    }
}

async fn handle_request(
    transport: &HttpTransport,
    headers: &HeaderMap,
    id: Value,
    method: String,
    params: Value,
) -> Response {
    let is_initialize = method == "initialize";

    if !is_initialize {
        match session_header(headers) {
            Some(session_id) => {
                if !transport.state.session_exists(&session_id) {
                    return (StatusCode::NOT_FOUND, "Invalid or terminated session").into_response();
                }
            }
            None => {
                if transport.state.sole_session_id().is_none() {
                    return (StatusCode::BAD_REQUEST, "Mcp-Session-Id header is required").into_response();
                }
            }
        }
    }

    let result = transport.core.handle(&method, params).await;
    let body = match result {
        Ok(value) => protocol::ok_response(id, value),
        Err((code, message)) => protocol::err_response(id, code, message),
    };

    if is_initialize {
        let session_id = transport.state.create_session();
        let mut response = (StatusCode::OK, axum::Json(body)).into_response();
        if let Ok(value) = session_id.parse() {
            response.headers_mut().insert(HeaderName::from_static(SESSION_HEADER), value);
        }
        response
    } else {
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

/// Removes the SSE stream's registration from [`TransportState`] once the
/// client disconnects and the stream's frame source is dropped, and signals
/// this connection's hub-notification forwarder to stop.
struct SseStreamGuard {
    state: Arc<TransportState>,
    session_id: String,
    stream_id: u64,
    forwarder_cancel: Option<oneshot::Sender<()>>,
}

impl Drop for SseStreamGuard {
    fn drop(&mut self) {
        self.state.remove_stream(&self.session_id, self.stream_id);
        if let Some(cancel) = self.forwarder_cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Every hub topic an SSE connection listens on so cache/collector updates
/// reach the client as `notifications/resources/updated` frames (spec
/// §4.5/§9: the GET stream is fed by real hub traffic, not just keepalives).
fn notification_topics() -> Vec<Topic<Value>> {
    nexus_cache::WELL_KNOWN_DOMAINS.iter().map(|name| Topic::new(name)).collect()
}

/// Subscribes to every well-known hub topic and relays each publication to
/// `session_id`'s SSE streams as a JSON-RPC notification, until `cancel`
/// fires (the connection dropped) or the hub subscription itself errors out.
fn spawn_notification_forwarder(
    hub: Hub,
    state: Arc<TransportState>,
    session_id: String,
    mut cancel: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        let topics = notification_topics();
        let topic_refs: Vec<&dyn AnyTopic> = topics.iter().map(|t| t as &dyn AnyTopic).collect();
        let mut subscription = match hub.subscribe_many(&topic_refs) {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::warn!(error = %err, "SSE notification forwarder failed to subscribe to hub topics");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = &mut cancel => return,
                message = subscription.recv() => match message {
                    Ok(message) => {
                        let Some(value) = message.downcast::<Value>() else {
                            continue;
                        };
                        let notification = json!({
                            "jsonrpc": "2.0",
                            "method": "notifications/resources/updated",
                            "params": { "uri": format!("unraid://{}", message.topic), "value": &*value },
                        });
                        state.broadcast(&session_id, notification.to_string());
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "SSE notification forwarder lagged or lost its hub subscription");
                    }
                },
            }
        }
    });
}

/// Wraps a boxed event stream together with the guard that deregisters it,
/// so the guard's `Drop` runs exactly when the SSE connection ends.
struct GuardedEventStream {
    inner: std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>,
    _guard: SseStreamGuard,
}

impl Stream for GuardedEventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.inner.as_mut().poll_next(cx)
    }
}

async fn handle_get(State(transport): State<HttpTransport>, headers: HeaderMap) -> Response {
    let accepts_event_stream = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"));
    if !accepts_event_stream {
        return (StatusCode::NOT_ACCEPTABLE, "Accept: text/event-stream is required").into_response();
    }

    let Some(session_id) = session_header(&headers) else {
        return (StatusCode::NOT_FOUND, "Invalid or terminated session").into_response();
    };
    let Some((stream_id, receiver)) = transport.state.add_stream(&session_id) else {
        return (StatusCode::NOT_FOUND, "Invalid or terminated session").into_response();
    };

    let (forwarder_cancel_tx, forwarder_cancel_rx) = oneshot::channel();
    spawn_notification_forwarder(
        transport.hub.clone(),
        transport.state.clone(),
        session_id.clone(),
        forwarder_cancel_rx,
    );

    let keepalive = stream::once(async { Event::default().comment("keepalive") }).map(Ok::<_, Infallible>);
    let frames = stream::unfold(receiver, |mut rx| async move {
        rx.recv().await.map(|payload| (Event::default().event("message").data(payload), rx))
    })
    .map(Ok::<_, Infallible>);

    let guarded = GuardedEventStream {
        inner: Box::pin(keepalive.chain(frames)),
        _guard: SseStreamGuard {
            state: transport.state.clone(),
            session_id,
            stream_id,
            forwarder_cancel: Some(forwarder_cancel_tx),
        },
    };

    Sse::new(guarded).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))).into_response()
}

async fn handle_delete(State(transport): State<HttpTransport>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_header(&headers) else {
        return (StatusCode::BAD_REQUEST, "Mcp-Session-Id header is required").into_response();
    };
    if !transport.state.terminate_session(&session_id) {
        return (StatusCode::NOT_FOUND, "Invalid or terminated session").into_response();
    }
    StatusCode::OK.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use nexus_core::Result;
    use tower::ServiceExt;

    fn empty_core() -> Arc<McpCore> {
        Arc::new(McpCore::new(Arc::new(crate::registry::Registry::new())))
    }

    #[tokio::test]
    async fn options_returns_200_with_cors_headers() -> Result<()> {
        let app = router(empty_core(), Hub::new());
        let response = app
            .oneshot(Request::builder().method("OPTIONS").uri("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn put_is_method_not_allowed() {
        let app = router(empty_core(), Hub::new());
        let response = app
            .oneshot(Request::builder().method("PUT").uri("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn post_invalid_json_is_400() {
        let app = router(empty_core(), Hub::new());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_notification_is_202_with_empty_body() {
        let app = router(empty_core(), Hub::new());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn post_initialize_sets_session_header_and_subsequent_mismatch_is_404() {
        let app = router(empty_core(), Hub::new());
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(SESSION_HEADER));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .header(SESSION_HEADER, "0000000000000000000000000000ffff")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn protocol_version_other_than_supported_is_400() {
        let app = router(empty_core(), Hub::new());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .header(PROTOCOL_HEADER, "1999-01-01")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_without_event_stream_accept_is_406() {
        let app = router(empty_core(), Hub::new());
        let response = app
            .oneshot(Request::builder().method("GET").uri("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test]
    async fn delete_without_session_header_is_400() {
        let app = router(empty_core(), Hub::new());
        let response = app
            .oneshot(Request::builder().method("DELETE").uri("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

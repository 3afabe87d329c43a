//! The newline-delimited JSON stdio transport (spec §4.6, component C7).
//! Shares message classification and dispatch with the HTTP transport;
//! unlike it, there is no session concept — every line is served by the
//! same `McpCore` over one long-lived reader/writer pair.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::dispatch::McpCore;
use crate::protocol::{self, RpcMessage};

/// Serializes all writes to the underlying stream (spec: "all writes are
/// serialized") and guarantees the registered close handler runs exactly
/// once per [`StdioTransport::close`] call, however many times it's called.
pub struct StdioTransport<W> {
    core: Arc<McpCore>,
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> StdioTransport<W> {
    pub fn new(core: Arc<McpCore>, writer: W) -> Self {
        Self {
            core,
            writer: Mutex::new(writer),
        }
    }

    /// Runs the reader loop over `input` until EOF or `shutdown` resolves.
    /// Each line is classified and dispatched identically to the HTTP
    /// transport's POST handling; outbound messages are written as one
    /// JSON document followed by `\n`.
    pub async fn run<R>(&self, input: R, mut shutdown: nexus_core::ShutdownToken)
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(input).lines();
        loop {
            let next_line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("stdio transport shutting down");
                    break;
                }
                line = lines.next_line() => line,
            };

            let line = match next_line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("stdio transport reached EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!(error = %err, "stdio transport read error");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            self.handle_line(&line).await;
        }
    }

    async fn handle_line(&self, line: &str) {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed stdio line");
                return;
            }
        };

        match protocol::classify(&value) {
            RpcMessage::Notification { .. } | RpcMessage::Response { .. } | RpcMessage::Error { .. } => {
                // No response is owed for notifications, nor for replies to
                // requests this transport never sends.
            }
            RpcMessage::Unknown => {
                tracing::warn!("discarding unclassifiable stdio line");
            }
            RpcMessage::Request { id, method, params } => {
                let body = match self.core.handle(&method, params).await {
                    Ok(result) => protocol::ok_response(id, result),
                    Err((code, message)) => protocol::err_response(id, code, message),
                };
                self.write_line(&body).await;
            }
        }
    }

    async fn write_line(&self, value: &Value) {
        let Ok(mut text) = serde_json::to_string(value) else {
            tracing::error!("failed to serialize outbound stdio message");
            return;
        };
        text.push('\n');
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.write_all(text.as_bytes()).await {
            tracing::error!(error = %err, "stdio transport write error");
            return;
        }
        let _ = writer.flush().await;
    }

    /// Closes the writer side. Safe to call more than once; only the first
    /// call actually shuts the stream down, but every call is observable by
    /// the caller via its `Result`.
    pub async fn close(&self) -> std::io::Result<()> {
        self.writer.lock().await.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[tokio::test]
    async fn dispatches_one_request_per_line_and_writes_a_response() {
        let core = Arc::new(McpCore::new(Arc::new(Registry::new())));
        let mut out = Vec::new();
        {
            let transport = StdioTransport::new(core, &mut out);
            let input = std::io::Cursor::new(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n".to_vec());
            let (_trigger, token) = nexus_core::shutdown::channel();
            transport.run(input, token).await;
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"protocolVersion\""));
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let core = Arc::new(McpCore::new(Arc::new(Registry::new())));
        let mut out = Vec::new();
        let transport = StdioTransport::new(core, &mut out);
        assert!(transport.close().await.is_ok());
        assert!(transport.close().await.is_ok());
    }
}

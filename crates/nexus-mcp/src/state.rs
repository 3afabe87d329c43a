//! Transport-shared mutable state (spec §3 `MCPSession`/`ResponseSlot`,
//! §5: "Session and response-map on the MCP transport: a single mutex
//! guards all."). One [`TransportState`] is shared by the Streamable-HTTP
//! transport's POST/GET/DELETE handlers for one running process.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::sse::{self, SseReceiver, SseSender};

const RESPONSE_SLOT_SPACE: u32 = 1_000_000;

struct Session {
    initialized: bool,
    created_at: SystemTime,
    streams: HashMap<u64, SseSender>,
    next_stream_id: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            initialized: true,
            created_at: SystemTime::now(),
            streams: HashMap::new(),
            next_stream_id: 0,
        }
    }
}

struct Inner {
    sessions: HashMap<String, Session>,
    pending: HashMap<u32, oneshot::Sender<Value>>,
}

pub struct TransportState {
    inner: Mutex<Inner>,
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                pending: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("transport state poisoned")
    }

    /// Creates a new session (spec: "created on accepted `initialize`") and
    /// returns its id.
    pub fn create_session(&self) -> String {
        let id = nexus_core::ids::new_session_id();
        self.lock().sessions.insert(id.clone(), Session::new());
        id
    }

    pub fn session_exists(&self, id: &str) -> bool {
        self.lock().sessions.contains_key(id)
    }

    /// Resolves the Open-Question leniency policy: absent `Mcp-Session-Id`
    /// on a non-initialize POST is accepted only when exactly one session
    /// currently exists (see the public design note accompanying this
    /// transport), since at most one unambiguous candidate session exists
    /// to apply the request to.
    pub fn sole_session_id(&self) -> Option<String> {
        let inner = self.lock();
        let mut ids = inner.sessions.keys();
        let first = ids.next()?;
        if ids.next().is_some() {
            return None;
        }
        Some(first.clone())
    }

    /// Removes the session. Returns `true` if it existed.
    pub fn terminate_session(&self, id: &str) -> bool {
        self.lock().sessions.remove(id).is_some()
    }

    /// Registers a new SSE stream under `session_id`. Returns `None` if the
    /// session doesn't exist.
    pub fn add_stream(&self, session_id: &str) -> Option<(u64, SseReceiver)> {
        let mut inner = self.lock();
        let session = inner.sessions.get_mut(session_id)?;
        let stream_id = session.next_stream_id;
        session.next_stream_id += 1;
        let (tx, rx) = sse::channel();
        session.streams.insert(stream_id, tx);
        Some((stream_id, rx))
    }

    pub fn remove_stream(&self, session_id: &str, stream_id: u64) {
        if let Some(session) = self.lock().sessions.get_mut(session_id) {
            session.streams.remove(&stream_id);
        }
    }

    /// Fans `payload` out to every SSE stream currently open for
    /// `session_id`.
    pub fn broadcast(&self, session_id: &str, payload: String) {
        if let Some(session) = self.lock().sessions.get(session_id) {
            for sender in session.streams.values() {
                sender.send(payload.clone());
            }
        }
    }

    /// Reserves a response slot for a new outbound request, scanning
    /// `[0, 10^6)` for an unused id (spec §4.5).
    pub fn reserve_response_slot(&self) -> Option<(u32, oneshot::Receiver<Value>)> {
        let mut inner = self.lock();
        for id in 0..RESPONSE_SLOT_SPACE {
            if !inner.pending.contains_key(&id) {
                let (tx, rx) = oneshot::channel();
                inner.pending.insert(id, tx);
                return Some((id, rx));
            }
        }
        None
    }

    /// Delivers `value` to the waiter on `id`, if one is still pending.
    /// Returns `true` if a waiter received it.
    pub fn resolve_response_slot(&self, id: u32, value: Value) -> bool {
        if let Some(sender) = self.lock().pending.remove(&id) {
            sender.send(value).is_ok()
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sole_session_id_is_none_with_zero_or_multiple_sessions() {
        let state = TransportState::new();
        assert!(state.sole_session_id().is_none());
        let a = state.create_session();
        assert_eq!(state.sole_session_id(), Some(a.clone()));
        let _b = state.create_session();
        assert!(state.sole_session_id().is_none());
    }

    #[test]
    fn terminate_session_is_observable_once() {
        let state = TransportState::new();
        let id = state.create_session();
        assert!(state.terminate_session(&id));
        assert!(!state.session_exists(&id));
        assert!(!state.terminate_session(&id));
    }

    #[tokio::test]
    async fn response_slot_round_trips() {
        let state = TransportState::new();
        let (id, rx) = state.reserve_response_slot().unwrap();
        assert!(state.resolve_response_slot(id, serde_json::json!({"ok": true})));
        let value = rx.await.unwrap();
        assert_eq!(value, serde_json::json!({"ok": true}));
    }
}

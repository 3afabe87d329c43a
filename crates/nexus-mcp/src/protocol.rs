//! JSON-RPC 2.0 message classification shared by both transports (spec
//! §4.5/§4.6): "method + id → Request; method only → Notification; id +
//! result → Response; id + error → Error; else → Unknown".

use serde_json::{json, Value};

pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-03-26", "2025-06-18"];
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

#[derive(Debug, Clone)]
pub enum RpcMessage {
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    Response {
        id: Value,
        result: Value,
    },
    Error {
        id: Value,
        error: Value,
    },
    Unknown,
}

pub fn classify(value: &Value) -> RpcMessage {
    let method = value.get("method").and_then(Value::as_str).map(str::to_string);
    let id = value.get("id").cloned();
    let result = value.get("result").cloned();
    let error = value.get("error").cloned();
    let params = value.get("params").cloned().unwrap_or(Value::Null);

    match (method, id, result, error) {
        (Some(method), Some(id), _, _) => RpcMessage::Request { id, method, params },
        (Some(method), None, _, _) => RpcMessage::Notification { method, params },
        (None, Some(id), Some(result), None) => RpcMessage::Response { id, result },
        (None, Some(id), None, Some(error)) => RpcMessage::Error { id, error },
        _ => RpcMessage::Unknown,
    }
}

pub fn ok_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub fn err_response(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message.into() } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_request_notification_response_error_and_unknown() {
        assert!(matches!(
            classify(&json!({"jsonrpc":"2.0","id":1,"method":"initialize"})),
            RpcMessage::Request { .. }
        ));
        assert!(matches!(
            classify(&json!({"jsonrpc":"2.0","method":"notifications/initialized"})),
            RpcMessage::Notification { .. }
        ));
        assert!(matches!(
            classify(&json!({"jsonrpc":"2.0","id":1,"result":{}})),
            RpcMessage::Response { .. }
        ));
        assert!(matches!(
            classify(&json!({"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"bad"}})),
            RpcMessage::Error { .. }
        ));
        assert!(matches!(classify(&json!({"jsonrpc":"2.0"})), RpcMessage::Unknown));
    }
}

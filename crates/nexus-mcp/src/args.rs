//! Argument decoding helpers shared by every tool handler (spec §4.4
//! "Argument validation rules that tests must observe").

use nexus_core::{NexusError, Result};
use serde_json::Value;

/// Extracts a required string field. Empty string is treated the same as
/// missing (spec P3: "supplying an empty string produces `<field> is
/// required`").
pub fn required_string(args: &Value, field: &str) -> Result<String> {
    let value = args
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if value.is_empty() {
        return Err(NexusError::validation(format!("{field} is required")));
    }
    Ok(value)
}

pub fn optional_string(args: &Value, field: &str) -> Option<String> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads the `confirm` flag, defaulting to `false`. Used by every
/// destructive tool's confirmation gate (spec §4.4, P1).
pub fn confirm(args: &Value) -> bool {
    args.get("confirm").and_then(Value::as_bool).unwrap_or(false)
}

/// Refusal text for a destructive tool invoked without `confirm=true`. Must
/// contain the literal substring `"not confirmed"` or `"confirm=true"`
/// (spec §8 P1) — this phrasing carries both.
pub fn confirmation_required_message(action: &str) -> String {
    format!("{action} was not confirmed; pass confirm=true to proceed")
}

pub fn unknown_action_message(value: &str) -> String {
    format!("Unknown action: {value}")
}

pub fn clamped_u64(args: &Value, field: &str, default: u64, min: u64, max: u64) -> u64 {
    args.get(field)
        .and_then(Value::as_u64)
        .unwrap_or(default)
        .clamp(min, max)
}

pub fn optional_bool(args: &Value, field: &str, default: bool) -> bool {
    args.get(field).and_then(Value::as_bool).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_string_rejects_missing_and_empty() {
        let args = json!({ "disk_id": "" });
        assert!(required_string(&args, "disk_id").is_err());
        assert!(required_string(&json!({}), "disk_id").is_err());
    }

    #[test]
    fn required_string_accepts_non_empty() {
        let args = json!({ "disk_id": "disk1" });
        assert_eq!(required_string(&args, "disk_id").unwrap(), "disk1");
    }

    #[test]
    fn clamped_u64_respects_bounds() {
        assert_eq!(clamped_u64(&json!({ "limit": 5000 }), "limit", 50, 1, 1000), 1000);
        assert_eq!(clamped_u64(&json!({}), "limit", 50, 1, 1000), 50);
    }
}

//! Structured logging field-key constants, adapted from the teacher's
//! `spark_core::observability::keys` module. The teacher centralizes field
//! names so handlers across many crates emit a consistent schema instead of
//! inventing ad hoc key strings at each call site; the agent does the same
//! for its own domains (collectors, MCP tool calls, MQTT connects).
//!
//! `tracing`'s event macros accept dotted field names as literal tokens
//! (`collector.name = value`), so these constants aren't spliced into call
//! sites directly; they're the canonical spelling each crate's `tracing`
//! calls are kept in sync with by hand.

pub mod collector {
    pub const NAME: &str = "collector.name";
    pub const INTERVAL_SEC: &str = "collector.interval_sec";
    pub const CONSECUTIVE_ERRORS: &str = "collector.consecutive_errors";
    pub const STATUS: &str = "collector.status";
}

pub mod tool {
    pub const NAME: &str = "tool.name";
    pub const SUBJECT: &str = "tool.subject";
    pub const ACTION: &str = "tool.action";
}

pub mod mcp {
    pub const SESSION_ID: &str = "mcp.session_id";
    pub const METHOD: &str = "mcp.method";
    pub const PROTOCOL_VERSION: &str = "mcp.protocol_version";
}

pub mod mqtt {
    pub const TOPIC: &str = "mqtt.topic";
    pub const BROKER: &str = "mqtt.broker";
    pub const QOS: &str = "mqtt.qos";
}

pub mod shutdown {
    pub const REASON_CODE: &str = "shutdown.reason_code";
    pub const TARGET_COUNT: &str = "shutdown.target_count";
    pub const DEADLINE_MS: &str = "shutdown.deadline_ms";
}

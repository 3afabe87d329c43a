//! Layered configuration (spec §6 "Configuration keys"): built-in defaults,
//! overridden by an optional TOML file, overridden by `NEXUS__`-prefixed
//! environment variables. Mirrors the `config` crate idiom the ambient stack
//! calls for rather than a hand-rolled env/flag reader.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// The fifteen per-collector interval keys spec §6 enumerates.
pub const COLLECTOR_NAMES: [&str; 15] = [
    "system",
    "array",
    "disk",
    "docker",
    "vm",
    "ups",
    "nut",
    "gpu",
    "shares",
    "network",
    "hardware",
    "registration",
    "notification",
    "unassigned",
    "zfs",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawMqttConfig {
    enabled: bool,
    broker: String,
    client_id: String,
    username: Option<String>,
    password: Option<String>,
    topic_prefix: String,
    qos: u8,
    retain: bool,
    connect_timeout_s: u64,
    keepalive_s: u64,
    clean_session: bool,
    auto_reconnect: bool,
    home_assistant_mode: bool,
    ha_discovery_prefix: String,
}

impl Default for RawMqttConfig {
    fn default() -> Self {
        let defaults = nexus_mqtt::MqttConfig::default();
        Self {
            enabled: defaults.enabled,
            broker: format!("{}:{}", defaults.broker_host, defaults.broker_port),
            client_id: defaults.client_id,
            username: defaults.username,
            password: defaults.password,
            topic_prefix: defaults.topic_prefix,
            qos: 1,
            retain: defaults.retain,
            connect_timeout_s: defaults.connect_timeout.as_secs(),
            keepalive_s: defaults.keepalive.as_secs(),
            clean_session: defaults.clean_session,
            auto_reconnect: defaults.auto_reconnect,
            home_assistant_mode: defaults.home_assistant_mode,
            ha_discovery_prefix: defaults.ha_discovery_prefix,
        }
    }
}

fn qos_from_u8(value: u8) -> rumqttc::QoS {
    match value {
        0 => rumqttc::QoS::AtMostOnce,
        2 => rumqttc::QoS::ExactlyOnce,
        1 => rumqttc::QoS::AtLeastOnce,
        other => {
            tracing::warn!(qos = other, "unrecognized mqtt qos value, defaulting to at-least-once");
            rumqttc::QoS::AtLeastOnce
        }
    }
}

impl RawMqttConfig {
    fn into_mqtt_config(self) -> nexus_mqtt::MqttConfig {
        let (broker_host, broker_port) = nexus_mqtt::MqttConfig::parse_broker(&self.broker);
        nexus_mqtt::MqttConfig {
            enabled: self.enabled,
            broker_host,
            broker_port,
            client_id: self.client_id,
            username: self.username,
            password: self.password,
            topic_prefix: self.topic_prefix,
            qos: qos_from_u8(self.qos),
            retain: self.retain,
            connect_timeout: std::time::Duration::from_secs(self.connect_timeout_s),
            keepalive: std::time::Duration::from_secs(self.keepalive_s),
            clean_session: self.clean_session,
            auto_reconnect: self.auto_reconnect,
            home_assistant_mode: self.home_assistant_mode,
            ha_discovery_prefix: self.ha_discovery_prefix,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawConfig {
    http_port: u16,
    collectors: HashMap<String, u64>,
    mqtt: RawMqttConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            collectors: HashMap::new(),
            mqtt: RawMqttConfig::default(),
        }
    }
}

/// The orchestrator's resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub http_port: u16,
    /// Configured interval overrides, keyed by one of [`COLLECTOR_NAMES`].
    /// Unlisted names fall back to the collector's own default interval.
    pub collector_intervals: HashMap<String, u64>,
    pub mqtt: nexus_mqtt::MqttConfig,
}

impl AgentConfig {
    /// Loads defaults, then an optional TOML file at `path` (if given and
    /// present), then `NEXUS__`-prefixed environment variables, in that
    /// increasing order of precedence.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        } else {
            builder = builder.add_source(config::File::with_name("nexus-agent").required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("NEXUS").separator("__"));
        let raw: RawConfig = builder.build()?.try_deserialize()?;

        for name in raw.collectors.keys() {
            if !COLLECTOR_NAMES.contains(&name.as_str()) {
                tracing::warn!(collector = name, "ignoring interval override for unknown collector name");
            }
        }

        Ok(Self {
            http_port: raw.http_port,
            collector_intervals: raw.collectors,
            mqtt: raw.mqtt.into_mqtt_config(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_no_file_uses_defaults() {
        let config = AgentConfig::load(Some(Path::new("/nonexistent/nexus-agent.toml"))).unwrap();
        assert_eq!(config.http_port, 8080);
        assert!(!config.mqtt.enabled);
        assert_eq!(config.mqtt.topic_prefix, "unraid");
    }

    #[test]
    fn collector_names_cover_spec_list() {
        assert_eq!(COLLECTOR_NAMES.len(), 15);
    }
}

//! MQTT configuration (spec §4.7/§6 `MQTTConfig`). Static for the run: every
//! field here is read once at client construction, never mutated in place.

use std::time::Duration;

/// One configured broker endpoint, parsed out of a `host:port` (or
/// `tcp://host:port`) string. Accepting either form matches how the
/// orchestrator's config keys are documented (spec §6: "broker").
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub enabled: bool,
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub qos: rumqttc::QoS,
    pub retain: bool,
    pub connect_timeout: Duration,
    pub keepalive: Duration,
    pub clean_session: bool,
    pub auto_reconnect: bool,
    pub home_assistant_mode: bool,
    pub ha_discovery_prefix: String,
}

impl MqttConfig {
    /// Splits a `host:port` or `tcp://host:port` broker string. Defaults the
    /// port to 1883 if omitted.
    pub fn parse_broker(broker: &str) -> (String, u16) {
        let without_scheme = broker.rsplit("://").next().unwrap_or(broker);
        match without_scheme.rsplit_once(':') {
            Some((host, port)) => (
                host.to_string(),
                port.parse().unwrap_or(1883),
            ),
            None => (without_scheme.to_string(), 1883),
        }
    }

    pub fn availability_topic(&self) -> String {
        format!("{}/availability", self.topic_prefix)
    }

    pub fn command_wildcard(&self) -> String {
        format!("{}/cmd/#", self.topic_prefix)
    }
}

impl Default for MqttConfig {
    /// Disabled by default; every other field mirrors the documented
    /// defaults in spec §6 (prefix `unraid`, keepalive and timeouts picked
    /// to match common broker-side expectations).
    fn default() -> Self {
        Self {
            enabled: false,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "nexus-agent".to_string(),
            username: None,
            password: None,
            topic_prefix: "unraid".to_string(),
            qos: rumqttc::QoS::AtLeastOnce,
            retain: true,
            connect_timeout: Duration::from_secs(10),
            keepalive: Duration::from_secs(30),
            clean_session: true,
            auto_reconnect: true,
            home_assistant_mode: false,
            ha_discovery_prefix: "homeassistant".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_broker_accepts_bare_host_port() {
        assert_eq!(
            MqttConfig::parse_broker("mqtt.lan:1884"),
            ("mqtt.lan".to_string(), 1884)
        );
    }

    #[test]
    fn parse_broker_strips_scheme() {
        assert_eq!(
            MqttConfig::parse_broker("tcp://mqtt.lan:1884"),
            ("mqtt.lan".to_string(), 1884)
        );
    }

    #[test]
    fn parse_broker_defaults_port_when_missing() {
        assert_eq!(MqttConfig::parse_broker("mqtt.lan"), ("mqtt.lan".to_string(), 1883));
    }
}

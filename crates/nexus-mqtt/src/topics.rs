//! The topic space spec §6 enumerates: published state subjects, Home
//! Assistant discovery topics, and inbound command topics. Centralized here
//! so the client, discovery engine, and command dispatcher never hand-build
//! a topic string independently.

/// The four Home Assistant entity platforms spec §3's `DiscoveryEntity`
/// names. Reaping a removed item publishes an empty retained payload to its
/// discovery topic under every one of these, since the tracker doesn't
/// remember which kind it originally registered under.
pub const ENTITY_KINDS: [&str; 4] = ["sensor", "binary_sensor", "switch", "button"];

pub fn availability(prefix: &str) -> String {
    format!("{prefix}/availability")
}

pub fn system(prefix: &str) -> String {
    format!("{prefix}/system")
}

pub fn array(prefix: &str) -> String {
    format!("{prefix}/array")
}

pub fn disks(prefix: &str) -> String {
    format!("{prefix}/disks")
}

pub fn disk(prefix: &str, id: &str) -> String {
    format!("{prefix}/disk/{id}")
}

pub fn docker_containers(prefix: &str) -> String {
    format!("{prefix}/docker/containers")
}

pub fn docker(prefix: &str, name: &str) -> String {
    format!("{prefix}/docker/{name}")
}

pub fn vm_list(prefix: &str) -> String {
    format!("{prefix}/vm/list")
}

pub fn vm(prefix: &str, name: &str) -> String {
    format!("{prefix}/vm/{name}")
}

pub fn ups(prefix: &str) -> String {
    format!("{prefix}/ups")
}

pub fn gpu(prefix: &str) -> String {
    format!("{prefix}/gpu")
}

pub fn gpu_index(prefix: &str, index: &str) -> String {
    format!("{prefix}/gpu/{index}")
}

pub fn network(prefix: &str) -> String {
    format!("{prefix}/network")
}

pub fn network_iface(prefix: &str, iface: &str) -> String {
    format!("{prefix}/network/{iface}")
}

pub fn shares(prefix: &str) -> String {
    format!("{prefix}/shares")
}

pub fn share(prefix: &str, name: &str) -> String {
    format!("{prefix}/shares/{name}")
}

pub fn notifications(prefix: &str) -> String {
    format!("{prefix}/notifications")
}

pub fn zfs_pools(prefix: &str) -> String {
    format!("{prefix}/zfs/pools")
}

pub fn zfs_pool(prefix: &str, pool: &str) -> String {
    format!("{prefix}/zfs/{pool}")
}

pub fn services(prefix: &str) -> String {
    format!("{prefix}/services")
}

/// `<discoveryPrefix>/<entity-kind>/<host-id>/<entity-id>/config`.
pub fn discovery_config(discovery_prefix: &str, kind: &str, host_id: &str, entity_id: &str) -> String {
    format!("{discovery_prefix}/{kind}/{host_id}/{entity_id}/config")
}

/// `<prefix>/cmd/<category>/[<id>/]<verb>`.
pub fn command_no_id(prefix: &str, category: &str, verb: &str) -> String {
    format!("{prefix}/cmd/{category}/{verb}")
}

pub fn command_with_id(prefix: &str, category: &str, id: &str, verb: &str) -> String {
    format!("{prefix}/cmd/{category}/{id}/{verb}")
}

/// The subscribe-side wildcard for phase 3 of the connect sequence.
pub fn command_wildcard(prefix: &str) -> String {
    format!("{prefix}/cmd/#")
}

/// One command topic, split back into its `category`/`id`/`verb` parts.
/// `id` is `None` when the topic has exactly `cmd/<category>/<verb>` (no id
/// segment) as spec §6 permits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub category: &'a str,
    pub id: Option<&'a str>,
    pub verb: &'a str,
}

/// Parses a topic of the shape `<prefix>/cmd/<category>/[<id>/]<verb>`.
/// Returns `None` if `topic` doesn't start with `<prefix>/cmd/` or has too
/// few segments to contain at least a category and a verb.
pub fn parse_command<'a>(prefix: &str, topic: &'a str) -> Option<ParsedCommand<'a>> {
    let rest = topic.strip_prefix(prefix)?.strip_prefix("/cmd/")?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [category, verb] => Some(ParsedCommand {
            category,
            id: None,
            verb,
        }),
        [category, id, verb] => Some(ParsedCommand {
            category,
            id: Some(id),
            verb,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_config_matches_spec_shape() {
        assert_eq!(
            discovery_config("homeassistant", "sensor", "tower", "disk1_state"),
            "homeassistant/sensor/tower/disk1_state/config"
        );
    }

    #[test]
    fn parse_command_with_id() {
        let parsed = parse_command("unraid", "unraid/cmd/container/plex/restart").unwrap();
        assert_eq!(parsed.category, "container");
        assert_eq!(parsed.id, Some("plex"));
        assert_eq!(parsed.verb, "restart");
    }

    #[test]
    fn parse_command_without_id() {
        let parsed = parse_command("unraid", "unraid/cmd/system/reboot").unwrap();
        assert_eq!(parsed.category, "system");
        assert_eq!(parsed.id, None);
        assert_eq!(parsed.verb, "reboot");
    }

    #[test]
    fn parse_command_rejects_foreign_prefix() {
        assert!(parse_command("unraid", "other/cmd/system/reboot").is_none());
    }

    #[test]
    fn parse_command_rejects_malformed_path() {
        assert!(parse_command("unraid", "unraid/cmd/").is_none());
        assert!(parse_command("unraid", "unraid/cmd/a/b/c/d").is_none());
    }
}

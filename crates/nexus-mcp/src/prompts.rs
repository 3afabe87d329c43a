//! Prompt catalogue (spec §4.4): pure functions of cache state that embed
//! the latest JSON snapshot alongside a domain-specific analysis
//! instruction for the calling model.

use std::sync::Arc;

use nexus_cache::{well_known, CacheStore, Domain};
use serde_json::Value;

use crate::registry::{Prompt, PromptMessage, Registry};

fn snapshot_prompt(
    name: &'static str,
    description: &'static str,
    cache: CacheStore,
    domain: Domain<Value>,
    instruction: &'static str,
) -> Prompt {
    Prompt {
        name,
        description,
        handler: Arc::new(move || {
            let cache = cache.clone();
            async move {
                let snapshot = match cache.get::<Value>(&domain) {
                    Ok(Some((value, _))) => serde_json::to_string_pretty(&*value)
                        .unwrap_or_else(|_| value.to_string()),
                    _ => format!("no data has been collected for '{}' yet", domain.name()),
                };
                vec![
                    PromptMessage {
                        role: "user",
                        text: format!("Current `{}` snapshot:\n```json\n{snapshot}\n```", domain.name()),
                    },
                    PromptMessage {
                        role: "user",
                        text: instruction.to_string(),
                    },
                ]
            }
        }),
    }
}

pub fn register(registry: &mut Registry, cache: CacheStore) -> nexus_core::Result<()> {
    use well_known::*;

    registry.register_prompt(snapshot_prompt(
        "diagnose_health",
        "Reviews the health domain and flags anything that needs attention",
        cache.clone(),
        HEALTH,
        "Identify any warnings, degraded subsystems, or disk errors in this snapshot. \
         Summarize severity and suggest the next diagnostic step for each issue found.",
    ))?;
    registry.register_prompt(snapshot_prompt(
        "review_array_status",
        "Reviews array and parity state for anything abnormal",
        cache.clone(),
        ARRAY,
        "Check whether the array is in a healthy state, whether a parity check is due or \
         in progress, and call out any disk in a non-normal state.",
    ))?;
    registry.register_prompt(snapshot_prompt(
        "review_container_fleet",
        "Reviews running containers for stopped/unhealthy entries and pending updates",
        cache.clone(),
        CONTAINERS,
        "List any containers that are stopped, unhealthy, or have an update pending. \
         Note anything that looks like it stopped unexpectedly.",
    ))?;
    registry.register_prompt(snapshot_prompt(
        "review_vm_fleet",
        "Reviews VM state for anything stopped or in an error state",
        cache,
        VMS,
        "List any VMs that are stopped or in an error state, and note whether that looks \
         intentional (e.g. a maintenance shutdown) or unexpected.",
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PromptHandler;

    #[tokio::test]
    async fn prompt_embeds_instruction_and_placeholder_when_empty() {
        let cache = CacheStore::new();
        let prompt = snapshot_prompt("x", "x", cache, well_known::HEALTH, "look for problems");
        let messages = prompt.handler.build().await;
        assert_eq!(messages.len(), 2);
        assert!(messages[0].text.contains("no data has been collected"));
        assert_eq!(messages[1].text, "look for problems");
    }

    #[tokio::test]
    async fn prompt_embeds_the_latest_snapshot_json() {
        let cache = CacheStore::new();
        cache.set(&well_known::ARRAY, serde_json::json!({ "state": "started" }));
        let prompt = snapshot_prompt("x", "x", cache, well_known::ARRAY, "check it");
        let messages = prompt.handler.build().await;
        assert!(messages[0].text.contains("\"state\": \"started\""));
    }
}

//! The cache store itself (spec §4.2, component C3).

use std::any::Any;
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use nexus_core::{ErrorKind, NexusError};
use serde::Serialize;

use crate::domain::{Domain, WELL_KNOWN_DOMAINS};

type ErasedValue = Arc<dyn Any + Send + Sync>;

struct StoredEntry {
    type_id: std::any::TypeId,
    value: ErasedValue,
    json: Option<serde_json::Value>,
    updated_at: SystemTime,
}

/// One domain's state as reported by [`CacheStore::diagnostics_snapshot`]:
/// present even for domains that have never been written, so "missing" is
/// always representable rather than inferred from absence.
#[derive(Debug, Clone)]
pub struct DomainDiagnostics {
    pub domain: &'static str,
    pub last_update: Option<SystemTime>,
    pub value: Option<serde_json::Value>,
}

/// Per-domain latest-snapshot store. Each domain's entry is replaced as a
/// whole (spec: "writers replace atomically... readers never observe a torn
/// value"), which `ArcSwapOption` gives for free: a reader's `load_full`
/// always sees either the prior complete entry or the new one, never a mix.
#[derive(Clone)]
pub struct CacheStore {
    slots: Arc<DashMap<&'static str, ArcSwapOption<StoredEntry>>>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        let slots = DashMap::new();
        for &name in WELL_KNOWN_DOMAINS {
            slots.insert(name, ArcSwapOption::from(None));
        }
        Self {
            slots: Arc::new(slots),
        }
    }

    fn slot_for(&self, name: &'static str) -> dashmap::mapref::one::Ref<'_, &'static str, ArcSwapOption<StoredEntry>> {
        if self.slots.get(name).is_none() {
            self.slots.entry(name).or_insert_with(|| ArcSwapOption::from(None));
        }
        self.slots.get(name).expect("slot inserted above")
    }

    /// Replaces `domain`'s entry with `value`, stamped with the current
    /// time. Also best-effort serializes `value` to JSON for use by
    /// [`CacheStore::diagnostics_snapshot`]; a serialization failure is
    /// logged but never rejects the write (the typed value is always
    /// retrievable via [`CacheStore::get`] regardless).
    pub fn set<T: Send + Sync + Serialize + 'static>(&self, domain: &Domain<T>, value: T) {
        let json = match serde_json::to_value(&value) {
            Ok(json) => Some(json),
            Err(err) => {
                tracing::warn!(domain = domain.name(), error = %err, "failed to serialize cache entry for diagnostics");
                None
            }
        };
        let entry = Arc::new(StoredEntry {
            type_id: domain.type_id(),
            value: Arc::new(value) as ErasedValue,
            json,
            updated_at: SystemTime::now(),
        });
        self.slot_for(domain.name()).store(Some(entry));
    }

    /// Returns the latest value for `domain` plus when it was written, or
    /// `None` if the domain has never been collected.
    pub fn get<T: Send + Sync + 'static>(
        &self,
        domain: &Domain<T>,
    ) -> Result<Option<(Arc<T>, SystemTime)>, NexusError> {
        let Some(entry) = self.slot_for(domain.name()).load_full() else {
            return Ok(None);
        };
        if entry.type_id != domain.type_id() {
            return Err(NexusError::new(
                ErrorKind::Validation,
                format!("domain '{}' holds a different payload type", domain.name()),
            ));
        }
        let value: Arc<T> = Arc::downcast(entry.value.clone())
            .expect("type_id check above guarantees this downcast succeeds");
        Ok(Some((value, entry.updated_at)))
    }

    /// A bulk, type-erased view of every registered domain, used for
    /// diagnostics and for MCP resource reads that need every domain's
    /// current JSON rather than one typed value.
    pub fn diagnostics_snapshot(&self) -> Vec<DomainDiagnostics> {
        let mut out: Vec<DomainDiagnostics> = self
            .slots
            .iter()
            .map(|entry| {
                let domain = *entry.key();
                match entry.value().load_full() {
                    Some(stored) => DomainDiagnostics {
                        domain,
                        last_update: Some(stored.updated_at),
                        value: stored.json.clone(),
                    },
                    None => DomainDiagnostics {
                        domain,
                        last_update: None,
                        value: None,
                    },
                }
            })
            .collect();
        out.sort_by_key(|d| d.domain);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    struct SystemSnapshot {
        hostname: String,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    struct ArraySnapshot {
        state: String,
    }

    #[test]
    fn unwritten_domain_reads_as_missing() {
        let store = CacheStore::new();
        let system: Domain<SystemSnapshot> = Domain::new("system");
        assert!(store.get(&system).unwrap().is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let store = CacheStore::new();
        let system: Domain<SystemSnapshot> = Domain::new("system");
        store.set(
            &system,
            SystemSnapshot {
                hostname: "tower".into(),
            },
        );
        let (value, _updated_at) = store.get(&system).unwrap().unwrap();
        assert_eq!(
            *value,
            SystemSnapshot {
                hostname: "tower".into()
            }
        );
    }

    #[test]
    fn mismatched_type_on_read_is_rejected() {
        let store = CacheStore::new();
        let array_writer: Domain<ArraySnapshot> = Domain::new("shared");
        store.set(
            &array_writer,
            ArraySnapshot {
                state: "started".into(),
            },
        );
        let system_reader: Domain<SystemSnapshot> = Domain::new("shared");
        let err = store.get(&system_reader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn diagnostics_snapshot_reports_every_well_known_domain() {
        let store = CacheStore::new();
        let names: Vec<&str> = store
            .diagnostics_snapshot()
            .into_iter()
            .map(|d| d.domain)
            .collect();
        assert!(names.contains(&"system"));
        assert!(names.contains(&"zfs_arc"));
        assert!(names.contains(&"health"));
    }

    #[test]
    fn diagnostics_snapshot_distinguishes_missing_from_present() {
        let store = CacheStore::new();
        let system: Domain<SystemSnapshot> = Domain::new("system");
        store.set(
            &system,
            SystemSnapshot {
                hostname: "tower".into(),
            },
        );

        let snapshot = store.diagnostics_snapshot();
        let system_entry = snapshot.iter().find(|d| d.domain == "system").unwrap();
        assert!(system_entry.last_update.is_some());
        assert!(system_entry.value.is_some());

        let array_entry = snapshot.iter().find(|d| d.domain == "array").unwrap();
        assert!(array_entry.last_update.is_none());
        assert!(array_entry.value.is_none());
    }
}

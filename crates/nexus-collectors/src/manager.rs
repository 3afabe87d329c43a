//! The collector manager (spec §4.3): registration, staged startup, runtime
//! control, the failure/backoff policy, and bounded shutdown.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use nexus_cache::CacheStore;
use nexus_core::{ErrorKind, NexusError, Result, ShutdownToken};
use nexus_hub::{Hub, Topic};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::descriptor::{CollectorDescriptor, RunContext};
use crate::state::{CollectorState, CollectorStatus};

pub const MIN_INTERVAL_SEC: u64 = 5;
pub const MAX_INTERVAL_SEC: u64 = 3600;
const CONSECUTIVE_ERROR_THRESHOLD: u32 = 5;
const BACKOFF_CAP_MULTIPLIER: u64 = 5;
const STOP_ALL_DEADLINE: Duration = Duration::from_secs(10);

fn effective_interval_sec(base: u64, consecutive_errors: u32) -> u64 {
    let base = base.max(MIN_INTERVAL_SEC);
    if consecutive_errors < CONSECUTIVE_ERROR_THRESHOLD {
        return base;
    }
    let excess = (consecutive_errors - CONSECUTIVE_ERROR_THRESHOLD + 1).min(10);
    let doubled = base.saturating_mul(1u64 << excess.min(6));
    doubled.min(base.saturating_mul(BACKOFF_CAP_MULTIPLIER))
}

struct Entry {
    descriptor: Arc<CollectorDescriptor>,
    state: Arc<Mutex<CollectorState>>,
    enabled_tx: watch::Sender<bool>,
    enabled_rx: watch::Receiver<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Owns every registered collector's schedule. Cheap to clone (an `Arc`
/// around the registry table internally).
#[derive(Clone)]
pub struct CollectorManager {
    entries: Arc<DashMap<&'static str, Entry>>,
    hub: Hub,
    cache: CacheStore,
}

impl CollectorManager {
    pub fn new(hub: Hub, cache: CacheStore) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            hub,
            cache,
        }
    }

    /// Registers one collector. `configured_interval_sec` is this
    /// collector's entry in the configured-intervals mapping, if present;
    /// `None` falls back to the descriptor's default. An interval of `0`
    /// means disabled, per spec §3.
    pub fn register(
        &self,
        descriptor: CollectorDescriptor,
        configured_interval_sec: Option<u64>,
    ) -> Result<()> {
        if self.entries.contains_key(descriptor.name) {
            return Err(NexusError::new(
                ErrorKind::FatalStartup,
                format!("collector '{}' is already registered", descriptor.name),
            ));
        }
        let interval_sec = configured_interval_sec.unwrap_or(descriptor.default_interval_sec);
        let enabled = interval_sec > 0;
        let state = CollectorState::registered(enabled, interval_sec);
        let (enabled_tx, enabled_rx) = watch::channel(enabled);
        let name = descriptor.name;
        self.entries.insert(
            name,
            Entry {
                descriptor: Arc::new(descriptor),
                state: Arc::new(Mutex::new(state)),
                enabled_tx,
                enabled_rx,
                task: Mutex::new(None),
            },
        );
        Ok(())
    }

    /// Spawns the scheduling task for every registered collector. Each
    /// performs an immediate run, then reschedules itself every
    /// `intervalSec`. A collector registered disabled still gets a task; it
    /// blocks until `enable` is called rather than polling.
    pub fn start_all(&self, shutdown: ShutdownToken) {
        for entry in self.entries.iter() {
            let mut task_slot = entry.task.lock().expect("collector task slot poisoned");
            if task_slot.is_some() {
                continue;
            }
            let name = *entry.key();
            let descriptor = entry.descriptor.clone();
            let state = entry.state.clone();
            let enabled_rx = entry.enabled_rx.clone();
            let hub = self.hub.clone();
            let cache = self.cache.clone();
            let shutdown = shutdown.clone();
            *task_slot = Some(tokio::spawn(run_loop(
                name, descriptor, state, enabled_rx, hub, cache, shutdown,
            )));
        }
    }

    pub fn enable(&self, name: &str) -> Result<()> {
        let entry = self.get_entry(name)?;
        let mut state = entry.state.lock().expect("collector state poisoned");
        if state.enabled {
            return Ok(());
        }
        state.enabled = true;
        if state.status == CollectorStatus::Disabled {
            state.status = CollectorStatus::Idle;
        }
        drop(state);
        let _ = entry.enabled_tx.send(true);
        Ok(())
    }

    pub fn disable(&self, name: &str) -> Result<()> {
        let entry = self.get_entry(name)?;
        if entry.descriptor.required {
            return Err(NexusError::protected_resource(format!(
                "collector '{name}' is required and cannot be disabled"
            )));
        }
        let mut state = entry.state.lock().expect("collector state poisoned");
        if !state.enabled {
            return Ok(());
        }
        state.enabled = false;
        state.status = CollectorStatus::Disabled;
        drop(state);
        let _ = entry.enabled_tx.send(false);
        Ok(())
    }

    pub fn update_interval(&self, name: &str, seconds: u64) -> Result<()> {
        if !(MIN_INTERVAL_SEC..=MAX_INTERVAL_SEC).contains(&seconds) {
            return Err(NexusError::validation(format!(
                "interval must be between {MIN_INTERVAL_SEC} and {MAX_INTERVAL_SEC} seconds"
            )));
        }
        let entry = self.get_entry(name)?;
        entry.state.lock().expect("collector state poisoned").interval_sec = seconds;
        Ok(())
    }

    pub fn get_status(&self, name: &str) -> Result<CollectorState> {
        let entry = self.get_entry(name)?;
        Ok(entry.state.lock().expect("collector state poisoned").clone())
    }

    pub fn get_all(&self) -> Vec<(&'static str, CollectorState)> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    *entry.key(),
                    entry.state.lock().expect("collector state poisoned").clone(),
                )
            })
            .collect();
        out.sort_by_key(|(name, _)| *name);
        out
    }

    fn get_entry(&self, name: &str) -> Result<dashmap::mapref::one::Ref<'_, &'static str, Entry>> {
        self.entries.get(name).ok_or_else(|| {
            NexusError::validation(format!("unknown collector '{name}'"))
        })
    }

    /// Cancels every collector's schedule (via the shared shutdown token
    /// passed to `start_all`) and waits for in-flight runs to finish,
    /// bounded by a 10 second deadline. Safe to call multiple times: a
    /// collector whose task already finished is simply skipped.
    pub async fn stop_all(&self) {
        let handles: Vec<JoinHandle<()>> = self
            .entries
            .iter()
            .filter_map(|entry| entry.task.lock().expect("collector task slot poisoned").take())
            .collect();
        if handles.is_empty() {
            return;
        }
        match tokio::time::timeout(STOP_ALL_DEADLINE, futures::future::join_all(handles)).await {
            Ok(_) => tracing::info!("all collectors stopped"),
            Err(_) => tracing::warn!(
                deadline_secs = STOP_ALL_DEADLINE.as_secs(),
                "collector shutdown deadline elapsed with tasks still running"
            ),
        }
    }
}

async fn run_loop(
    name: &'static str,
    descriptor: Arc<CollectorDescriptor>,
    state: Arc<Mutex<CollectorState>>,
    mut enabled_rx: watch::Receiver<bool>,
    hub: Hub,
    cache: CacheStore,
    mut shutdown: ShutdownToken,
) {
    loop {
        while !*enabled_rx.borrow() {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                changed = enabled_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
        if shutdown.is_cancelled() {
            return;
        }

        {
            let mut st = state.lock().expect("collector state poisoned");
            st.status = CollectorStatus::Running;
        }

        let ctx = RunContext {
            hub: hub.clone(),
            cache: cache.clone(),
            shutdown: shutdown.clone(),
        };
        let result = descriptor.probe.run_once(&ctx).await;
        let now = SystemTime::now();

        {
            let mut st = state.lock().expect("collector state poisoned");
            st.last_run_at = Some(now);
            match &result {
                Ok(_) => {
                    st.last_ok_at = Some(now);
                    st.consecutive_errors = 0;
                    st.last_error = None;
                    // A run started before `disable()` landed must not stomp
                    // the `Disabled` status back to `Running` on completion.
                    st.status = if st.enabled {
                        CollectorStatus::Running
                    } else {
                        CollectorStatus::Disabled
                    };
                }
                Err(err) => {
                    st.consecutive_errors += 1;
                    st.last_error = Some(err.to_string());
                    if st.consecutive_errors >= CONSECUTIVE_ERROR_THRESHOLD {
                        st.status = CollectorStatus::Error;
                    }
                    tracing::error!(collector.name = name, error = %err, "collector run failed");
                }
            }
        }

        // Cache/hub are only ever written on a successful run (spec §4.3: a
        // failing run "does not update the cache, and does not publish").
        if let Ok(payload) = result {
            cache.set(&descriptor.domain, payload.clone());
            let topic: Topic<Value> = Topic::new(descriptor.domain.name());
            let _ = hub.publish(&topic, payload);
        }

        let sleep_secs = {
            let st = state.lock().expect("collector state poisoned");
            effective_interval_sec(st.interval_sec, st.consecutive_errors)
        };

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(sleep_secs)) => {}
            _ = shutdown.cancelled() => return,
            changed = enabled_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    struct CountingProbe {
        runs: Arc<AtomicUsize>,
        fail_first_n: usize,
    }

    #[async_trait]
    impl crate::descriptor::CollectorProbe for CountingProbe {
        async fn run_once(&self, _ctx: &RunContext) -> Result<Value> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first_n {
                return Err(NexusError::external("probe failed"));
            }
            Ok(serde_json::json!({ "run": n }))
        }
    }

    struct DelayedOkProbe {
        delay: StdDuration,
    }

    #[async_trait]
    impl crate::descriptor::CollectorProbe for DelayedOkProbe {
        async fn run_once(&self, _ctx: &RunContext) -> Result<Value> {
            tokio::time::sleep(self.delay).await;
            Ok(serde_json::json!({}))
        }
    }

    fn test_domain() -> nexus_cache::Domain<Value> {
        nexus_cache::Domain::new("test_domain")
    }

    fn manager() -> CollectorManager {
        CollectorManager::new(Hub::new(), CacheStore::new())
    }

    #[test]
    fn effective_interval_is_base_below_threshold() {
        assert_eq!(effective_interval_sec(30, 0), 30);
        assert_eq!(effective_interval_sec(30, 4), 30);
    }

    #[test]
    fn effective_interval_doubles_then_caps_at_five_times_base() {
        assert_eq!(effective_interval_sec(30, 5), 60);
        assert!(effective_interval_sec(30, 20) <= 150);
        assert_eq!(effective_interval_sec(30, 20), 150);
    }

    #[tokio::test]
    async fn disabling_a_required_collector_is_rejected() {
        let mgr = manager();
        let runs = Arc::new(AtomicUsize::new(0));
        mgr.register(
            CollectorDescriptor::new(
                "system",
                true,
                30,
                test_domain(),
                Arc::new(CountingProbe {
                    runs,
                    fail_first_n: 0,
                }),
            ),
            None,
        )
        .unwrap();

        let err = mgr.disable("system").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtectedResource);
    }

    #[tokio::test]
    async fn disabled_by_default_collector_never_ticks_until_enabled() {
        let mgr = manager();
        let runs = Arc::new(AtomicUsize::new(0));
        mgr.register(
            CollectorDescriptor::new(
                "optional",
                false,
                0,
                test_domain(),
                Arc::new(CountingProbe {
                    runs: runs.clone(),
                    fail_first_n: 0,
                }),
            ),
            None,
        )
        .unwrap();

        let (_trigger, token) = nexus_core::shutdown::channel();
        mgr.start_all(token);
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        mgr.enable("optional").unwrap();
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert!(runs.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn update_interval_rejects_out_of_range_values() {
        let mgr = manager();
        mgr.register(
            CollectorDescriptor::new(
                "system",
                false,
                30,
                test_domain(),
                Arc::new(CountingProbe {
                    runs: Arc::new(AtomicUsize::new(0)),
                    fail_first_n: 0,
                }),
            ),
            None,
        )
        .unwrap();

        assert_eq!(
            mgr.update_interval("system", 4).unwrap_err().kind(),
            ErrorKind::Validation
        );
        mgr.update_interval("system", 30).unwrap();
        assert_eq!(mgr.get_status("system").unwrap().interval_sec, 30);
    }

    #[tokio::test]
    async fn stop_all_is_idempotent() {
        let mgr = manager();
        mgr.register(
            CollectorDescriptor::new(
                "system",
                false,
                30,
                test_domain(),
                Arc::new(CountingProbe {
                    runs: Arc::new(AtomicUsize::new(0)),
                    fail_first_n: 0,
                }),
            ),
            None,
        )
        .unwrap();
        let (trigger, token) = nexus_core::shutdown::channel();
        mgr.start_all(token);
        trigger.cancel(nexus_core::CloseReason::signal("SIGTERM"));
        mgr.stop_all().await;
        mgr.stop_all().await;
    }

    // P6/§4.3: a failing run must not touch the cache or hub; a successful
    // one must write both, under the manager's own gating, not the probe's.
    #[tokio::test]
    async fn cache_and_hub_are_written_only_on_a_successful_run() {
        let hub = Hub::new();
        let cache = CacheStore::new();
        let mgr = CollectorManager::new(hub.clone(), cache.clone());

        let ok_domain: nexus_cache::Domain<Value> = nexus_cache::Domain::new("ok_domain");
        let err_domain: nexus_cache::Domain<Value> = nexus_cache::Domain::new("err_domain");

        mgr.register(
            CollectorDescriptor::new(
                "ok",
                false,
                60,
                ok_domain,
                Arc::new(CountingProbe {
                    runs: Arc::new(AtomicUsize::new(0)),
                    fail_first_n: 0,
                }),
            ),
            None,
        )
        .unwrap();
        mgr.register(
            CollectorDescriptor::new(
                "failing",
                false,
                60,
                err_domain,
                Arc::new(CountingProbe {
                    runs: Arc::new(AtomicUsize::new(0)),
                    fail_first_n: 100,
                }),
            ),
            None,
        )
        .unwrap();

        let (_trigger, token) = nexus_core::shutdown::channel();
        mgr.start_all(token);
        tokio::time::sleep(StdDuration::from_millis(50)).await;

        assert!(cache.get(&ok_domain).unwrap().is_some());
        assert!(cache.get(&err_domain).unwrap().is_none());
    }

    // A run that completes successfully after `disable()` landed mid-flight
    // must leave the collector `Disabled`, not `Running`.
    #[tokio::test]
    async fn success_after_mid_flight_disable_leaves_status_disabled() {
        let mgr = manager();
        mgr.register(
            CollectorDescriptor::new(
                "system",
                false,
                60,
                test_domain(),
                Arc::new(DelayedOkProbe {
                    delay: StdDuration::from_millis(30),
                }),
            ),
            None,
        )
        .unwrap();

        let (_trigger, token) = nexus_core::shutdown::channel();
        mgr.start_all(token);
        // The in-flight run is still sleeping; disabling now lands strictly
        // before it completes.
        mgr.disable("system").unwrap();
        tokio::time::sleep(StdDuration::from_millis(80)).await;

        assert_eq!(mgr.get_status("system").unwrap().status, CollectorStatus::Disabled);
    }

    proptest! {
        // Whatever the base interval and error streak, the effective backoff
        // interval never drops below the floor and never exceeds 5x base.
        #[test]
        fn effective_interval_stays_within_bounds(base in 0u64..=3600, errors in 0u32..=50) {
            let result = effective_interval_sec(base, errors);
            let floor = base.max(MIN_INTERVAL_SEC);
            prop_assert!(result >= MIN_INTERVAL_SEC);
            prop_assert!(result <= floor.saturating_mul(BACKOFF_CAP_MULTIPLIER));
        }

        // More consecutive failures never shortens the next retry wait.
        #[test]
        fn effective_interval_is_nondecreasing_in_consecutive_errors(base in 5u64..=3600, errors in 0u32..=49) {
            let lo = effective_interval_sec(base, errors);
            let hi = effective_interval_sec(base, errors + 1);
            prop_assert!(hi >= lo);
        }
    }
}

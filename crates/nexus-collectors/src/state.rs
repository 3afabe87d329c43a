//! `CollectorState`, the per-collector status snapshot (spec §3/§8 P6-P8).

use std::time::SystemTime;

/// `registered → running ⇄ disabled`, with a side-branch `running → error →
/// running` on recovery (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStatus {
    Idle,
    Running,
    Disabled,
    Error,
}

/// A read-only copy handed back by `GetStatus`/`GetAll`; mutating the
/// original requires going through the manager.
#[derive(Debug, Clone)]
pub struct CollectorState {
    pub enabled: bool,
    pub interval_sec: u64,
    pub last_run_at: Option<SystemTime>,
    pub last_ok_at: Option<SystemTime>,
    pub last_error: Option<String>,
    pub consecutive_errors: u32,
    pub status: CollectorStatus,
}

impl CollectorState {
    pub fn registered(enabled: bool, interval_sec: u64) -> Self {
        Self {
            enabled,
            interval_sec,
            last_run_at: None,
            last_ok_at: None,
            last_error: None,
            consecutive_errors: 0,
            status: CollectorStatus::Idle,
        }
    }
}

//! The per-domain latest-snapshot cache (spec §4.2, component C3).
//!
//! Grounded on `nexus_hub`'s `Topic`/type-erasure pattern, swapping
//! `tokio::sync::broadcast` for `arc_swap::ArcSwapOption`: a cache domain
//! holds exactly one current value rather than a stream of past ones, so an
//! atomic pointer swap is the natural replace-on-write primitive (the
//! teacher's `governance` modules use the same `arc-swap` crate for
//! configuration hot-reload).

mod domain;
mod store;

pub use domain::{well_known, Domain, WELL_KNOWN_DOMAINS};
pub use store::{CacheStore, DomainDiagnostics};

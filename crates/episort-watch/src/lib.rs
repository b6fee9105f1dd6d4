//! File-stability detection and exactly-once dispatch engine for episort.
//!
//! This crate decides when an arriving file is fully written, guards
//! against duplicate filesystem notifications so each physical file is
//! processed at most once per run, and drives both event-driven
//! dispatch and on-demand full-directory scans.

mod config;
mod copy;
mod guard;
mod probe;
mod scan;
mod service;

pub use config::{SorterConfig, SorterConfigBuilder};
pub use copy::copy_with_metadata;
pub use guard::{CallOrigin, DispatchGuard, Outcome, RejectReason, ScanMode, SkipReason};
pub use probe::StabilityProbe;
pub use scan::{ScanCoordinator, ScanSummary};
pub use service::{build_guards, WatchService};

//! On-demand full-directory scans.

use std::fs;
use std::sync::Arc;

use tracing::{info, warn};

use crate::guard::{CallOrigin, DispatchGuard, Outcome};

/// Totals for one manual scan across all guards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files copied during the scan.
    pub processed: usize,
    /// Files rejected or skipped during the scan.
    pub skipped: usize,
}

/// Runs full enumerations of every watched directory through the same
/// dispatch entry point live events use.
#[derive(Debug)]
pub struct ScanCoordinator {
    guards: Vec<Arc<DispatchGuard>>,
}

impl ScanCoordinator {
    /// Create a coordinator over the given guards.
    pub fn new(guards: Vec<Arc<DispatchGuard>>) -> Self {
        Self { guards }
    }

    /// The guards this coordinator drives.
    pub fn guards(&self) -> &[Arc<DispatchGuard>] {
        &self.guards
    }

    /// Scan every guard's source directory once.
    ///
    /// Each guard is held in scan mode while its directory is
    /// enumerated, so live events for it no-op instead of racing the
    /// scan; the mode is cleared on drop even if a dispatch panics.
    pub fn scan_all(&self) -> ScanSummary {
        info!("running manual scan on all watched folders");
        let mut summary = ScanSummary::default();

        for guard in &self.guards {
            let _mode = guard.begin_scan();

            let entries = match fs::read_dir(guard.source()) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %guard.source().display(), error = %e, "source folder unreadable");
                    continue;
                }
            };

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(path = %guard.source().display(), error = %e, "unreadable entry");
                        continue;
                    }
                };
                let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                if !is_file {
                    continue;
                }

                match guard.handle(&entry.path(), CallOrigin::Scan) {
                    Outcome::Processed { .. } => summary.processed += 1,
                    Outcome::Rejected(_) | Outcome::Skipped(_) => summary.skipped += 1,
                }
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            "manual scan complete"
        );
        summary
    }
}

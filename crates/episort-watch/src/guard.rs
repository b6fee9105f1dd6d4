//! Exactly-once dispatch of candidate files.
//!
//! One [`DispatchGuard`] exists per watched source directory. It owns
//! the set of already-processed canonical paths and serializes only the
//! membership check and insert; probing, matching, and copying run
//! outside the lock so unrelated files dispatch concurrently while the
//! same path can never be copied twice.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use episort_core::{find_match, next_episode_number, next_name, Rule};

use crate::copy::copy_with_metadata;
use crate::probe::StabilityProbe;

/// Where a [`DispatchGuard::handle`] call originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOrigin {
    /// A live filesystem notification.
    Event,
    /// The scan coordinator enumerating the directory.
    Scan,
}

/// Why a candidate was rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The canonical path was already processed this run.
    Duplicate,
    /// The filename carries a known partial-download suffix.
    TemporarySuffix,
    /// No rule matched, or the matched rule's source does not contain
    /// the file.
    NoRule,
    /// The matched rule's rename format failed to render.
    BadRenameFormat,
}

/// Why a candidate was skipped; a later notification or manual scan may
/// still process it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// A manual scan owns this guard right now.
    ScanInProgress,
    /// The stability probe gave up on the file.
    NotReady,
    /// The file disappeared before it could be examined.
    Vanished,
    /// Destination setup or the copy itself failed.
    CopyFailed,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate => write!(f, "duplicate"),
            Self::TemporarySuffix => write!(f, "temporary-suffix"),
            Self::NoRule => write!(f, "no-rule"),
            Self::BadRenameFormat => write!(f, "bad-rename-format"),
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScanInProgress => write!(f, "scan-in-progress"),
            Self::NotReady => write!(f, "not-ready"),
            Self::Vanished => write!(f, "vanished"),
            Self::CopyFailed => write!(f, "copy-failed"),
        }
    }
}

/// Outcome of dispatching one candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file was copied to `destination` and registered.
    Processed { destination: PathBuf },
    /// The file will never be processed from this notification.
    Rejected(RejectReason),
    /// The file was not processed this time but remains eligible.
    Skipped(SkipReason),
}

impl Outcome {
    /// True for `Processed`.
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }
}

#[derive(Debug, Default)]
struct GuardState {
    processed: HashSet<PathBuf>,
    in_flight: HashSet<PathBuf>,
    scanning: bool,
}

/// Per-source-directory engine enforcing at-most-once processing.
#[derive(Debug)]
pub struct DispatchGuard {
    source: PathBuf,
    rules: Vec<Rule>,
    probe: StabilityProbe,
    temp_suffixes: Vec<String>,
    state: Mutex<GuardState>,
}

impl DispatchGuard {
    /// Create a guard for one source directory and its rule subset.
    pub fn new(
        source: PathBuf,
        rules: Vec<Rule>,
        probe: StabilityProbe,
        temp_suffixes: Vec<String>,
    ) -> Self {
        Self {
            source,
            rules,
            probe,
            temp_suffixes,
            state: Mutex::new(GuardState::default()),
        }
    }

    /// The source directory this guard watches.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Whether a canonical path has already been processed this run.
    pub fn is_processed(&self, canonical: &Path) -> bool {
        self.lock_state().processed.contains(canonical)
    }

    /// Dispatch one candidate path.
    ///
    /// The dedupe check happens before any expensive work and also
    /// claims the path, closing the race where the same path arrives
    /// via both a creation and a modification notification: a second
    /// caller sees the claim and rejects while the first is still
    /// probing. Probing and copying run unlocked; a claim that does not
    /// end in `Processed` is released so later notifications can retry.
    pub fn handle(&self, path: &Path, origin: CallOrigin) -> Outcome {
        let canonical = match fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "could not canonicalize");
                return Outcome::Skipped(SkipReason::Vanished);
            }
        };

        {
            let mut state = self.lock_state();
            if state.processed.contains(&canonical) {
                return Outcome::Rejected(RejectReason::Duplicate);
            }
            if state.scanning && origin == CallOrigin::Event {
                return Outcome::Skipped(SkipReason::ScanInProgress);
            }
            if !state.in_flight.insert(canonical.clone()) {
                return Outcome::Rejected(RejectReason::Duplicate);
            }
        }

        let outcome = self.dispatch(&canonical);

        let mut state = self.lock_state();
        state.in_flight.remove(&canonical);
        if outcome.is_processed() {
            state.processed.insert(canonical);
        }
        outcome
    }

    /// Probe, match, and copy one claimed canonical path.
    fn dispatch(&self, canonical: &Path) -> Outcome {
        let file_name = match canonical.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return Outcome::Skipped(SkipReason::Vanished),
        };

        if self
            .temp_suffixes
            .iter()
            .any(|suffix| file_name.ends_with(suffix.as_str()))
        {
            return Outcome::Rejected(RejectReason::TemporarySuffix);
        }

        if !self.probe.await_ready(canonical) {
            debug!(file = %file_name, "file not ready yet");
            return Outcome::Skipped(SkipReason::NotReady);
        }

        let Some(rule) = find_match(&file_name, &self.rules) else {
            debug!(file = %file_name, "ignored or unmatched");
            return Outcome::Rejected(RejectReason::NoRule);
        };
        if !canonical.starts_with(&rule.source) {
            return Outcome::Rejected(RejectReason::NoRule);
        }

        if let Err(e) = fs::create_dir_all(&rule.destination) {
            warn!(dest = %rule.destination.display(), error = %e, "failed to create destination");
            return Outcome::Skipped(SkipReason::CopyFailed);
        }

        // Numbering is a function of destination state at dispatch
        // time: two near-simultaneous matches on the same rule can read
        // the same count and collide on a name.
        let episode = match next_episode_number(&rule.destination) {
            Ok(n) => n,
            Err(e) => {
                warn!(dest = %rule.destination.display(), error = %e, "failed to count episodes");
                return Outcome::Skipped(SkipReason::CopyFailed);
            }
        };

        let new_name = match next_name(&file_name, rule, rule.season, episode) {
            Ok(name) => name,
            Err(e) => {
                warn!(file = %file_name, error = %e, "rename format failed");
                return Outcome::Rejected(RejectReason::BadRenameFormat);
            }
        };
        let destination = rule.destination.join(&new_name);

        if let Err(e) = copy_with_metadata(canonical, &destination) {
            // Not registered as processed, so a later notification or
            // manual scan can retry.
            warn!(
                file = %file_name,
                dest = %destination.display(),
                error = %e,
                "copy failed"
            );
            return Outcome::Skipped(SkipReason::CopyFailed);
        }

        info!(file = %file_name, dest = %destination.display(), "copied");
        Outcome::Processed { destination }
    }

    /// Put this guard into scan mode. Live events are skipped until the
    /// returned handle drops, which happens even if a scan panics.
    pub fn begin_scan(&self) -> ScanMode<'_> {
        self.lock_state().scanning = true;
        ScanMode { guard: self }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, GuardState> {
        self.state.lock().expect("dispatch guard state poisoned")
    }
}

/// RAII handle holding a guard in scan mode; clears the flag on drop.
#[derive(Debug)]
pub struct ScanMode<'a> {
    guard: &'a DispatchGuard,
}

impl Drop for ScanMode<'_> {
    fn drop(&mut self) {
        self.guard.lock_state().scanning = false;
    }
}

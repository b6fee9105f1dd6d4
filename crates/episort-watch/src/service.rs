//! Event-driven watch service.
//!
//! Ties notify filesystem events to dispatch guards: one watcher per
//! distinct rule source, every create/modify event funneled through
//! [`DispatchGuard::handle`] on the blocking pool, and a manual-scan
//! channel that runs the coordinator off the event path.

use std::path::Path;
use std::sync::Arc;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use episort_core::RuleSet;

use crate::config::SorterConfig;
use crate::guard::{CallOrigin, DispatchGuard};
use crate::probe::StabilityProbe;
use crate::scan::ScanCoordinator;

/// Channel buffer for raw filesystem events.
const EVENT_CHANNEL_SIZE: usize = 256;

/// Build one dispatch guard per distinct source directory in the rule
/// set, each owning its declaration-ordered rule subset.
pub fn build_guards(rules: &RuleSet, config: &SorterConfig) -> Vec<Arc<DispatchGuard>> {
    let probe = StabilityProbe::new(config.poll_interval, config.max_attempts);
    rules
        .groups()
        .map(|(source, group)| {
            Arc::new(DispatchGuard::new(
                source.to_path_buf(),
                group.to_vec(),
                probe,
                config.temp_suffixes.clone(),
            ))
        })
        .collect()
}

/// Long-running watch loop over every rule source.
#[derive(Debug)]
pub struct WatchService {
    coordinator: Arc<ScanCoordinator>,
    cancel: CancellationToken,
}

impl WatchService {
    /// Create a service for a validated rule set.
    pub fn new(rules: &RuleSet, config: &SorterConfig) -> Self {
        Self {
            coordinator: Arc::new(ScanCoordinator::new(build_guards(rules, config))),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the watch loop when cancelled. In-flight
    /// dispatches on the blocking pool run to completion; a dispatch
    /// whose copy fails is never registered as processed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The scan coordinator shared with manual-scan callers.
    pub fn coordinator(&self) -> Arc<ScanCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Watch all sources and dispatch events until cancelled.
    ///
    /// Each `()` received on `scan_rx` triggers one full scan of every
    /// watched directory, run off the event path so a long scan never
    /// stalls event intake.
    pub async fn run(&self, mut scan_rx: mpsc::Receiver<()>) -> notify::Result<()> {
        let (event_tx, mut event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // A send error means the loop is shutting down.
            let _ = event_tx.blocking_send(res);
        })?;

        for guard in self.coordinator.guards() {
            watcher.watch(guard.source(), RecursiveMode::NonRecursive)?;
            info!(path = %guard.source().display(), "watching");
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                scan = scan_rx.recv() => match scan {
                    Some(()) => self.run_scan().await,
                    None => break,
                },
                event = event_rx.recv() => match event {
                    Some(Ok(event)) => self.dispatch_event(event),
                    Some(Err(e)) => warn!(error = %e, "watch error"),
                    None => break,
                },
            }
        }

        info!("watch loop stopped");
        Ok(())
    }

    /// Run one full scan on the blocking pool.
    async fn run_scan(&self) {
        let coordinator = Arc::clone(&self.coordinator);
        match tokio::task::spawn_blocking(move || coordinator.scan_all()).await {
            Ok(_summary) => {}
            Err(e) => error!(error = %e, "manual scan task failed"),
        }
    }

    /// Feed a filesystem event's paths to their guards.
    ///
    /// Creation and modification events are treated identically; the
    /// dedupe set makes redundant deliveries harmless.
    fn dispatch_event(&self, event: Event) {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }

        for path in event.paths {
            if path.is_dir() {
                continue;
            }
            let Some(guard) = self.guard_for(&path) else {
                continue;
            };
            let guard = Arc::clone(guard);
            tokio::task::spawn_blocking(move || {
                let outcome = guard.handle(&path, CallOrigin::Event);
                debug!(path = %path.display(), ?outcome, "event dispatched");
            });
        }
    }

    /// Watchers are non-recursive, so an event path's parent directory
    /// names its source exactly. Prefix matching would misroute a
    /// nested source's files onto whichever enclosing source happens to
    /// be declared first.
    fn guard_for(&self, path: &Path) -> Option<&Arc<DispatchGuard>> {
        let parent = path.parent()?;
        self.coordinator
            .guards()
            .iter()
            .find(|guard| guard.source() == parent)
    }
}

//! Periodic reconciliation scanner.
//!
//! On a fixed interval the scanner reads the full snapshot of the watched
//! prefix and re-applies every entry to the sink. The revision guard makes
//! those re-applies idempotent, so the scan is pure self-healing: it is the
//! sole mechanism that converges the index after follower downtime, dropped
//! events, or a process restart, and its interval is the staleness bound.
//!
//! A key that disappears from the store between scans is NOT purged here;
//! only an explicit delete event removes a document.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::store::SourceStore;
use keysync_repository::{IndexSink, UpsertRequest, WriteOutcome};

/// Lifecycle states of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    /// Waiting for the next tick.
    Idle,
    /// Snapshot read and re-apply in progress.
    Scanning,
    /// Cancellation observed; the scanner will not run again.
    Stopped,
}

/// Worker that periodically re-indexes the full prefix.
pub struct ReconciliationScanner {
    store: Arc<dyn SourceStore>,
    sink: Arc<dyn IndexSink>,
    prefix: String,
    interval: Duration,
    state_tx: watch::Sender<ScannerState>,
}

impl ReconciliationScanner {
    /// Create a new scanner for every key under `prefix`.
    pub fn new(
        store: Arc<dyn SourceStore>,
        sink: Arc<dyn IndexSink>,
        prefix: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ScannerState::Idle);

        Self {
            store,
            sink,
            prefix: prefix.into(),
            interval,
            state_tx,
        }
    }

    /// Observe the scanner's lifecycle state.
    pub fn state(&self) -> watch::Receiver<ScannerState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ScannerState) {
        self.state_tx.send_replace(state);
    }

    /// Run until `shutdown` fires.
    ///
    /// The first scan happens one full interval after start; healing is this
    /// worker's job, bootstrapping is not. A scan that overruns its interval
    /// causes the next tick to be skipped rather than queued.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), SyncError> {
        info!(
            prefix = %self.prefix,
            interval_secs = self.interval.as_secs(),
            "Starting reconciliation scanner"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Drop the tick that completes immediately on creation.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    self.set_state(ScannerState::Scanning);
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = self.scan_once() => {}
                    }
                    self.set_state(ScannerState::Idle);
                }
            }
        }

        self.set_state(ScannerState::Stopped);
        info!(prefix = %self.prefix, "Reconciliation scanner stopped");
        Ok(())
    }

    /// One full snapshot pass.
    ///
    /// A failed read is logged and abandoned until the next tick; per-entry
    /// sink failures are logged and skipped.
    async fn scan_once(&self) {
        debug!(prefix = %self.prefix, "Reconciliation tick");

        let entries = match self.store.scan(&self.prefix).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    prefix = %self.prefix,
                    error = %e,
                    "Snapshot read failed, waiting for next tick"
                );
                return;
            }
        };

        let total = entries.len();
        let mut applied = 0usize;
        let mut stale = 0usize;

        for entry in entries {
            let request = UpsertRequest {
                id: entry.key,
                body: entry.value,
                revision: entry.revision,
            };
            match self.sink.upsert(&request).await {
                Ok(WriteOutcome::Applied) => applied += 1,
                Ok(WriteOutcome::RejectedStale) => stale += 1,
                Err(e) => {
                    warn!(key = %request.id, revision = request.revision, error = %e, "Failed to re-index entry");
                }
            }
        }

        info!(
            prefix = %self.prefix,
            total = total,
            applied = applied,
            stale = stale,
            "Reconciliation scan complete"
        );
    }
}

//! Synchronization supervisor.
//!
//! Owns the follower and scanner lifecycles. Both workers are started as
//! independent tasks sharing one shutdown broadcast and one sink; the
//! supervisor never restarts a worker that exits due to cancellation, and on
//! shutdown it waits a bounded grace period for both to stop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::errors::SyncError;
use crate::follower::{ChangeFollower, FollowerState};
use crate::scanner::{ReconciliationScanner, ScannerState};

/// How long workers get to observe cancellation before shutdown is declared
/// failed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Supervisor for the two synchronization workers.
pub struct SyncSupervisor {
    follower: Arc<ChangeFollower>,
    scanner: Arc<ReconciliationScanner>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncSupervisor {
    /// Create a new supervisor owning both workers.
    pub fn new(follower: ChangeFollower, scanner: ReconciliationScanner) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            follower: Arc::new(follower),
            scanner: Arc::new(scanner),
            shutdown_tx,
        }
    }

    /// Observe the follower's lifecycle state.
    pub fn follower_state(&self) -> watch::Receiver<FollowerState> {
        self.follower.state()
    }

    /// Observe the scanner's lifecycle state.
    pub fn scanner_state(&self) -> watch::Receiver<ScannerState> {
        self.scanner.state()
    }

    /// Subscribe to the shared shutdown signal.
    ///
    /// Other long-running tasks (the HTTP server) use this to stop on the
    /// same signal as the workers.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run both workers until a shutdown signal arrives.
    ///
    /// Blocks until ctrl_c fires or [`shutdown`](Self::shutdown) is called,
    /// then waits up to the grace period for both workers to observe
    /// cancellation.
    pub async fn run(&self) -> Result<(), SyncError> {
        info!("Starting synchronization supervisor");

        let follower = Arc::clone(&self.follower);
        let follower_shutdown = self.shutdown_tx.subscribe();
        let follower_handle = tokio::spawn(async move { follower.run(follower_shutdown).await });

        let scanner = Arc::clone(&self.scanner);
        let scanner_shutdown = self.shutdown_tx.subscribe();
        let scanner_handle = tokio::spawn(async move { scanner.run(scanner_shutdown).await });

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                let _ = self.shutdown_tx.send(());
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown requested");
            }
        }

        let workers = futures::future::join(follower_handle, scanner_handle);
        match timeout(SHUTDOWN_GRACE, workers).await {
            Ok((follower_result, scanner_result)) => {
                if let Err(e) = follower_result {
                    error!(error = %e, "Follower task panicked");
                }
                if let Err(e) = scanner_result {
                    error!(error = %e, "Scanner task panicked");
                }
                info!("Supervisor shutdown complete");
                Ok(())
            }
            Err(_) => {
                warn!(
                    grace_secs = SHUTDOWN_GRACE.as_secs(),
                    "Workers did not observe cancellation within the grace period"
                );
                Err(SyncError::shutdown(
                    "workers did not stop within the grace period",
                ))
            }
        }
    }
}

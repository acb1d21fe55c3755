//! Live change-stream follower.
//!
//! Subscribes to the store's change stream and applies every event to the
//! index sink as it arrives. The follower never replays missed history: when
//! a stream dies it simply re-subscribes from the current moment after a
//! bounded backoff, and the reconciliation scanner heals whatever fell into
//! the gap. Only cancellation stops it.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::store::SourceStore;
use keysync_repository::{DeleteRequest, IndexSink, UpsertRequest, WriteOutcome};
use keysync_shared::{ChangeEvent, ChangeKind};

/// Initial re-subscribe backoff.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on the re-subscribe backoff.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Lifecycle states of the follower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerState {
    /// Not yet subscribed.
    Disconnected,
    /// Subscribe call in flight.
    Connecting,
    /// Receiving live events.
    Streaming,
    /// Stream died; waiting before re-subscribing.
    Backoff,
    /// Cancellation observed; the follower will not run again.
    Stopped,
}

/// Worker that mirrors live change events into the index sink.
pub struct ChangeFollower {
    store: Arc<dyn SourceStore>,
    sink: Arc<dyn IndexSink>,
    prefix: String,
    state_tx: watch::Sender<FollowerState>,
}

impl ChangeFollower {
    /// Create a new follower for every key under `prefix`.
    pub fn new(
        store: Arc<dyn SourceStore>,
        sink: Arc<dyn IndexSink>,
        prefix: impl Into<String>,
    ) -> Self {
        let (state_tx, _) = watch::channel(FollowerState::Disconnected);

        Self {
            store,
            sink,
            prefix: prefix.into(),
            state_tx,
        }
    }

    /// Observe the follower's lifecycle state.
    pub fn state(&self) -> watch::Receiver<FollowerState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: FollowerState) {
        self.state_tx.send_replace(state);
    }

    /// Run until `shutdown` fires.
    ///
    /// Every suspension point (subscribe, stream receive, backoff sleep) is
    /// raced against the shutdown signal, so cancellation interrupts in-flight
    /// operations rather than waiting for the next loop iteration.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), SyncError> {
        info!(prefix = %self.prefix, "Starting change follower");

        let mut backoff = INITIAL_BACKOFF;

        loop {
            self.set_state(FollowerState::Connecting);

            let subscribed = tokio::select! {
                _ = shutdown.recv() => break,
                result = self.store.watch(&self.prefix) => result,
            };

            match subscribed {
                Ok(mut stream) => {
                    self.set_state(FollowerState::Streaming);
                    info!(prefix = %self.prefix, "Change stream established");

                    let mut received_any = false;
                    let cancelled = loop {
                        tokio::select! {
                            _ = shutdown.recv() => break true,
                            event = stream.next() => match event {
                                Some(Ok(event)) => {
                                    // The stream is healthy again; future
                                    // disconnects start from a short backoff.
                                    if !received_any {
                                        received_any = true;
                                        backoff = INITIAL_BACKOFF;
                                    }
                                    self.apply(event).await;
                                }
                                Some(Err(e)) => {
                                    warn!(prefix = %self.prefix, error = %e, "Change stream error");
                                    break false;
                                }
                                None => {
                                    warn!(prefix = %self.prefix, "Change stream ended");
                                    break false;
                                }
                            }
                        }
                    };

                    if cancelled {
                        break;
                    }
                }
                Err(e) => {
                    warn!(prefix = %self.prefix, error = %e, "Failed to open change stream");
                }
            }

            self.set_state(FollowerState::Backoff);
            debug!(
                delay_secs = backoff.as_secs(),
                "Backing off before re-subscribing"
            );

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        self.set_state(FollowerState::Stopped);
        info!(prefix = %self.prefix, "Change follower stopped");
        Ok(())
    }

    /// Apply one event to the sink.
    ///
    /// Stale rejections and per-document failures are logged and swallowed;
    /// neither may abort the stream.
    async fn apply(&self, event: ChangeEvent) {
        match event.kind {
            ChangeKind::Put => {
                let request = UpsertRequest {
                    id: event.key,
                    body: event.value.unwrap_or_default(),
                    revision: event.revision,
                };
                match self.sink.upsert(&request).await {
                    Ok(WriteOutcome::Applied) => {
                        debug!(key = %request.id, revision = request.revision, "Applied put event");
                    }
                    Ok(WriteOutcome::RejectedStale) => {
                        debug!(key = %request.id, revision = request.revision, "Discarded stale put event");
                    }
                    Err(e) => {
                        warn!(key = %request.id, revision = request.revision, error = %e, "Failed to index put event");
                    }
                }
            }
            ChangeKind::Delete => {
                let request = DeleteRequest {
                    id: event.key,
                    revision: event.revision,
                };
                match self.sink.delete(&request).await {
                    Ok(WriteOutcome::Applied) => {
                        debug!(key = %request.id, revision = request.revision, "Applied delete event");
                    }
                    Ok(WriteOutcome::RejectedStale) => {
                        debug!(key = %request.id, revision = request.revision, "Discarded stale delete event");
                    }
                    Err(e) => {
                        warn!(key = %request.id, revision = request.revision, error = %e, "Failed to delete document");
                    }
                }
            }
        }
    }
}

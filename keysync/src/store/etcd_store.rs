//! etcd-backed source store client.
//!
//! Thin adapter from the etcd v3 API onto the [`SourceStore`] contract: a
//! prefix watch becomes the change stream (mod revisions are the revision
//! stamps), a prefix get becomes the snapshot read. Reads go through etcd's
//! default linearizable path, so a partitioned replica cannot serve them.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{
    Client, ConnectOptions, Event, EventType, GetOptions, WatchOptions, WatchStream, Watcher,
};
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::store::{ChangeStream, SourceStore};
use keysync_shared::{ChangeEvent, Entry};

/// Dial timeout for the initial connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Source store client backed by an etcd cluster.
pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    /// Connect to the cluster.
    ///
    /// # Arguments
    ///
    /// * `endpoints` - Cluster endpoints to dial
    /// * `credentials` - Optional `(username, password)` pair
    ///
    /// # Returns
    ///
    /// * `Ok(EtcdStore)` - A connected client
    /// * `Err(SyncError)` - If the cluster cannot be reached
    pub async fn connect(
        endpoints: Vec<String>,
        credentials: Option<(String, String)>,
    ) -> Result<Self, SyncError> {
        let mut options = ConnectOptions::new().with_connect_timeout(CONNECT_TIMEOUT);
        if let Some((username, password)) = credentials {
            options = options.with_user(username, password);
        }

        let client = Client::connect(endpoints.clone(), Some(options)).await?;
        info!(endpoints = ?endpoints, "Connected to source store");

        Ok(Self { client })
    }
}

/// Owns the server-side watch for as long as the change stream is alive;
/// dropping the watcher cancels the watch.
struct WatchSession {
    _watcher: Watcher,
    stream: WatchStream,
    pending: VecDeque<Result<ChangeEvent, SyncError>>,
    failed: bool,
}

fn change_from_event(event: &Event) -> Option<ChangeEvent> {
    let kv = event.kv()?;
    let key = String::from_utf8_lossy(kv.key()).into_owned();
    let revision = kv.mod_revision() as u64;

    match event.event_type() {
        EventType::Put => Some(ChangeEvent::put(key, kv.value().to_vec(), revision)),
        EventType::Delete => Some(ChangeEvent::delete(key, revision)),
    }
}

#[async_trait]
impl SourceStore for EtcdStore {
    async fn watch(&self, prefix: &str) -> Result<ChangeStream, SyncError> {
        let mut client = self.client.clone();
        let (watcher, stream) = client
            .watch(prefix, Some(WatchOptions::new().with_prefix()))
            .await?;

        debug!(prefix = %prefix, "Opened watch stream");

        let session = WatchSession {
            _watcher: watcher,
            stream,
            pending: VecDeque::new(),
            failed: false,
        };

        // Flatten watch responses into single events; terminate after the
        // first transport error so the follower re-subscribes.
        let stream = futures::stream::unfold(session, |mut session| async move {
            loop {
                if let Some(item) = session.pending.pop_front() {
                    return Some((item, session));
                }
                if session.failed {
                    return None;
                }

                match session.stream.message().await {
                    Ok(Some(response)) => {
                        if response.canceled() {
                            warn!(
                                reason = %response.cancel_reason(),
                                "Watch canceled by the store"
                            );
                            return None;
                        }
                        for event in response.events() {
                            if let Some(change) = change_from_event(event) {
                                session.pending.push_back(Ok(change));
                            }
                        }
                    }
                    Ok(None) => return None,
                    Err(e) => {
                        session.pending.push_back(Err(SyncError::from(e)));
                        session.failed = true;
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<Entry>, SyncError> {
        let mut client = self.client.clone();
        let response = client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await?;

        let entries = response
            .kvs()
            .iter()
            .map(|kv| {
                Entry::new(
                    String::from_utf8_lossy(kv.key()).into_owned(),
                    kv.value().to_vec(),
                    kv.mod_revision() as u64,
                )
            })
            .collect();

        Ok(entries)
    }
}

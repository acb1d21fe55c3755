//! Source store boundary.
//!
//! The synchronization workers only ever see this trait; the concrete client
//! is injected at wiring time, which is also what lets tests substitute
//! scripted in-memory stores.

pub mod etcd_store;

pub use etcd_store::EtcdStore;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::errors::SyncError;
use keysync_shared::{ChangeEvent, Entry};

/// Live stream of change events under a key prefix.
///
/// The stream terminates (it does not error individual events) when the
/// store-side watch is torn down, whether by leadership loss or transport
/// failure. A terminated stream is the follower's signal to back off and
/// re-subscribe.
pub type ChangeStream = Pin<Box<dyn Stream<Item = Result<ChangeEvent, SyncError>> + Send>>;

/// Client-visible contract of the replicated key-value store.
///
/// Both operations are leader-required: a watch or read served by a stale or
/// partitioned replica must fail rather than silently observe old state.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Open a revision-ordered change stream for every key under `prefix`,
    /// starting from the current moment.
    async fn watch(&self, prefix: &str) -> Result<ChangeStream, SyncError>;

    /// Snapshot read of every entry under `prefix`.
    async fn scan(&self, prefix: &str) -> Result<Vec<Entry>, SyncError>;
}

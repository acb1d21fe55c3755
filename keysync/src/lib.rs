//! # Keysync
//!
//! Keeps a full-text search index eventually consistent with the keyspace of
//! a replicated key-value store, scoped to a configurable key prefix.
//!
//! ## Architecture
//!
//! Two independently scheduled workers write into one revision-guarded sink:
//!
//! 1. **Follower**: applies live change-stream events as they arrive
//! 2. **Scanner**: periodically re-applies a full snapshot of the prefix,
//!    healing any drift the follower missed
//! 3. **Supervisor**: owns both workers' lifecycles and fans out one
//!    shutdown signal
//!
//! The workers never talk to each other; the sink's per-id
//! last-writer-wins-by-revision guard is the single point of convergence, so
//! any interleaving of the two (including replays after reconnects or
//! restarts) settles on the store's true state.
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`store`]: Source store boundary (watch + snapshot reads)
//! - [`follower`]: Live change-stream follower
//! - [`scanner`]: Periodic reconciliation scanner
//! - [`supervisor`]: Worker lifecycle and shutdown fan-out
//! - [`server`]: HTTP query endpoints
//! - [`errors`]: Error types for the synchronizer

pub mod config;
pub mod errors;
pub mod follower;
pub mod scanner;
pub mod server;
pub mod store;
pub mod supervisor;

pub use config::Dependencies;
pub use errors::SyncError;

use thiserror::Error;

/// Errors that can occur during initialization or execution.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Synchronization error.
    #[error("Sync error: {0}")]
    SyncError(#[from] SyncError),
}

impl IndexerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

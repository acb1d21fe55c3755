//! Error types for the synchronization engine.

use thiserror::Error;

use keysync_repository::SinkError;

/// Errors that can occur while synchronizing the index with the store.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Error talking to the source store.
    #[error("Store error: {0}")]
    StoreError(String),

    /// Error from the index sink.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Workers failed to observe cancellation in time.
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl SyncError {
    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    /// Create a sink error.
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::SinkError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a shutdown error.
    pub fn shutdown(msg: impl Into<String>) -> Self {
        Self::ShutdownError(msg.into())
    }
}

impl From<SinkError> for SyncError {
    fn from(err: SinkError) -> Self {
        Self::SinkError(err.to_string())
    }
}

impl From<etcd_client::Error> for SyncError {
    fn from(err: etcd_client::Error) -> Self {
        Self::StoreError(err.to_string())
    }
}

//! Index sink error types.
//!
//! This module defines the unified error type for all index sink operations,
//! covering both backend failures and query-time errors.

use thiserror::Error;

/// Unified errors from index sink operations.
///
/// Used by the `IndexSink` trait for all document and query operations.
/// A write rejected by the revision guard is NOT an error; it is reported
/// through `WriteOutcome::RejectedStale`.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// Failed to open or prepare the index backend.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to index a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to parse or execute a search query.
    #[error("Query error: {0}")]
    QueryError(String),
}

impl SinkError {
    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }
}

//! Index sink trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (embedded Tantivy, a remote
//! cluster, in-memory fakes in tests).

use async_trait::async_trait;

use crate::errors::SinkError;
use crate::types::{DeleteRequest, SearchHit, UpsertRequest, WriteOutcome};
use keysync_shared::IndexDocument;

/// Abstracts the underlying search index implementation.
///
/// The sink is the single point of convergence for the change follower and
/// the reconciliation scanner: both apply writes here without coordinating
/// with each other, and the sink alone decides which writes advance state.
///
/// # Write guard contract
///
/// Implementations must serialize concurrent writes to the same id and apply
/// a last-writer-wins-by-revision rule: a write whose revision is equal to or
/// lower than the revision already held for its id is discarded and reported
/// as `WriteOutcome::RejectedStale`, never as an error. Tombstone deletes
/// participate in the guard, so a put below an applied delete revision must
/// not resurrect the document. Under this contract every write is idempotent
/// and any interleaving of the two workers converges to the same state.
#[async_trait]
pub trait IndexSink: Send + Sync {
    /// Verify the sink is ready to accept writes and queries.
    ///
    /// Called once during application startup before the workers are started.
    async fn ensure_ready(&self) -> Result<(), SinkError>;

    /// Insert or overwrite the document for `request.id`, guarded by revision.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteOutcome::Applied)` - The document was written
    /// * `Ok(WriteOutcome::RejectedStale)` - Discarded, an equal or higher revision is already held
    /// * `Err(SinkError)` - The backend failed to perform an admitted write
    async fn upsert(&self, request: &UpsertRequest) -> Result<WriteOutcome, SinkError>;

    /// Delete the document for `request.id`, guarded by revision.
    ///
    /// Deleting an id the index does not hold is still `Applied` when the
    /// revision advances: the tombstone must be recorded so earlier puts
    /// arriving late are rejected.
    async fn delete(&self, request: &DeleteRequest) -> Result<WriteOutcome, SinkError>;

    /// Full-text search over document bodies.
    ///
    /// Returns up to `limit` hits ranked by relevance.
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<SearchHit>, SinkError>;

    /// Fetch the currently stored document for `id`, if any.
    async fn fetch(&self, id: &str) -> Result<Option<IndexDocument>, SinkError>;

    /// Number of live documents in the index.
    async fn document_count(&self) -> Result<u64, SinkError>;
}

//! Request and response types for index sink operations.

use serde::Serialize;

/// Request to upsert a document into the search index.
///
/// The write carries the store revision of the value; the sink discards the
/// write when it already holds an equal or higher revision for the id.
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    /// Document id (the source store key).
    pub id: String,
    /// Value bytes to index.
    pub body: Vec<u8>,
    /// Store revision of the write that produced this value.
    pub revision: u64,
}

/// Request to delete a document from the search index.
///
/// Deletes are revision-tagged tombstones: the revision participates in the
/// sink's write guard so a late-arriving put below it cannot resurrect the
/// document.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    /// Document id (the source store key).
    pub id: String,
    /// Store revision of the delete.
    pub revision: u64,
}

/// Outcome of a guarded write.
///
/// `RejectedStale` is a normal result, not a failure: it means the sink
/// already holds this id at an equal or higher revision and the write was
/// discarded. This is what makes replays from any worker idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write advanced the stored document.
    Applied,
    /// The write was discarded because it did not advance the revision.
    RejectedStale,
}

/// One ranked result from a search query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Document id (the source store key).
    pub id: String,
    /// Relevance score assigned by the index.
    pub score: f32,
    /// Highlighted fragment of the matching body.
    pub snippet: String,
}

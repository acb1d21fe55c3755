//! Document types for the search index.
//!
//! This module defines the document structure that is stored in the search
//! engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document representation for the search index.
///
/// The id is the source store key; `revision` is the store revision of the
/// write that produced this document and decides last-writer-wins conflicts.
///
/// # Fields
///
/// - `id`: Unique document id (the store key)
/// - `body`: Indexed value bytes
/// - `revision`: Store revision of the originating write
/// - `indexed_at`: Timestamp when the document was indexed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexDocument {
    pub id: String,
    pub body: Vec<u8>,
    pub revision: u64,
    pub indexed_at: DateTime<Utc>,
}

impl IndexDocument {
    /// Create a new document stamped with the current time.
    pub fn new(id: impl Into<String>, body: Vec<u8>, revision: u64) -> Self {
        Self {
            id: id.into(),
            body,
            revision,
            indexed_at: Utc::now(),
        }
    }
}

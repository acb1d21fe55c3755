//! Per-id revision guard.
//!
//! Both synchronization workers write into the same index without
//! coordinating with each other; all conflict resolution happens here.
//! The guard admits a write only when its revision is strictly higher than
//! the highest revision already applied for that id, which gives
//! last-writer-wins semantics regardless of arrival order.

use std::collections::HashMap;

/// Tracks the highest applied revision per document id.
///
/// Delete tombstones share the same table: admitting a delete at revision `r`
/// records `r` for the id, so a put below `r` is rejected and cannot
/// resurrect the document. Callers must hold the guard and the index writer
/// under the same lock so that the admit decision and the write it authorizes
/// are atomic.
#[derive(Debug, Default)]
pub struct RevisionGuard {
    revisions: HashMap<String, u64>,
}

impl RevisionGuard {
    /// Create an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a write at `revision` for `id`.
    ///
    /// Returns `true` and records the revision when it is strictly higher
    /// than anything seen for the id; returns `false` otherwise, leaving the
    /// recorded revision unchanged. Equal revisions are rejected, which is
    /// what makes replaying the same write idempotent.
    pub fn admit(&mut self, id: &str, revision: u64) -> bool {
        match self.revisions.get(id) {
            Some(&current) if revision <= current => false,
            _ => {
                self.revisions.insert(id.to_string(), revision);
                true
            }
        }
    }

    /// Highest revision applied for `id`, if any write was admitted.
    pub fn last_revision(&self, id: &str) -> Option<u64> {
        self.revisions.get(id).copied()
    }

    /// Number of ids the guard has seen.
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Whether the guard has seen no writes.
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

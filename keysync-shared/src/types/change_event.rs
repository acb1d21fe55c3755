//! Change events delivered by the source store's watch stream.

use serde::{Deserialize, Serialize};

/// Kind of mutation carried by a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Key was created or overwritten.
    Put,
    /// Key was removed.
    Delete,
}

/// One item from the live change stream.
///
/// Ordering within the stream is revision-increasing for a single key, but
/// interleaving across keys carries no guarantee relative to snapshot reads.
/// `value` is absent on deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The kind of mutation.
    pub kind: ChangeKind,
    /// Full key the mutation applies to.
    pub key: String,
    /// New value bytes; `None` for deletes.
    pub value: Option<Vec<u8>>,
    /// Store revision at which the mutation was committed.
    pub revision: u64,
}

impl ChangeEvent {
    /// Create a new put event.
    pub fn put(key: impl Into<String>, value: Vec<u8>, revision: u64) -> Self {
        Self {
            kind: ChangeKind::Put,
            key: key.into(),
            value: Some(value),
            revision,
        }
    }

    /// Create a new delete event.
    pub fn delete(key: impl Into<String>, revision: u64) -> Self {
        Self {
            kind: ChangeKind::Delete,
            key: key.into(),
            value: None,
            revision,
        }
    }
}

//! Source store entries.

use serde::{Deserialize, Serialize};

/// One logical row of the source key-value store.
///
/// The `revision` is a store-wide counter stamped on every write; it increases
/// monotonically per key and globally across the store, and is the sole
/// conflict-resolution tie-breaker downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Full key, including the watched prefix.
    pub key: String,
    /// Opaque value bytes.
    pub value: Vec<u8>,
    /// Store revision at which this value was written.
    pub revision: u64,
}

impl Entry {
    /// Create a new entry.
    pub fn new(key: impl Into<String>, value: Vec<u8>, revision: u64) -> Self {
        Self {
            key: key.into(),
            value,
            revision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_new() {
        let entry = Entry::new("app/config", b"payload".to_vec(), 42);

        assert_eq!(entry.key, "app/config");
        assert_eq!(entry.value, b"payload");
        assert_eq!(entry.revision, 42);
    }

    #[test]
    fn test_serialization() {
        let entry = Entry::new("app/config", b"payload".to_vec(), 7);

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: Entry = serde_json::from_str(&json).unwrap();

        assert_eq!(entry, deserialized);
    }
}

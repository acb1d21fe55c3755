//! Tantivy index configuration.

/// Default writer heap budget, in bytes.
const DEFAULT_WRITER_HEAP_BYTES: usize = 50_000_000;

/// Configuration for the embedded search index.
///
/// The index lives in memory; nothing survives a process restart. On restart
/// the reconciliation scanner's first tick re-indexes the entire prefix, so a
/// persistent index would only ever hold data one scan interval ahead of an
/// empty one.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Heap budget handed to the index writer.
    pub writer_heap_bytes: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            writer_heap_bytes: DEFAULT_WRITER_HEAP_BYTES,
        }
    }
}

impl IndexConfig {
    /// Create a config with a custom writer heap budget.
    pub fn with_writer_heap_bytes(writer_heap_bytes: usize) -> Self {
        Self { writer_heap_bytes }
    }
}

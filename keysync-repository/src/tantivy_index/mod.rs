//! Embedded Tantivy implementation of the index sink.

pub mod index_config;
pub mod sink;

pub use index_config::IndexConfig;
pub use sink::TantivyIndexSink;

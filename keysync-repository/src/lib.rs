//! # Keysync Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search index. It includes definitions for errors, the sink interface with
//! its revision write-guard semantics, and a concrete embedded implementation
//! backed by Tantivy.

pub mod errors;
pub mod guard;
pub mod interfaces;
pub mod tantivy_index;
pub mod types;

pub use errors::SinkError;
pub use guard::RevisionGuard;
pub use interfaces::IndexSink;
pub use tantivy_index::{IndexConfig, TantivyIndexSink};
pub use types::{DeleteRequest, SearchHit, UpsertRequest, WriteOutcome};

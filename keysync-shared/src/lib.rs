//! # Keysync Shared
//!
//! This crate defines shared data structures and types used across the keysync
//! ecosystem. It includes the source-store data model (entries and change
//! events) and the document representation stored in the search index.

pub mod types;

pub use types::change_event::{ChangeEvent, ChangeKind};
pub use types::entry::Entry;
pub use types::index_document::IndexDocument;

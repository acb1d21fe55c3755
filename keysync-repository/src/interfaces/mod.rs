//! Interface definitions for index sink backends.

pub mod index_sink;

pub use index_sink::IndexSink;

//! Error types for the index sink.

pub mod sink_error;

pub use sink_error::SinkError;

//! Observability for the polyedge platform abstraction layer.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with request context
//! - `LogSink` - Pluggable destinations (stderr, `tracing`, memory)
//! - `init_tracing` - Subscriber setup for native hosts

mod logging;
mod sink;

pub use logging::*;
pub use sink::*;

// Re-export RequestId from polyedge-core for convenience
pub use polyedge_core::RequestId;

//! Lifecycle event pipeline.
//!
//! - `Event` - The closed set of lifecycle points
//! - `EventPipeline` - Ordered, failure-isolated dispatch
//! - `EventListener` - Listener contract, plus closure adapters
//! - `EventContext` - Mutable payload listeners communicate through

mod context;
mod event;
mod listener;
mod pipeline;

pub use context::*;
pub use event::*;
pub use listener::*;
pub use pipeline::*;

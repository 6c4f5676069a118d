//! Core types for the polyedge platform abstraction layer.
//!
//! This crate provides the vocabulary shared by every other crate:
//! - `Provider` - The closed set of edge runtimes and their native shapes
//! - `PlatformError` - Error kinds for provider dispatch, env lookup and KV
//! - `Headers` - Case-insensitive header map
//! - `cookie` - `Cookie` parsing and `Set-Cookie` serialization
//! - `PlatformConfig` - Deployment configuration

pub mod cookie;

mod config;
mod context;
mod error;
mod headers;
mod provider;

pub use config::*;
pub use context::*;
pub use cookie::{CookieAttribute, CookieOptions};
pub use error::*;
pub use headers::*;
pub use provider::*;

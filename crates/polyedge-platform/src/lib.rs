//! Provider adapters and the per-request abstraction facade.
//!
//! This crate provides:
//! - `PlatformAdapter` - Everything that differs between edge runtimes
//! - `CloudflareAdapter`, `FastlyAdapter`, `VercelAdapter`, `AkamaiAdapter`,
//!   `CloudFrontAdapter` - One adapter per provider
//! - `AdapterFactory` - Named adapter constructors
//! - `ExecutionContext` - Background work through the runtime's primitive
//! - `CdnCachePolicy` - Caching rules rendered into provider headers
//! - `AbstractionFacade` - One request's view of the platform
//! - `Platform` - Process-wide services built at startup
//!
//! # Example
//!
//! ```ignore
//! use polyedge_core::{PlatformConfig, Provider};
//! use polyedge_platform::{AdapterOptions, NativeContext, Platform};
//!
//! let platform = Platform::from_config(
//!     PlatformConfig::new(Provider::Cloudflare),
//!     AdapterOptions::new().with_kv(backend),
//! )?;
//!
//! let facade = platform.facade(native_request, NativeContext::WaitUntil(ctx))?;
//! let session = facade.read_cookie("session").await;
//! ```

mod adapter;
mod cache;
mod context;
mod facade;
mod factory;
mod platform;
mod providers;

pub use adapter::*;
pub use cache::*;
pub use context::*;
pub use facade::*;
pub use factory::*;
pub use platform::*;
pub use providers::*;

//! Public SDK for the polyedge platform abstraction layer.
//!
//! This crate re-exports all platform functionality:
//!
//! ```ignore
//! use polyedge_sdk::prelude::*;
//!
//! let platform = Platform::from_config(PlatformConfig::from_env()?, AdapterOptions::new())?;
//! platform.events().on(Event::AfterReadingCookie, sync_listener(|ctx| {
//!     if ctx.get_str("name") == Some("tracking") {
//!         ctx.set("value", serde_json::Value::Null);
//!     }
//!     Ok(())
//! }));
//!
//! let mut facade = platform.facade(native_request, native_context)?;
//! let session = facade.read_cookie("session").await;
//! let response = facade.respond(ResponseInit::json(&body)?).await?;
//! ```

pub use polyedge_core;
pub use polyedge_decision;
pub use polyedge_events;
pub use polyedge_http;
pub use polyedge_kv;
pub use polyedge_observability;
pub use polyedge_platform;

pub use polyedge_kv::kv_key;

/// Prelude for convenient imports.
pub mod prelude {
    pub use polyedge_core::*;
    pub use polyedge_decision::*;
    pub use polyedge_events::*;
    pub use polyedge_http::*;
    pub use polyedge_kv::*;
    pub use polyedge_observability::*;
    pub use polyedge_platform::*;

    // Both core and decision export a `Result` alias.
    pub use polyedge_core::Result;
}

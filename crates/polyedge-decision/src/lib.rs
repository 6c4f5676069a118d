//! Feature-flag decisions with lifecycle hooks.
//!
//! This crate provides:
//! - `DecisionClient` / `DecisionContext` - Contract of the external decision engine
//! - `Decision` - The outcome for one flag
//! - `DecisionService` - Fires the decide hooks around the client and memoizes
//! - `StaticDecisionClient` - Table-driven client for development and tests

mod client;
mod error;
mod service;

pub use client::*;
pub use error::*;
pub use service::*;

//! Core abstractions for stateful page components.
//!
//! This crate provides the fundamental request-scoped types:
//! - `Mode` / `State` - Initial render vs. follow-up update tracking
//! - `Snapshot` - Client-returned memo and component data
//! - `ComponentRequestContext` - A follow-up request carrying one snapshot
//! - `EngineConfig` - Engine configuration

mod config;
mod context;
mod lifecycle;

pub use config::*;
pub use context::*;
pub use lifecycle::*;

//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config loading, request loading, instants)
//! - `analyze` - Full pipeline through an in-process cache
//! - `signals` - Signal generation only
//! - `hash` - Stable hash of a JSON document
//! - `config` - Effective engine config

pub mod analyze;
pub mod config;
pub mod core;
pub mod hash;
pub mod signals;

// Re-export command functions for main.rs
pub use analyze::*;
pub use config::*;
pub use core::*;
pub use hash::*;
pub use signals::*;

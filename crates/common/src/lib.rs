//! ClipForge Common Utilities
//!
//! Shared infrastructure for all ClipForge crates:
//! - Error taxonomy and result aliases
//! - Render clock and progress throttling
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;

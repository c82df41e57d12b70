//! Rawcam Common Utilities
//!
//! Shared infrastructure for all Rawcam crates:
//! - Error taxonomy and result alias
//! - Tracing/logging initialization
//! - Configuration loading
//! - Host-facing notices

pub mod config;
pub mod error;
pub mod logging;
pub mod notice;

pub use config::*;
pub use error::*;
pub use notice::*;

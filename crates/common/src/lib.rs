//! Vidgen Common Utilities
//!
//! Shared infrastructure for all vidgen crates:
//! - Error types, result aliases, and exit codes
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;

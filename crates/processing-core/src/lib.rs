//! Vidgen Processing Core: configuration resolution
//!
//! Turns a validated document into fully resolved per-video settings:
//! - **Templates:** expand named option templates into literal options
//! - **Variables:** merge shared, local, and derived variables
//! - **Fingerprints:** decide whether a cached output is still current
//! - **Builder:** run the fixed resolution pipeline for one video
//!
//! This crate is pure computation. No I/O, no process execution.
//! All inputs are data; all outputs are data.

pub mod builder;
pub mod fingerprint;
pub mod templates;
pub mod variables;

pub use builder::{ConfigurationBuilder, ResolvedKind, ResolvedVideo};
pub use fingerprint::{CacheDecision, Fingerprint, FingerprintPolicy, OutputState};

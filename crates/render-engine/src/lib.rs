//! Vidgen Render Engine
//!
//! Turns resolved videos into bash scripts and runs them. The scripts do
//! the actual media work through external tools; this crate only writes
//! them, executes the orchestration script, and reads back durations.
//!
//! # Pipeline Architecture
//!
//! ```text
//! document.yaml ──► ConfigurationBuilder ──► ResolvedVideo (execution order)
//!                                                  │
//!                                                  ├── ScriptEmitter ──► export_<title>.bash
//!                                                  │                           │
//!                                                  └──────────────────► export_generate.bash
//!                                                                              │
//!                                            bash (cwd = export dir) ◄─────────┘
//!                                                  │
//!                                                  ▼
//!                                   "<title> <seconds>" lines ──► RenderReport
//! ```
//!
//! Cache state can be inspected without running anything via [`cache`].

pub mod cache;
pub mod export;
pub mod script;

pub use cache::{inspect, ExifTool, MetadataReader, VideoStatus};
pub use export::*;
pub use script::{failed_script, ScriptEmitter, SKIP_EXIT_CODE, TOOL_SKIP_CLASH_EXIT_CODE};

//! Vidgen Project Model
//!
//! Defines the declarative document that describes which videos to make:
//! - **Shared settings:** variables and options applied to every video
//! - **Option templates:** named multi-line blocks of encoder options
//! - **Videos:** leaf videos rendered directly, and composites that
//!   concatenate other videos
//!
//! Documents are validated when loaded: every composite must reference
//! existing videos and the `combine` graph must be acyclic.

pub mod document;
pub mod text_map;
pub mod validation;

pub use document::*;
pub use text_map::*;
pub use validation::*;

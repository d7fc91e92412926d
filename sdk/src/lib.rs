//! Concierge SDK
//!
//! Shared error taxonomy and wire types used by the concierge engine and
//! anything that talks to its HTTP gateway.

/// Error types and handling
pub mod errors;

/// Task kinds, tool arguments and gateway payloads
pub mod types;

// Re-export commonly used types
pub use errors::{ConciergeErrorExt, EngineError};
pub use types::{ConciergeRequest, ConciergeResponse, TaskKind, ToolArgs, ToolError};

//! Error types and handling
//!
//! This module provides the error taxonomy shared by the concierge engine and
//! its gateway. Every error implements [`ConciergeErrorExt`], which supplies a
//! user-facing hint and says whether the session can continue.
//!
//! # Safety of messages
//!
//! Hints never include upstream response bodies, API keys or local paths.
//! The `Display` text may carry more detail and is meant for logs.

use thiserror::Error;

/// Extensions shared by every concierge error
pub trait ConciergeErrorExt {
    /// Returns a short hint that is safe to show to an end user
    fn user_hint(&self) -> &str;

    /// Returns whether the session that produced the error can keep going
    ///
    /// Recoverable errors are absorbed by the workflow (re-initialization,
    /// re-dispatch) or can be retried by the caller. Non-recoverable errors
    /// end the session.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid or unreadable config files
/// - **Session**: uninitialized, finished, or not waiting for input
/// - **Dispatch**: the orchestrator failed to pick, or picked more than one, agent
/// - **External**: LLM, pricing, search or render collaborators failed
/// - **Timeout**: the session exceeded its wall-clock budget
///
/// # Examples
///
/// ```
/// use sdk::errors::{ConciergeErrorExt, EngineError};
///
/// let error = EngineError::UninitializedSession;
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::WorkflowTimeout { elapsed_secs: 1201, budget_secs: 1200 };
/// assert!(!fatal.is_recoverable());
/// println!("Hint: {}", fatal.user_hint());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Session lifecycle
    #[error("Session has not been initialized")]
    UninitializedSession,

    #[error("Session has already finished")]
    SessionFinished,

    #[error("Session is not waiting for user input")]
    NotAwaitingInput,

    #[error("Workflow timed out after {elapsed_secs}s (budget {budget_secs}s)")]
    WorkflowTimeout { elapsed_secs: u64, budget_secs: u64 },

    // Dispatch errors
    #[error("Dispatcher could not route request: {0}")]
    DispatchFailure(String),

    #[error("Dispatcher emitted more than one event; rejected {rejected}")]
    DispatchAmbiguity { accepted: String, rejected: String },

    // Collaborator errors
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool arguments for {tool}: {message}")]
    InvalidToolArguments { tool: String, message: String },

    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Internal state machine violations
    #[error("Workflow invariant violated: {0}")]
    Invariant(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Build an [`EngineError::ExternalService`] for the named collaborator
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl ConciergeErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::UninitializedSession => "Session is starting over",
            Self::SessionFinished => "This conversation has ended. Start a new session",
            Self::NotAwaitingInput => "Please wait for the current reply before sending more",
            Self::WorkflowTimeout { .. } => {
                "The conversation ran too long and was closed. Start a new session"
            }

            Self::DispatchFailure(_) => "Could not decide who should handle that. Retrying",
            Self::DispatchAmbiguity { .. } => "More than one agent was selected; using the first",

            Self::ExternalService { .. } => {
                "A backing service is unavailable. Check your API keys and network"
            }

            Self::ToolNotFound(_) => "The requested tool is not available",
            Self::InvalidToolArguments { .. } => "A tool was called with invalid arguments",

            Self::InvalidInput(_) => "The request was not understood",
            Self::Invariant(_) => "Internal error. Start a new session",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::WorkflowTimeout { .. } | Self::SessionFinished | Self::Invariant(_)
        )
    }
}

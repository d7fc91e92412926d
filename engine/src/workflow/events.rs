//! Workflow events
//!
//! One tagged union covers every event a step can consume. The driver
//! dispatches on the variant, so adding a task kind never adds an event
//! type.

use sdk::types::TaskKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Entry point; an initial utterance is replayed after initialization
    Start { request: Option<String> },

    /// (Re)build the session context
    Initialize,

    /// Front door: greet, acknowledge completion, or escalate
    Concierge {
        request: Option<String>,
        just_completed: Option<String>,
        need_help: bool,
    },

    /// Route `request` to exactly one agent
    Orchestrator { request: String, need_help: bool },

    /// Hand `request` to the task agent of `kind`
    Task { kind: TaskKind, request: String },

    /// Terminal
    Stop,
}

impl WorkflowEvent {
    /// Plain concierge turn: greet and wait
    pub fn concierge() -> Self {
        Self::Concierge {
            request: None,
            just_completed: None,
            need_help: false,
        }
    }

    pub fn completed(agent: impl Into<String>) -> Self {
        Self::Concierge {
            request: None,
            just_completed: Some(agent.into()),
            need_help: false,
        }
    }

    pub fn orchestrate(request: impl Into<String>) -> Self {
        Self::Orchestrator {
            request: request.into(),
            need_help: false,
        }
    }

    pub fn escalate(request: impl Into<String>) -> Self {
        Self::Orchestrator {
            request: request.into(),
            need_help: true,
        }
    }

    pub fn task(kind: TaskKind, request: impl Into<String>) -> Self {
        Self::Task {
            kind,
            request: request.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Initialize => "initialize",
            Self::Concierge { .. } => "concierge",
            Self::Orchestrator { .. } => "orchestrator",
            Self::Task { .. } => "task",
            Self::Stop => "stop",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stop)
    }

    /// Request text carried by the event, if any
    pub fn request(&self) -> Option<&str> {
        match self {
            Self::Start { request } | Self::Concierge { request, .. } => request.as_deref(),
            Self::Orchestrator { request, .. } | Self::Task { request, .. } => Some(request),
            Self::Initialize | Self::Stop => None,
        }
    }
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task { kind, .. } => write!(f, "task:{}", kind),
            other => f.write_str(other.name()),
        }
    }
}

//! Shared types: task kinds, tool arguments and gateway payloads

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The task-specific agents the orchestrator can hand a request to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    TextToDiagram,
    TextToRag,
    PriceLookup,
    Report,
    ImportFix,
}

impl TaskKind {
    /// Every task kind, in dispatch-table order
    pub const ALL: [TaskKind; 5] = [
        TaskKind::TextToDiagram,
        TaskKind::TextToRag,
        TaskKind::PriceLookup,
        TaskKind::Report,
        TaskKind::ImportFix,
    ];

    /// Human-readable agent name, reported back as `just_completed`
    pub fn agent_name(self) -> &'static str {
        match self {
            TaskKind::TextToDiagram => "Text to Diagram Agent",
            TaskKind::TextToRag => "Text to RAG Agent",
            TaskKind::PriceLookup => "Price Lookup Agent",
            TaskKind::Report => "Report Agent",
            TaskKind::ImportFix => "Import Fix Agent",
        }
    }

    /// Name of the orchestrator tool that routes to this agent
    pub fn emit_tool(self) -> &'static str {
        match self {
            TaskKind::TextToDiagram => "emit_text_to_diagram",
            TaskKind::TextToRag => "emit_text_to_rag",
            TaskKind::PriceLookup => "emit_price_lookup",
            TaskKind::Report => "emit_report",
            TaskKind::ImportFix => "emit_import_fix",
        }
    }

    /// Stable identifier used in config files and logs
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::TextToDiagram => "text_to_diagram",
            TaskKind::TextToRag => "text_to_rag",
            TaskKind::PriceLookup => "price_lookup",
            TaskKind::Report => "report",
            TaskKind::ImportFix => "import_fix",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ToolError::InvalidParameter(format!("unknown task kind '{}'", s)))
    }
}

/// Arguments passed to a tool invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolArgs {
    pub params: HashMap<String, serde_json::Value>,
}

impl ToolArgs {
    /// Create an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON object an LLM produced for a tool call.
    ///
    /// Empty strings and `null` are treated as "no arguments".
    pub fn from_json(raw: &str) -> Result<Self, ToolError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(serde_json::Value::Object(map)) => Ok(Self {
                params: map.into_iter().collect(),
            }),
            Ok(serde_json::Value::Null) => Ok(Self::new()),
            Ok(other) => Err(ToolError::InvalidParameter(format!(
                "expected a JSON object, got {}",
                other
            ))),
            Err(e) => Err(ToolError::InvalidParameter(e.to_string())),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Get a required string parameter
    pub fn param_str(&self, key: &str) -> Result<String, ToolError> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))
    }

    /// Get an optional string parameter
    pub fn param_str_opt(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    /// Get an optional bool parameter
    pub fn param_bool_opt(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(|v| v.as_bool())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Tool-specific argument errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Body of `POST /v1/concierge`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConciergeRequest {
    /// One line of user input
    pub input: String,

    /// Session to continue; a new session is created when absent or unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Re-initialize the session before handling `input`
    #[serde(default)]
    pub reset: bool,
}

/// Response of `POST /v1/concierge`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConciergeResponse {
    pub session_id: String,

    /// Every reply produced during the turn, joined by newlines
    pub response: String,

    /// True once the session reached Stop
    pub finished: bool,
}

//! Session context
//!
//! [`SessionState`] is the typed state every step and tool reads and writes.
//! Agents live beside it in [`AgentPool`] rather than inside it, so a step
//! can hold an agent mutably while handing the state to that agent's tools.

use chrono::{DateTime, Utc};
use sdk::types::TaskKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::task_agent::TaskAgent;
use crate::agent::AgentAdapter;

/// Scratch keys shared between task tools
pub mod scratch {
    /// Passages returned by the last knowledge-base search
    pub const RAG_SEARCH_RESPONSE: &str = "rag_search_response";
    /// Error from the last failed diagram render
    pub const DIAGRAM_SYNTAX_ERROR: &str = "diagram_syntax_error";
    /// Path of the last rendered diagram
    pub const DIAGRAM_ARTIFACT: &str = "diagram_artifact";
    /// Service and dimensions of the last price lookup
    pub const LAST_PRICE_LOOKUP: &str = "last_price_lookup";
    /// Path of the last written report
    pub const REPORT_PATH: &str = "report_path";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
    System,
}

/// One line of the session transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,

    /// Step or task that produced the entry ("concierge", "price_lookup", ...)
    pub step: String,
    pub role: HistoryRole,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Set by initialization; `None` means the session must be (re)built
    pub user: Option<UserProfile>,

    /// Latest raw utterance taken at the concierge
    pub user_request: Option<String>,

    /// Task agent that owns the turn; `None` while the concierge does
    pub active_task: Option<TaskKind>,

    /// Set by `done`/`need_help` until the driver consumes the handoff
    pub redirecting: bool,

    /// Request to replay through the orchestrator before prompting again
    pub pending_followup: Option<String>,

    pub history: Vec<HistoryEntry>,

    pub task_scratch: HashMap<String, Value>,

    /// Times the dispatcher answered with the failure sentinel
    pub dispatch_failures: u32,
}

impl SessionState {
    /// Reset every field for a fresh session. A queued follow-up survives
    /// so a request that arrived before initialization is not lost.
    pub fn initialize(&mut self, session_id: impl Into<String>) {
        let pending_followup = self.pending_followup.take();
        *self = Self {
            user: Some(UserProfile {
                session_id: session_id.into(),
                started_at: Utc::now(),
            }),
            pending_followup,
            ..Self::default()
        };
    }

    pub fn is_initialized(&self) -> bool {
        self.user.is_some()
    }

    /// Owning session's id, or "anonymous" before initialization
    pub fn session_id(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.session_id.as_str())
            .unwrap_or("anonymous")
    }

    pub fn record(&mut self, step: impl Into<String>, role: HistoryRole, content: impl Into<String>) {
        self.history.push(HistoryEntry {
            at: Utc::now(),
            step: step.into(),
            role,
            content: content.into(),
        });
    }

    pub fn set_scratch(&mut self, key: &str, value: impl Into<Value>) {
        self.task_scratch.insert(key.to_string(), value.into());
    }

    pub fn scratch(&self, key: &str) -> Option<&Value> {
        self.task_scratch.get(key)
    }

    pub fn scratch_str(&self, key: &str) -> Option<&str> {
        self.task_scratch.get(key).and_then(Value::as_str)
    }

    pub fn clear_scratch(&mut self, key: &str) -> Option<Value> {
        self.task_scratch.remove(key)
    }

    /// One-line summary used when a session fails
    pub fn diagnostics(&self) -> String {
        format!(
            "initialized={} active_task={} redirecting={} pending_followup={} history={} dispatch_failures={} scratch=[{}]",
            self.is_initialized(),
            self.active_task.map(|k| k.as_str()).unwrap_or("none"),
            self.redirecting,
            self.pending_followup.is_some(),
            self.history.len(),
            self.dispatch_failures,
            {
                let mut keys: Vec<&str> = self.task_scratch.keys().map(String::as_str).collect();
                keys.sort_unstable();
                keys.join(",")
            }
        )
    }
}

/// Agents built for one session, each at most once
#[derive(Default)]
pub struct AgentPool {
    pub greeter: Option<AgentAdapter>,
    pub dispatcher: Option<AgentAdapter>,
    pub tasks: HashMap<TaskKind, TaskAgent>,
}

impl AgentPool {
    pub fn clear(&mut self) {
        self.greeter = None;
        self.dispatcher = None;
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.greeter.is_none() && self.dispatcher.is_none() && self.tasks.is_empty()
    }
}

#[derive(Default)]
pub struct SessionContext {
    pub state: SessionState,
    pub agents: AgentPool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_keeps_pending_followup() {
        let mut state = SessionState {
            pending_followup: Some("price of s3".into()),
            redirecting: true,
            dispatch_failures: 3,
            ..SessionState::default()
        };
        state.record("concierge", HistoryRole::User, "hi");
        state.set_scratch(scratch::REPORT_PATH, "/tmp/r.md");

        state.initialize("abc");

        assert_eq!(state.user.as_ref().map(|u| u.session_id.as_str()), Some("abc"));
        assert_eq!(state.pending_followup.as_deref(), Some("price of s3"));
        assert!(!state.redirecting);
        assert!(state.history.is_empty());
        assert!(state.task_scratch.is_empty());
        assert_eq!(state.dispatch_failures, 0);
    }

    #[test]
    fn test_scratch_helpers() {
        let mut state = SessionState::default();
        state.set_scratch(scratch::RAG_SEARCH_RESPONSE, "passage");
        assert_eq!(state.scratch_str(scratch::RAG_SEARCH_RESPONSE), Some("passage"));
        assert!(state.clear_scratch(scratch::RAG_SEARCH_RESPONSE).is_some());
        assert!(state.scratch(scratch::RAG_SEARCH_RESPONSE).is_none());
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut state = SessionState::default();
        state.active_task = Some(TaskKind::Report);
        state.set_scratch(scratch::REPORT_PATH, "r.md");
        let summary = state.diagnostics();
        assert!(summary.contains("active_task=report"));
        assert!(summary.contains("scratch=[report_path]"));
    }
}

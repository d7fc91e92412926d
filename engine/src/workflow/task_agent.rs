//! Task agents
//!
//! A task agent wraps an [`AgentAdapter`] bound to one task kind's tools plus
//! `done` and `need_help`. It keeps the turn until one of those tools fires:
//! a plain reply means "ask the user again, same task".

use sdk::errors::EngineError;
use sdk::types::TaskKind;
use tracing::{debug, info, warn};

use super::context::{scratch, HistoryRole, SessionState};
use super::events::WorkflowEvent;
use super::outbox::Outbox;
use super::{Resume, Step, Transition, Workflow};
use crate::agent::{AgentAdapter, ToolScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Idle,
    AwaitingLLM,
    Redirecting,
    AwaitingUserInput,
}

/// What a task agent's turn asks of the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskTurn {
    /// `done` or `need_help` fired; the follow-up event is in the outbox
    Redirected { reply: String },

    /// Show `reply` and route the next user line back to this agent
    AwaitInput { reply: String },
}

pub struct TaskAgent {
    kind: TaskKind,
    adapter: AgentAdapter,
    phase: TaskPhase,
    current: Option<String>,
}

impl TaskAgent {
    pub fn new(kind: TaskKind, adapter: AgentAdapter) -> Self {
        Self {
            kind,
            adapter,
            phase: TaskPhase::Idle,
            current: None,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    /// Request text of the most recent triggering event
    pub fn current_request(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn adapter(&self) -> &AgentAdapter {
        &self.adapter
    }

    /// Run one turn for `request`.
    ///
    /// The caller guarantees `state.redirecting` is false on entry; it is
    /// false again on return.
    pub async fn handle_event(
        &mut self,
        request: &str,
        state: &mut SessionState,
        outbox: &mut Outbox,
    ) -> Result<TaskTurn, EngineError> {
        if self.phase == TaskPhase::Redirecting {
            self.phase = TaskPhase::Idle;
        }

        self.current = Some(request.to_string());
        self.phase = TaskPhase::AwaitingLLM;

        let agent = self.kind.agent_name();
        let reply = {
            let mut scope = ToolScope::new(state, outbox, agent, request);
            match self.adapter.chat(request, &mut scope).await {
                Ok(reply) => reply,
                Err(e) => {
                    self.phase = TaskPhase::Idle;
                    return Err(e);
                }
            }
        };

        if state.redirecting {
            state.redirecting = false;
            self.phase = TaskPhase::Redirecting;
            debug!(agent, "Task agent handed off");
            Ok(TaskTurn::Redirected { reply })
        } else {
            self.phase = TaskPhase::AwaitingUserInput;
            Ok(TaskTurn::AwaitInput { reply })
        }
    }
}

impl Workflow {
    pub(super) async fn on_task(&mut self, kind: TaskKind, request: String) -> Result<Step, EngineError> {
        if !self.factory.is_enabled(kind) {
            return Err(EngineError::Invariant(format!(
                "task event for disabled agent '{}'",
                kind
            )));
        }

        if self.session.state.redirecting {
            warn!(task = %kind, "Clearing stale redirect flag");
            self.session.state.redirecting = false;
        }

        if kind == TaskKind::TextToDiagram
            && self.settings.diagram_requires_research
            && self.factory.is_enabled(TaskKind::TextToRag)
            && self
                .session
                .state
                .scratch(scratch::RAG_SEARCH_RESPONSE)
                .is_none()
        {
            info!("No research in session yet, searching before drawing");
            // Placeholder so the replayed request goes to the diagram agent
            // even if the search agent finishes without searching.
            self.session
                .state
                .set_scratch(scratch::RAG_SEARCH_RESPONSE, "");
            self.session.state.pending_followup = Some(request.clone());
            return Ok(Step::emit(WorkflowEvent::task(TaskKind::TextToRag, request)));
        }

        let factory = &self.factory;
        let agent = self
            .session
            .agents
            .tasks
            .entry(kind)
            .or_insert_with(|| factory.task_agent(kind));
        self.session.state.active_task = Some(kind);

        let turn = agent
            .handle_event(&request, &mut self.session.state, &mut self.outbox)
            .await?;

        match turn {
            TaskTurn::Redirected { reply } => {
                let reply = non_empty(reply);
                if let Some(reply) = &reply {
                    self.session
                        .state
                        .record(kind.as_str(), HistoryRole::Assistant, reply.clone());
                }
                Ok(Step {
                    reply,
                    next: Transition::Drain,
                })
            }
            TaskTurn::AwaitInput { reply } => {
                if !reply.trim().is_empty() {
                    self.session
                        .state
                        .record(kind.as_str(), HistoryRole::Assistant, reply.clone());
                }
                Ok(Step {
                    reply: Some(reply),
                    next: Transition::AwaitInput(Resume::Task(kind)),
                })
            }
        }
    }
}

fn non_empty(reply: String) -> Option<String> {
    if reply.trim().is_empty() {
        None
    } else {
        Some(reply)
    }
}

//! Workflow driver
//!
//! A session is a loop over [`WorkflowEvent`]s. Each event goes to the step
//! for its variant, and the step says what happens next:
//!
//! - `Emit(event)`: process `event` immediately
//! - `Drain`: process the event a tool left in the outbox
//! - `AwaitInput(resume)`: suspend until the caller supplies a user line,
//!   which is turned into the next event according to `resume`
//!
//! `Stop` ends the session. Every stretch of processing, and every wait for
//! input inside [`Workflow::run`], counts against one wall-clock budget;
//! exceeding it ends the session with [`EngineError::WorkflowTimeout`].

pub mod concierge;
pub mod context;
pub mod events;
pub mod factory;
pub mod handoff;
pub mod input;
pub mod orchestrator;
pub mod outbox;
pub mod task_agent;

#[cfg(test)]
mod testing;

pub use context::{SessionContext, SessionState};
pub use events::WorkflowEvent;
pub use factory::AgentFactory;
pub use input::{InputSource, LineInput, ScriptedInput};
pub use outbox::Outbox;
pub use task_agent::{TaskAgent, TaskPhase, TaskTurn};

use sdk::errors::{ConciergeErrorExt, EngineError};
use sdk::types::TaskKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{Config, WorkflowConfig};
use crate::llm::LLMProvider;
use crate::services::Services;
use context::HistoryRole;

/// Where the next user line goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Concierge,
    Orchestrator,
    Task(TaskKind),
}

impl Resume {
    fn step_name(self) -> &'static str {
        match self {
            Resume::Concierge => "concierge",
            Resume::Orchestrator => "orchestrator",
            Resume::Task(kind) => kind.as_str(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum Transition {
    Emit(WorkflowEvent),
    AwaitInput(Resume),
    Drain,
}

/// Outcome of one step
#[derive(Debug, PartialEq)]
pub(crate) struct Step {
    reply: Option<String>,
    next: Transition,
}

impl Step {
    fn emit(event: WorkflowEvent) -> Self {
        Self {
            reply: None,
            next: Transition::Emit(event),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    AwaitingInput,
    Finished,
}

/// Replies produced between two user lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub replies: Vec<String>,
    pub status: TurnStatus,
}

impl Turn {
    pub fn is_finished(&self) -> bool {
        self.status == TurnStatus::Finished
    }

    /// Replies joined for line-oriented clients
    pub fn text(&self) -> String {
        self.replies.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Running,
    Awaiting(Resume),
    Finished,
}

/// Per-session knobs, taken from `[workflow]`
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub exit_keywords: Vec<String>,
    pub budget: Duration,
    pub diagram_requires_research: bool,
}

impl WorkflowSettings {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            exit_keywords: config.exit_keywords.clone(),
            budget: Duration::from_secs(config.timeout_secs),
            diagram_requires_research: config.diagram_requires_research,
        }
    }

    /// Case- and whitespace-insensitive match against the exit keywords
    pub fn is_exit(&self, line: &str) -> bool {
        let word = line.trim().to_lowercase();
        self.exit_keywords.iter().any(|k| *k == word)
    }
}

pub struct Workflow {
    session_id: String,
    session: SessionContext,
    factory: AgentFactory,
    outbox: Outbox,
    settings: WorkflowSettings,
    started: Instant,
    phase: Phase,
}

impl Workflow {
    pub fn new(factory: AgentFactory, settings: WorkflowSettings) -> Self {
        Self::with_session_id(uuid::Uuid::new_v4().to_string(), factory, settings)
    }

    pub fn with_session_id(
        session_id: impl Into<String>,
        factory: AgentFactory,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            session: SessionContext::default(),
            factory,
            outbox: Outbox::default(),
            settings,
            started: Instant::now(),
            phase: Phase::NotStarted,
        }
    }

    /// Build a session against the collaborators named in `config`
    pub fn from_config(config: &Config, provider: Arc<dyn LLMProvider>) -> Self {
        let services = Services::from_config(config, Arc::clone(&provider));
        let factory = AgentFactory::new(
            provider,
            services,
            config.workflow.agents.clone(),
            config.workflow.memory_tokens,
        );
        Self::new(factory, WorkflowSettings::from_config(&config.workflow))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &SessionState {
        &self.session.state
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn is_awaiting_input(&self) -> bool {
        matches!(self.phase, Phase::Awaiting(_))
    }

    /// Whether the session has built a task agent of `kind`
    pub fn has_task_agent(&self, kind: TaskKind) -> bool {
        self.session.agents.tasks.contains_key(&kind)
    }

    pub fn task_agent(&self, kind: TaskKind) -> Option<&TaskAgent> {
        self.session.agents.tasks.get(&kind)
    }

    /// Begin the session, optionally with a first request to handle once
    /// initialization is done.
    pub async fn start(&mut self, request: Option<String>) -> Result<Turn, EngineError> {
        match self.phase {
            Phase::NotStarted => {}
            Phase::Finished => return Err(EngineError::SessionFinished),
            _ => {
                return Err(EngineError::Invariant(
                    "session already started".to_string(),
                ))
            }
        }
        info!(session = %self.session_id, "Session started");
        self.pump(WorkflowEvent::Start { request }, Resume::Concierge)
            .await
    }

    /// Feed one user line to whichever step is waiting for it
    pub async fn submit(&mut self, line: &str) -> Result<Turn, EngineError> {
        let resume = match self.phase {
            Phase::Awaiting(resume) => resume,
            Phase::Finished => return Err(EngineError::SessionFinished),
            Phase::NotStarted | Phase::Running => return Err(EngineError::NotAwaitingInput),
        };

        self.session
            .state
            .record(resume.step_name(), HistoryRole::User, line);

        let event = match resume {
            Resume::Concierge if self.settings.is_exit(line) => {
                info!("Exit keyword received");
                WorkflowEvent::Stop
            }
            Resume::Concierge => {
                self.session.state.user_request = Some(line.to_string());
                WorkflowEvent::orchestrate(line)
            }
            Resume::Orchestrator => WorkflowEvent::orchestrate(line),
            Resume::Task(kind) => WorkflowEvent::task(kind, line),
        };

        self.pump(event, resume).await
    }

    /// Discard the session's state and agents and greet afresh
    pub async fn reset(&mut self) -> Result<Turn, EngineError> {
        if self.phase == Phase::Finished {
            return Err(EngineError::SessionFinished);
        }
        self.started = Instant::now();
        self.pump(WorkflowEvent::Initialize, Resume::Concierge).await
    }

    /// Drive a whole conversation: start, then read lines from `input`
    /// until the session finishes or the input ends. Replies are handed to
    /// `emit` as they are produced.
    pub async fn run<I, F>(
        &mut self,
        first: Option<String>,
        input: &mut I,
        mut emit: F,
    ) -> Result<(), EngineError>
    where
        I: InputSource,
        F: FnMut(&str) + Send,
    {
        let mut turn = self.start(first).await?;

        loop {
            for reply in &turn.replies {
                emit(reply);
            }
            if turn.is_finished() {
                return Ok(());
            }

            let remaining = self.remaining()?;
            let waited = tokio::time::timeout(remaining, input.next_line()).await;
            let Ok(line) = waited else {
                return Err(self.timed_out());
            };
            let line = line?;

            let Some(line) = line else {
                info!("Input closed, ending session");
                self.phase = Phase::Finished;
                return Ok(());
            };

            turn = match self.submit(&line).await {
                Ok(turn) => turn,
                Err(e) if e.is_recoverable() && !self.is_finished() => {
                    emit(e.user_hint());
                    Turn {
                        replies: Vec::new(),
                        status: TurnStatus::AwaitingInput,
                    }
                }
                Err(e) => return Err(e),
            };
        }
    }

    fn remaining(&mut self) -> Result<Duration, EngineError> {
        let remaining = self.settings.budget.saturating_sub(self.started.elapsed());
        if remaining.is_zero() {
            Err(self.timed_out())
        } else {
            Ok(remaining)
        }
    }

    fn timed_out(&mut self) -> EngineError {
        let err = EngineError::WorkflowTimeout {
            elapsed_secs: self.started.elapsed().as_secs(),
            budget_secs: self.settings.budget.as_secs(),
        };
        error!(
            session = %self.session_id,
            state = %self.session.state.diagnostics(),
            pending = ?self.outbox.peek(),
            "{}", err
        );
        self.phase = Phase::Finished;
        err
    }

    /// Process events from `first` until input is needed or the session
    /// ends, within the remaining budget.
    async fn pump(&mut self, first: WorkflowEvent, resume: Resume) -> Result<Turn, EngineError> {
        let remaining = self.remaining()?;
        self.phase = Phase::Running;

        let outcome = tokio::time::timeout(remaining, self.process(first)).await;
        let Ok(result) = outcome else {
            return Err(self.timed_out());
        };

        match result {
            Ok(turn) => Ok(turn),
            Err(e) if e.is_recoverable() => {
                warn!(session = %self.session_id, error = %e, "Turn failed");
                self.outbox.clear();
                self.session.state.redirecting = false;
                self.phase = Phase::Awaiting(resume);
                Err(e)
            }
            Err(e) => {
                error!(
                    session = %self.session_id,
                    state = %self.session.state.diagnostics(),
                    error = %e,
                    "Session failed"
                );
                self.phase = Phase::Finished;
                Err(e)
            }
        }
    }

    async fn process(&mut self, first: WorkflowEvent) -> Result<Turn, EngineError> {
        let mut replies = Vec::new();
        let mut event = first;

        loop {
            if event.is_terminal() {
                info!(session = %self.session_id, "Session finished");
                self.session
                    .state
                    .record("workflow", HistoryRole::System, "stop");
                self.phase = Phase::Finished;
                return Ok(Turn {
                    replies,
                    status: TurnStatus::Finished,
                });
            }

            debug!(event = %event, "Processing event");
            let step = self.step(event).await?;
            replies.extend(step.reply);

            event = match step.next {
                Transition::Emit(next) => next,
                Transition::Drain => {
                    let next = self.outbox.take().ok_or_else(|| {
                        EngineError::Invariant("handoff without a queued event".to_string())
                    })?;
                    self.session.state.record(
                        "workflow",
                        HistoryRole::System,
                        format!("handoff to {}", next),
                    );
                    next
                }
                Transition::AwaitInput(resume) => {
                    self.phase = Phase::Awaiting(resume);
                    return Ok(Turn {
                        replies,
                        status: TurnStatus::AwaitingInput,
                    });
                }
            };
        }
    }

    async fn step(&mut self, event: WorkflowEvent) -> Result<Step, EngineError> {
        match event {
            WorkflowEvent::Start { request } => Ok(self.on_start(request)),
            WorkflowEvent::Initialize => Ok(self.on_initialize()),
            WorkflowEvent::Concierge {
                request,
                just_completed,
                need_help,
            } => self.on_concierge(request, just_completed, need_help).await,
            WorkflowEvent::Orchestrator { request, need_help } => {
                self.on_orchestrator(request, need_help).await
            }
            WorkflowEvent::Task { kind, request } => self.on_task(kind, request).await,
            WorkflowEvent::Stop => Err(EngineError::Invariant(
                "stop event reached a step".to_string(),
            )),
        }
    }
}

//! Handoff tools
//!
//! `done` and `need_help` are bound to every task agent; the `emit_*` family
//! forms the dispatcher's whole tool set. Each has one side effect: offer
//! one event to the outbox. They answer the model with "true" when the
//! event was queued and "false" when another event already was.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{TaskKind, ToolArgs};
use tracing::info;

use super::events::WorkflowEvent;
use crate::agent::{Tool, ToolScope};

fn ack(accepted: bool) -> String {
    accepted.to_string()
}

/// Marks the task finished and returns control to the concierge
pub struct DoneTool;

#[async_trait]
impl Tool for DoneTool {
    fn name(&self) -> &str {
        "done"
    }

    fn description(&self) -> &str {
        "Call this once the user's task is complete"
    }

    async fn invoke(&self, _args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        info!(agent = scope.agent, "Task agent finished");
        scope.state.redirecting = true;
        Ok(ack(scope.outbox.offer(WorkflowEvent::completed(scope.agent))))
    }
}

/// Sends the current request back to the orchestrator
pub struct NeedHelpTool;

#[async_trait]
impl Tool for NeedHelpTool {
    fn name(&self) -> &str {
        "need_help"
    }

    fn description(&self) -> &str {
        "Call this if the user asks for something you cannot do"
    }

    async fn invoke(&self, _args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        info!(agent = scope.agent, "Task agent escalating");
        scope.state.redirecting = true;
        Ok(ack(scope.outbox.offer(WorkflowEvent::escalate(scope.request))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitTarget {
    Task(TaskKind),
    Concierge,
    Stop,
}

/// Dispatcher tool routing the current request to one target
pub struct EmitTool {
    target: EmitTarget,
}

impl EmitTool {
    pub fn new(target: EmitTarget) -> Self {
        Self { target }
    }

    pub fn task(kind: TaskKind) -> Self {
        Self::new(EmitTarget::Task(kind))
    }
}

#[async_trait]
impl Tool for EmitTool {
    fn name(&self) -> &str {
        match self.target {
            EmitTarget::Task(kind) => kind.emit_tool(),
            EmitTarget::Concierge => "emit_concierge",
            EmitTarget::Stop => "emit_stop",
        }
    }

    fn description(&self) -> &str {
        match self.target {
            EmitTarget::Task(TaskKind::TextToDiagram) => "Route the request to the diagram agent",
            EmitTarget::Task(TaskKind::TextToRag) => "Route the request to the knowledge base agent",
            EmitTarget::Task(TaskKind::PriceLookup) => "Route the request to the pricing agent",
            EmitTarget::Task(TaskKind::Report) => "Route the request to the report agent",
            EmitTarget::Task(TaskKind::ImportFix) => "Route the request to the import fix agent",
            EmitTarget::Concierge => "Hand the user back to the concierge",
            EmitTarget::Stop => "End the conversation",
        }
    }

    async fn invoke(&self, _args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let event = match self.target {
            EmitTarget::Task(kind) => WorkflowEvent::task(kind, scope.request),
            EmitTarget::Concierge => WorkflowEvent::Concierge {
                request: Some(scope.request.to_string()),
                just_completed: None,
                need_help: false,
            },
            EmitTarget::Stop => WorkflowEvent::Stop,
        };
        info!(tool = self.name(), "Dispatching");
        Ok(ack(scope.outbox.offer(event)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::context::SessionState;
    use crate::workflow::outbox::Outbox;

    #[tokio::test]
    async fn test_done_marks_redirect_and_names_agent() {
        let mut state = SessionState::default();
        let mut outbox = Outbox::default();
        let mut scope = ToolScope::new(&mut state, &mut outbox, "Report Agent", "sum up");

        let out = DoneTool.invoke(ToolArgs::new(), &mut scope).await.unwrap();

        assert_eq!(out, "true");
        assert!(state.redirecting);
        assert_eq!(outbox.take(), Some(WorkflowEvent::completed("Report Agent")));
    }

    #[tokio::test]
    async fn test_need_help_carries_request() {
        let mut state = SessionState::default();
        let mut outbox = Outbox::default();
        let mut scope = ToolScope::new(&mut state, &mut outbox, "Report Agent", "price of s3");

        NeedHelpTool.invoke(ToolArgs::new(), &mut scope).await.unwrap();

        assert!(state.redirecting);
        assert_eq!(outbox.take(), Some(WorkflowEvent::escalate("price of s3")));
    }

    #[tokio::test]
    async fn test_second_emit_is_rejected() {
        let mut state = SessionState::default();
        let mut outbox = Outbox::default();
        let mut scope = ToolScope::new(&mut state, &mut outbox, "Orchestrator", "hi");

        let first = EmitTool::task(TaskKind::Report)
            .invoke(ToolArgs::new(), &mut scope)
            .await
            .unwrap();
        let second = EmitTool::new(EmitTarget::Stop)
            .invoke(ToolArgs::new(), &mut scope)
            .await
            .unwrap();

        assert_eq!((first.as_str(), second.as_str()), ("true", "false"));
        assert_eq!(outbox.take(), Some(WorkflowEvent::task(TaskKind::Report, "hi")));
    }

    #[test]
    fn test_emit_names() {
        assert_eq!(EmitTool::task(TaskKind::ImportFix).name(), "emit_import_fix");
        assert_eq!(EmitTool::new(EmitTarget::Concierge).name(), "emit_concierge");
    }
}

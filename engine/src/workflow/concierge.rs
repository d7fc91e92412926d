//! Start, initialization and concierge steps

use sdk::errors::EngineError;
use tracing::{debug, info, warn};

use super::context::HistoryRole;
use super::events::WorkflowEvent;
use super::factory::GREETER_NAME;
use super::{Resume, Step, Transition, Workflow};
use crate::agent::ToolScope;

const STEP: &str = "concierge";

impl Workflow {
    pub(super) fn on_start(&mut self, request: Option<String>) -> Step {
        if let Some(request) = request.filter(|r| !r.trim().is_empty()) {
            debug!("Queueing initial request");
            self.session.state.pending_followup = Some(request);
        }
        Step::emit(WorkflowEvent::concierge())
    }

    pub(super) fn on_initialize(&mut self) -> Step {
        info!(session = %self.session_id, "Initializing session");
        self.session.state.initialize(self.session_id.clone());
        self.session.agents.clear();
        self.outbox.clear();
        Step::emit(WorkflowEvent::concierge())
    }

    pub(super) async fn on_concierge(
        &mut self,
        request: Option<String>,
        just_completed: Option<String>,
        need_help: bool,
    ) -> Result<Step, EngineError> {
        if !self.session.state.is_initialized() {
            warn!(error = %EngineError::UninitializedSession, "Re-initializing");
            return Ok(Step::emit(WorkflowEvent::Initialize));
        }

        let state = &mut self.session.state;
        state.active_task = None;
        state.redirecting = false;

        if let Some(followup) = state.pending_followup.take() {
            state.record(STEP, HistoryRole::User, followup.clone());
            if self.settings.is_exit(&followup) {
                info!("Exit keyword received as the initial request");
                return Ok(Step::emit(WorkflowEvent::Stop));
            }
            info!("Replaying queued request");
            state.user_request = Some(followup.clone());
            return Ok(Step::emit(WorkflowEvent::orchestrate(followup)));
        }

        if need_help {
            let Some(request) = request.or_else(|| state.user_request.clone()) else {
                return Err(EngineError::Invariant(
                    "escalation without a request".to_string(),
                ));
            };
            return Ok(Step::emit(WorkflowEvent::escalate(request)));
        }

        let utterance = match (just_completed, request) {
            (Some(agent), _) => format!("FYI, the user has just completed the task: {}", agent),
            (None, Some(request)) => request,
            (None, None) => "Hello!".to_string(),
        };

        let factory = &self.factory;
        let greeter = self
            .session
            .agents
            .greeter
            .get_or_insert_with(|| factory.greeter());

        let reply = {
            let mut scope = ToolScope::new(
                &mut self.session.state,
                &mut self.outbox,
                GREETER_NAME,
                &utterance,
            );
            greeter.chat(&utterance, &mut scope).await?
        };

        self.session
            .state
            .record(STEP, HistoryRole::Assistant, reply.clone());

        Ok(Step {
            reply: Some(reply),
            next: Transition::AwaitInput(Resume::Concierge),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{workflow, FixedProvider};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_escalation_skips_the_greeter() {
        let provider = FixedProvider::new("Hi there");
        let mut wf = workflow(Arc::clone(&provider));
        wf.session.state.initialize("step-test");

        let step = wf
            .on_concierge(Some("draw my network".to_string()), None, true)
            .await
            .unwrap();

        assert_eq!(step, Step::emit(WorkflowEvent::escalate("draw my network")));
        assert_eq!(provider.calls(), 0);
        assert!(wf.session.agents.greeter.is_none());
    }

    #[tokio::test]
    async fn test_escalation_falls_back_to_the_stored_request() {
        let provider = FixedProvider::new("Hi there");
        let mut wf = workflow(Arc::clone(&provider));
        wf.session.state.initialize("step-test");
        wf.session.state.user_request = Some("price an s3 bucket".to_string());

        let step = wf.on_concierge(None, None, true).await.unwrap();

        assert_eq!(step, Step::emit(WorkflowEvent::escalate("price an s3 bucket")));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_escalation_without_any_request_is_an_invariant_error() {
        let provider = FixedProvider::new("Hi there");
        let mut wf = workflow(Arc::clone(&provider));
        wf.session.state.initialize("step-test");

        let err = wf.on_concierge(None, None, true).await.unwrap_err();

        assert!(matches!(err, EngineError::Invariant(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_without_escalation_the_greeter_answers() {
        let provider = FixedProvider::new("Hi there");
        let mut wf = workflow(Arc::clone(&provider));
        wf.session.state.initialize("step-test");

        let step = wf.on_concierge(None, None, false).await.unwrap();

        assert_eq!(step.reply.as_deref(), Some("Hi there"));
        assert_eq!(step.next, Transition::AwaitInput(Resume::Concierge));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_queued_exit_keyword_stops_before_dispatch() {
        let provider = FixedProvider::new("Hi there");
        let mut wf = workflow(Arc::clone(&provider));
        wf.on_start(Some("  EXIT ".to_string()));
        wf.session.state.initialize("step-test");

        let step = wf.on_concierge(None, None, false).await.unwrap();

        assert_eq!(step, Step::emit(WorkflowEvent::Stop));
        assert_eq!(provider.calls(), 0);
        assert!(wf.session.state.user_request.is_none());
    }

    #[tokio::test]
    async fn test_queued_request_is_replayed_to_the_orchestrator() {
        let provider = FixedProvider::new("Hi there");
        let mut wf = workflow(Arc::clone(&provider));
        wf.on_start(Some("compare two regions".to_string()));
        wf.session.state.initialize("step-test");

        let step = wf.on_concierge(None, None, false).await.unwrap();

        assert_eq!(step, Step::emit(WorkflowEvent::orchestrate("compare two regions")));
        assert_eq!(wf.session.state.user_request.as_deref(), Some("compare two regions"));
        assert_eq!(provider.calls(), 0);
    }
}

//! Orchestrator step
//!
//! Runs the dispatcher agent on a request. A routed request leaves exactly
//! one event in the outbox; the literal reply "FAILED" re-presents the same
//! request; any other reply is shown to the user and their answer comes
//! back here.

use sdk::errors::EngineError;
use tracing::{debug, info, warn};

use super::context::HistoryRole;
use super::events::WorkflowEvent;
use super::factory::DISPATCHER_NAME;
use super::{Resume, Step, Transition, Workflow};
use crate::agent::prompts::DISPATCH_FAILED;
use crate::agent::ToolScope;

const STEP: &str = "orchestrator";

impl Workflow {
    pub(super) async fn on_orchestrator(
        &mut self,
        request: String,
        need_help: bool,
    ) -> Result<Step, EngineError> {
        if need_help {
            info!("Re-dispatching escalated request");
        }
        self.session.state.active_task = None;

        let factory = &self.factory;
        let dispatcher = self
            .session
            .agents
            .dispatcher
            .get_or_insert_with(|| factory.dispatcher());

        let reply = {
            let mut scope = ToolScope::new(
                &mut self.session.state,
                &mut self.outbox,
                DISPATCHER_NAME,
                &request,
            );
            dispatcher.chat(&request, &mut scope).await?
        };

        if let Some(next) = self.outbox.peek() {
            debug!(next = %next, reply = %reply, "Request routed");
            return Ok(Step {
                reply: None,
                next: Transition::Drain,
            });
        }

        if reply.trim() == DISPATCH_FAILED {
            self.session.state.dispatch_failures += 1;
            warn!(
                error = %EngineError::DispatchFailure(request.clone()),
                attempts = self.session.state.dispatch_failures,
                "Dispatcher gave up, asking again"
            );
            return Ok(Step::emit(WorkflowEvent::Orchestrator { request, need_help }));
        }

        self.session
            .state
            .record(STEP, HistoryRole::Assistant, reply.clone());
        Ok(Step {
            reply: Some(reply),
            next: Transition::AwaitInput(Resume::Orchestrator),
        })
    }
}

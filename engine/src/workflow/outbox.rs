//! Outbound event slot
//!
//! Tools called during a chat turn enqueue the next workflow event here.
//! The slot holds one event: the first offer in a turn wins and later
//! offers are rejected and logged as a dispatch ambiguity.

use sdk::errors::EngineError;
use tracing::warn;

use super::events::WorkflowEvent;

#[derive(Debug, Default)]
pub struct Outbox {
    slot: Option<WorkflowEvent>,
    rejected: u32,
}

impl Outbox {
    /// Offer the next event. Returns false if one is already queued.
    pub fn offer(&mut self, event: WorkflowEvent) -> bool {
        match &self.slot {
            None => {
                self.slot = Some(event);
                true
            }
            Some(accepted) => {
                self.rejected += 1;
                let err = EngineError::DispatchAmbiguity {
                    accepted: accepted.to_string(),
                    rejected: event.to_string(),
                };
                warn!(error = %err, "Ignoring extra follow-up event");
                false
            }
        }
    }

    pub fn take(&mut self) -> Option<WorkflowEvent> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<&WorkflowEvent> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Offers rejected since the outbox was created
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

//! Text to diagram tool

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::ToolArgs;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::tool::invalid_args;
use crate::agent::{Tool, ToolScope};
use crate::services::{DiagramRenderer, RenderOutcome};
use crate::workflow::context::{scratch, SessionState};

pub struct GenerateDiagramTool {
    renderer: Arc<dyn DiagramRenderer>,
}

impl GenerateDiagramTool {
    pub fn new(renderer: Arc<dyn DiagramRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Tool for GenerateDiagramTool {
    fn name(&self) -> &str {
        "generate_diagram"
    }

    fn description(&self) -> &str {
        "Generate an architecture diagram image from a text description of the system"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "The components of the system and how they connect"
                }
            },
            "required": ["description"]
        })
    }

    async fn invoke(&self, args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let mut description = args
            .param_str("description")
            .map_err(|e| invalid_args(self.name(), e))?;

        if let Some(research) = scope.state.scratch_str(scratch::RAG_SEARCH_RESPONSE) {
            if !research.is_empty() {
                description.push_str("\n\nReference material:\n");
                description.push_str(research);
            }
        }

        let outcome = self
            .renderer
            .render(scope.state.session_id(), &description)
            .await?;
        Ok(record_outcome(scope.state, outcome))
    }
}

/// Store a render outcome in the session and describe it for the model
pub(crate) fn record_outcome(state: &mut SessionState, outcome: RenderOutcome) -> String {
    match outcome {
        RenderOutcome::Rendered { artifact } => {
            let path = artifact.display().to_string();
            info!(artifact = %path, "Diagram rendered");
            state.clear_scratch(scratch::DIAGRAM_SYNTAX_ERROR);
            state.set_scratch(scratch::DIAGRAM_ARTIFACT, path.clone());
            format!("Diagram generated and saved to {}", path)
        }
        RenderOutcome::Failed { error } => {
            warn!("Diagram render failed");
            state.set_scratch(scratch::DIAGRAM_SYNTAX_ERROR, error.clone());
            format!("ERROR: the generated diagram code failed:\n{}", error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_record_success_clears_error() {
        let mut state = SessionState::default();
        state.set_scratch(scratch::DIAGRAM_SYNTAX_ERROR, "boom");

        let msg = record_outcome(
            &mut state,
            RenderOutcome::Rendered {
                artifact: PathBuf::from("/w/output_diagram.png"),
            },
        );

        assert!(msg.contains("/w/output_diagram.png"));
        assert!(state.scratch(scratch::DIAGRAM_SYNTAX_ERROR).is_none());
        assert_eq!(
            state.scratch_str(scratch::DIAGRAM_ARTIFACT),
            Some("/w/output_diagram.png")
        );
    }

    #[test]
    fn test_record_failure_keeps_error() {
        let mut state = SessionState::default();
        let msg = record_outcome(
            &mut state,
            RenderOutcome::Failed {
                error: "ImportError: no module named diagrams.aws.foo".into(),
            },
        );
        assert!(msg.starts_with("ERROR:"));
        assert!(state
            .scratch_str(scratch::DIAGRAM_SYNTAX_ERROR)
            .is_some_and(|e| e.contains("ImportError")));
    }
}

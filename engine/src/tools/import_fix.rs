//! Import and syntax repair tools for generated diagram code

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::ToolArgs;
use serde_json::{json, Value};
use std::sync::Arc;

use super::diagram::record_outcome;
use crate::agent::tool::invalid_args;
use crate::agent::{Tool, ToolScope};
use crate::services::{DiagramRenderer, SearchBackend};
use crate::workflow::context::scratch;

pub struct CheckDiagramCodeTool {
    renderer: Arc<dyn DiagramRenderer>,
}

impl CheckDiagramCodeTool {
    pub fn new(renderer: Arc<dyn DiagramRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Tool for CheckDiagramCodeTool {
    fn name(&self) -> &str {
        "check_diagram_code"
    }

    fn description(&self) -> &str {
        "Run the current diagram code and report whether it renders"
    }

    async fn invoke(&self, _args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let outcome = self.renderer.check(scope.state.session_id()).await?;
        Ok(record_outcome(scope.state, outcome))
    }
}

pub struct SuggestImportsTool {
    search: Arc<dyn SearchBackend>,
}

impl SuggestImportsTool {
    pub fn new(search: Arc<dyn SearchBackend>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for SuggestImportsTool {
    fn name(&self) -> &str {
        "suggest_imports"
    }

    fn description(&self) -> &str {
        "Look up the correct import statements for an import error"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "error": { "type": "string", "description": "The import error message" }
            },
            "required": ["error"]
        })
    }

    async fn invoke(&self, args: ToolArgs, _scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let error = args.param_str("error").map_err(|e| invalid_args(self.name(), e))?;

        let passages = self
            .search
            .search(&format!("correct import for: {}", error))
            .await?;

        if passages.is_empty() {
            Ok("No import suggestions found.".to_string())
        } else {
            Ok(passages.join("\n\n"))
        }
    }
}

pub struct FixDiagramCodeTool {
    renderer: Arc<dyn DiagramRenderer>,
}

impl FixDiagramCodeTool {
    pub fn new(renderer: Arc<dyn DiagramRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Tool for FixDiagramCodeTool {
    fn name(&self) -> &str {
        "fix_diagram_code"
    }

    fn description(&self) -> &str {
        "Rewrite the diagram code to fix an error, then run it again"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "error": {
                    "type": "string",
                    "description": "Error to fix, including any import suggestions; defaults to the last render error"
                }
            }
        })
    }

    async fn invoke(&self, args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let error = match args.param_str_opt("error") {
            Some(error) => error,
            None => match scope.state.scratch_str(scratch::DIAGRAM_SYNTAX_ERROR) {
                Some(error) => error.to_string(),
                None => return Ok("There is no diagram error to fix.".to_string()),
            },
        };

        let outcome = self
            .renderer
            .repair(scope.state.session_id(), &error)
            .await?;
        Ok(record_outcome(scope.state, outcome))
    }
}

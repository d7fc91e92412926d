//! Knowledge-base search tool

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::ToolArgs;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::agent::tool::invalid_args;
use crate::agent::{Tool, ToolScope};
use crate::services::SearchBackend;
use crate::workflow::context::scratch;

pub struct SearchRagTool {
    search: Arc<dyn SearchBackend>,
}

impl SearchRagTool {
    pub fn new(search: Arc<dyn SearchBackend>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for SearchRagTool {
    fn name(&self) -> &str {
        "search_rag"
    }

    fn description(&self) -> &str {
        "Search the knowledge base and return the most relevant passages"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "What to search for" }
            },
            "required": ["text"]
        })
    }

    async fn invoke(&self, args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let text = args.param_str("text").map_err(|e| invalid_args(self.name(), e))?;

        let passages = self.search.search(&text).await?;
        debug!(count = passages.len(), "Knowledge base answered");

        let joined = passages.join("\n\n");
        scope.state.set_scratch(scratch::RAG_SEARCH_RESPONSE, joined.clone());

        if joined.is_empty() {
            Ok("No results found.".to_string())
        } else {
            Ok(joined)
        }
    }
}

//! Tool interface shared by every agent
//!
//! A tool is a named, described, JSON-schema-typed async function. Tools
//! never capture session state; they receive a [`ToolScope`] for the
//! duration of one invocation, giving them the session state, the outbound
//! event slot, and the identity of the agent and request they run for.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{ToolArgs, ToolError};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::{ToolCall, ToolSpec};
use crate::workflow::context::SessionState;
use crate::workflow::outbox::Outbox;

/// Everything a tool may touch while it runs
pub struct ToolScope<'a> {
    pub state: &'a mut SessionState,
    pub outbox: &'a mut Outbox,

    /// Display name of the agent running the tool
    pub agent: &'a str,

    /// Request text that triggered the current turn
    pub request: &'a str,
}

impl<'a> ToolScope<'a> {
    pub fn new(
        state: &'a mut SessionState,
        outbox: &'a mut Outbox,
        agent: &'a str,
        request: &'a str,
    ) -> Self {
        Self {
            state,
            outbox,
            agent,
            request,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object. Defaults to "no arguments".
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(&self, args: ToolArgs, scope: &mut ToolScope<'_>)
        -> Result<String, EngineError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Ordered set of tools bound to one agent
#[derive(Clone, Default)]
pub struct ToolBox {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.push(Arc::new(tool));
        self
    }

    /// Add a tool, replacing any earlier tool with the same name
    pub fn push(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn extend(&mut self, other: ToolBox) {
        for tool in other.tools {
            self.push(tool);
        }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run one tool call requested by the model.
    ///
    /// Unknown tools and unparseable arguments are errors for the caller;
    /// a tool's own failure to do its job is reported in the returned text.
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        scope: &mut ToolScope<'_>,
    ) -> Result<String, EngineError> {
        debug!(tool = %call.name, agent = scope.agent, args = %call.arguments, "Dispatching tool");

        let Some(tool) = self.tools.iter().find(|t| t.name() == call.name) else {
            warn!(tool = %call.name, agent = scope.agent, "Unknown tool requested");
            return Err(EngineError::ToolNotFound(format!(
                "'{}' (available: {})",
                call.name,
                self.names().join(", ")
            )));
        };

        let args = ToolArgs::from_json(&call.arguments).map_err(|e| invalid_args(&call.name, e))?;
        tool.invoke(args, scope).await
    }
}

/// Map an argument error into the engine taxonomy
pub fn invalid_args(tool: &str, err: ToolError) -> EngineError {
    EngineError::InvalidToolArguments {
        tool: tool.to_string(),
        message: err.to_string(),
    }
}

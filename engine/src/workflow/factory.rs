//! Builds the agents a session needs, on demand

use sdk::types::TaskKind;
use std::sync::Arc;

use super::handoff::{DoneTool, EmitTarget, EmitTool, NeedHelpTool};
use super::task_agent::TaskAgent;
use crate::agent::{prompts, AgentAdapter, ToolBox};
use crate::llm::LLMProvider;
use crate::services::Services;
use crate::tools::tools_for;

pub const GREETER_NAME: &str = "Concierge";
pub const DISPATCHER_NAME: &str = "Orchestrator";

#[derive(Clone)]
pub struct AgentFactory {
    provider: Arc<dyn LLMProvider>,
    services: Services,
    agents: Vec<TaskKind>,
    memory_tokens: usize,
}

impl AgentFactory {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        services: Services,
        agents: Vec<TaskKind>,
        memory_tokens: usize,
    ) -> Self {
        Self {
            provider,
            services,
            agents,
            memory_tokens,
        }
    }

    pub fn is_enabled(&self, kind: TaskKind) -> bool {
        self.agents.contains(&kind)
    }

    pub fn agents(&self) -> &[TaskKind] {
        &self.agents
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    pub fn greeter(&self) -> AgentAdapter {
        AgentAdapter::new(
            GREETER_NAME,
            prompts::concierge(),
            ToolBox::new(),
            Arc::clone(&self.provider),
            self.memory_tokens,
        )
    }

    /// Dispatcher whose only tools are the `emit_*` routes
    pub fn dispatcher(&self) -> AgentAdapter {
        let mut tools = ToolBox::new();
        for kind in &self.agents {
            tools = tools.with(EmitTool::task(*kind));
        }
        tools = tools
            .with(EmitTool::new(EmitTarget::Concierge))
            .with(EmitTool::new(EmitTarget::Stop));

        AgentAdapter::new(
            DISPATCHER_NAME,
            prompts::orchestrator(&self.agents),
            tools,
            Arc::clone(&self.provider),
            self.memory_tokens,
        )
    }

    pub fn task_agent(&self, kind: TaskKind) -> TaskAgent {
        let tools = tools_for(kind, &self.services)
            .with(DoneTool)
            .with(NeedHelpTool);

        TaskAgent::new(
            kind,
            AgentAdapter::new(
                kind.agent_name(),
                prompts::task(kind),
                tools,
                Arc::clone(&self.provider),
                self.memory_tokens,
            ),
        )
    }
}

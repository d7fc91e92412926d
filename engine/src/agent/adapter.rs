//! Agent Adapter
//!
//! Binds a system prompt, a tool set and an LLM handle into one object
//! exposing `chat`. A chat turn runs a think-act-observe loop:
//!
//! 1. Append the utterance to working memory
//! 2. Call the provider with the memory and the tool specs
//! 3. If the model asked for tools, run them in order, append the results, repeat
//! 4. If the model answered, append and return the answer
//!
//! Tool side effects (session writes, follow-up events) therefore complete
//! before `chat` returns.

use sdk::errors::EngineError;
use std::sync::Arc;
use tracing::{debug, info};

use super::tool::{ToolBox, ToolScope};
use super::WorkingMemory;
use crate::llm::{LLMProvider, LLMResponse, Message, ToolSpec};

/// Tool rounds allowed in one chat turn before the model is considered stuck
const MAX_TOOL_ROUNDS: usize = 12;

pub struct AgentAdapter {
    name: String,
    tools: ToolBox,
    specs: Vec<ToolSpec>,
    memory: WorkingMemory,
    provider: Arc<dyn LLMProvider>,
}

impl AgentAdapter {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: ToolBox,
        provider: Arc<dyn LLMProvider>,
        memory_tokens: usize,
    ) -> Self {
        let specs = tools.specs();
        Self {
            name: name.into(),
            tools,
            specs,
            memory: WorkingMemory::with_system_prompt(system_prompt, memory_tokens),
            provider,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    pub fn memory(&self) -> &WorkingMemory {
        &self.memory
    }

    /// Send one utterance and return the model's final reply.
    ///
    /// Provider failures, unknown tools and malformed arguments propagate;
    /// nothing here retries.
    pub async fn chat(
        &mut self,
        utterance: &str,
        scope: &mut ToolScope<'_>,
    ) -> Result<String, EngineError> {
        self.memory.add_message(Message::user(utterance));

        for round in 1..=MAX_TOOL_ROUNDS {
            debug!(agent = %self.name, round, "LLM round");

            let response = self
                .provider
                .generate(self.memory.messages(), &self.specs)
                .await?;

            match response {
                LLMResponse::ToolCalls { calls } => {
                    self.memory
                        .add_message(Message::assistant_tool_calls(calls.clone()));

                    for (i, call) in calls.iter().enumerate() {
                        info!(agent = %self.name, tool = %call.name, "Tool call");
                        match self.tools.dispatch(call, scope).await {
                            Ok(result) => self
                                .memory
                                .add_message(Message::tool_result(result, call.id.clone())),
                            Err(e) => {
                                // Every call id needs a result or the provider rejects the
                                // transcript on the next turn
                                for pending in &calls[i..] {
                                    self.memory.add_message(Message::tool_result(
                                        format!("ERROR: {}", e),
                                        pending.id.clone(),
                                    ));
                                }
                                return Err(e);
                            }
                        }
                    }
                }
                LLMResponse::FinalAnswer(answer) => {
                    self.memory.add_message(Message::assistant(&answer.content));
                    return Ok(answer.content);
                }
            }
        }

        Err(EngineError::external(
            "llm",
            format!(
                "{} made {} tool rounds without answering",
                self.name, MAX_TOOL_ROUNDS
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Tool;
    use crate::llm::{self, ToolCall};
    use crate::workflow::context::SessionState;
    use crate::workflow::outbox::Outbox;
    use async_trait::async_trait;
    use sdk::types::ToolArgs;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Script(Mutex<VecDeque<LLMResponse>>);

    #[async_trait]
    impl LLMProvider for Script {
        fn name(&self) -> &str {
            "script"
        }

        fn is_local(&self) -> bool {
            true
        }

        fn estimated_cost(&self, _tokens: usize) -> f64 {
            0.0
        }

        async fn generate(&self, _messages: &[Message], _tools: &[ToolSpec]) -> llm::Result<LLMResponse> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| LLMResponse::tool_call(ToolCall::new("x", "mark", "{}"))))
        }
    }

    struct Mark;

    #[async_trait]
    impl Tool for Mark {
        fn name(&self) -> &str {
            "mark"
        }

        fn description(&self) -> &str {
            "Set the redirect flag"
        }

        async fn invoke(&self, _args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
            scope.state.redirecting = true;
            Ok("marked".to_string())
        }
    }

    fn adapter(responses: Vec<LLMResponse>) -> AgentAdapter {
        AgentAdapter::new(
            "Test Agent",
            "system",
            ToolBox::new().with(Mark),
            Arc::new(Script(Mutex::new(responses.into()))),
            4000,
        )
    }

    #[tokio::test]
    async fn test_tool_side_effects_land_before_chat_returns() {
        let mut agent = adapter(vec![
            LLMResponse::tool_call(ToolCall::new("1", "mark", "{}")),
            LLMResponse::answer("all set"),
        ]);
        let mut state = SessionState::default();
        let mut outbox = Outbox::default();
        let mut scope = ToolScope::new(&mut state, &mut outbox, "Test Agent", "go");

        let reply = agent.chat("go", &mut scope).await.unwrap();

        assert_eq!(reply, "all set");
        assert!(state.redirecting);
        // system, user, tool call, tool result, answer
        assert_eq!(agent.memory().messages().len(), 5);
        assert_eq!(agent.memory().messages()[3].tool_call_id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_plain_answer_keeps_history() {
        let mut agent = adapter(vec![LLMResponse::answer("hi"), LLMResponse::answer("again")]);
        let mut state = SessionState::default();
        let mut outbox = Outbox::default();

        let mut scope = ToolScope::new(&mut state, &mut outbox, "Test Agent", "a");
        agent.chat("a", &mut scope).await.unwrap();
        let mut scope = ToolScope::new(&mut state, &mut outbox, "Test Agent", "b");
        assert_eq!(agent.chat("b", &mut scope).await.unwrap(), "again");

        assert_eq!(agent.memory().messages().len(), 5);
        assert!(!state.redirecting);
    }

    #[tokio::test]
    async fn test_endless_tool_rounds_fail() {
        let mut agent = adapter(Vec::new());
        let mut state = SessionState::default();
        let mut outbox = Outbox::default();
        let mut scope = ToolScope::new(&mut state, &mut outbox, "Test Agent", "loop");

        let err = agent.chat("loop", &mut scope).await.unwrap_err();
        assert!(matches!(err, EngineError::ExternalService { .. }));
    }

    #[tokio::test]
    async fn test_unknown_tool_answers_every_call_id() {
        let mut agent = adapter(vec![LLMResponse::ToolCalls {
            calls: vec![
                ToolCall::new("a", "missing", "{}"),
                ToolCall::new("b", "mark", "{}"),
            ],
        }]);
        let mut state = SessionState::default();
        let mut outbox = Outbox::default();
        let mut scope = ToolScope::new(&mut state, &mut outbox, "Test Agent", "go");

        let err = agent.chat("go", &mut scope).await.unwrap_err();
        assert!(matches!(err, EngineError::ToolNotFound(_)));
        // Nothing after the failing call runs
        assert!(!state.redirecting);

        let ids: Vec<_> = agent
            .memory()
            .messages()
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}

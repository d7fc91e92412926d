//! Shared fixtures for workflow tests: a scripted LLM and in-memory
//! collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use concierge_engine::llm::{self, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolSpec};
use concierge_engine::services::{
    DiagramRenderer, PriceCatalog, PriceDimension, RenderOutcome, SearchBackend, Services,
};
use concierge_engine::workflow::{AgentFactory, Workflow, WorkflowSettings};
use sdk::errors::EngineError;
use sdk::types::TaskKind;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the provider saw on one call
#[derive(Debug, Clone)]
pub struct SeenCall {
    pub system: String,
    pub last: String,
    pub message_count: usize,
    pub tools: Vec<String>,
}

/// Answers from a fixed script, in call order, across every agent
pub struct ScriptedProvider {
    script: Mutex<VecDeque<LLMResponse>>,
    fallback: Option<LLMResponse>,
    delay: Option<Duration>,
    seen: Mutex<Vec<SeenCall>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<LLMResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: None,
            delay: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Repeat `response` forever, sleeping `delay` before each answer
    pub fn repeating(response: LLMResponse, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            delay: Some(delay),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<SeenCall> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn estimated_cost(&self, _tokens: usize) -> f64 {
        0.0
    }

    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> llm::Result<LLMResponse> {
        self.seen.lock().unwrap().push(SeenCall {
            system: messages
                .iter()
                .find(|m| m.role == MessageRole::System)
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            last: messages
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::User)
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            message_count: messages.len(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| llm::LLMError::ProviderUnavailable("script exhausted".to_string()))
    }
}

pub fn call(name: &str, args: &str) -> LLMResponse {
    LLMResponse::tool_call(ToolCall::new(format!("call-{}", name), name, args))
}

pub fn answer(text: &str) -> LLMResponse {
    LLMResponse::answer(text)
}

#[derive(Default)]
pub struct FakeRenderer {
    outcomes: Mutex<VecDeque<RenderOutcome>>,
    pub descriptions: Mutex<Vec<String>>,
    /// Session id passed with each call
    pub sessions: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn with(outcomes: Vec<RenderOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            descriptions: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        })
    }

    fn next(&self) -> RenderOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RenderOutcome::Rendered {
                artifact: PathBuf::from("/work/output_diagram.png"),
            })
    }
}

#[async_trait]
impl DiagramRenderer for FakeRenderer {
    async fn render(&self, session: &str, description: &str) -> Result<RenderOutcome, EngineError> {
        self.sessions.lock().unwrap().push(session.to_string());
        self.descriptions.lock().unwrap().push(description.to_string());
        Ok(self.next())
    }

    async fn check(&self, session: &str) -> Result<RenderOutcome, EngineError> {
        self.sessions.lock().unwrap().push(session.to_string());
        Ok(self.next())
    }

    async fn repair(&self, session: &str, error: &str) -> Result<RenderOutcome, EngineError> {
        self.sessions.lock().unwrap().push(session.to_string());
        self.descriptions.lock().unwrap().push(format!("repair: {}", error));
        Ok(self.next())
    }
}

#[derive(Default)]
pub struct FakeSearch {
    pub passages: Vec<String>,
    pub queries: Mutex<Vec<String>>,
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, EngineError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.passages.clone())
    }
}

pub struct FakeCatalog;

#[async_trait]
impl PriceCatalog for FakeCatalog {
    async fn search(&self, _description: &str) -> Result<Vec<String>, EngineError> {
        Ok(vec!["AmazonS3".to_string()])
    }

    async fn price(&self, service: &str) -> Result<Vec<PriceDimension>, EngineError> {
        if service == "AmazonS3" {
            Ok(vec![PriceDimension {
                description: "Standard storage".to_string(),
                price_usd: "0.023".to_string(),
                unit: "GB-Mo".to_string(),
            }])
        } else {
            Ok(Vec::new())
        }
    }
}

pub struct Harness {
    pub provider: Arc<ScriptedProvider>,
    pub renderer: Arc<FakeRenderer>,
    pub search: Arc<FakeSearch>,
    pub dir: tempfile::TempDir,
    pub factory: AgentFactory,
}

impl Harness {
    pub fn new(provider: Arc<ScriptedProvider>) -> Self {
        Self::with_collaborators(provider, FakeRenderer::with(Vec::new()), Vec::new(), &TaskKind::ALL)
    }

    pub fn with_collaborators(
        provider: Arc<ScriptedProvider>,
        renderer: Arc<FakeRenderer>,
        passages: Vec<String>,
        agents: &[TaskKind],
    ) -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let search = Arc::new(FakeSearch {
            passages,
            queries: Mutex::new(Vec::new()),
        });
        let services = Services {
            renderer: renderer.clone(),
            search: search.clone(),
            prices: Arc::new(FakeCatalog),
            reports_dir: dir.path().join("reports"),
        };
        let factory = AgentFactory::new(provider.clone(), services, agents.to_vec(), 8000);

        Self {
            provider,
            renderer,
            search,
            dir,
            factory,
        }
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow_with(settings(Duration::from_secs(30), false))
    }

    pub fn workflow_with(&self, settings: WorkflowSettings) -> Workflow {
        Workflow::with_session_id("test-session", self.factory.clone(), settings)
    }
}

pub fn settings(budget: Duration, diagram_requires_research: bool) -> WorkflowSettings {
    WorkflowSettings {
        exit_keywords: vec!["exit".to_string(), "quit".to_string(), "bye".to_string()],
        budget,
        diagram_requires_research,
    }
}

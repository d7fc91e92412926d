//! In-crate fixtures for step-level tests

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::TaskKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{AgentFactory, Workflow, WorkflowSettings};
use crate::llm::{self, LLMProvider, LLMResponse, Message, ToolSpec};
use crate::services::{
    DiagramRenderer, PriceCatalog, PriceDimension, RenderOutcome, SearchBackend, Services,
};

/// Answers every call with the same text and counts the calls
pub(crate) struct FixedProvider {
    reply: String,
    calls: AtomicUsize,
}

impl FixedProvider {
    pub(crate) fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn estimated_cost(&self, _tokens: usize) -> f64 {
        0.0
    }

    async fn generate(&self, _messages: &[Message], _tools: &[ToolSpec]) -> llm::Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LLMResponse::answer(self.reply.clone()))
    }
}

struct Offline;

#[async_trait]
impl DiagramRenderer for Offline {
    async fn render(&self, _session: &str, _description: &str) -> Result<RenderOutcome, EngineError> {
        Err(EngineError::external("render", "offline"))
    }

    async fn check(&self, _session: &str) -> Result<RenderOutcome, EngineError> {
        Err(EngineError::external("render", "offline"))
    }

    async fn repair(&self, _session: &str, _error: &str) -> Result<RenderOutcome, EngineError> {
        Err(EngineError::external("render", "offline"))
    }
}

#[async_trait]
impl SearchBackend for Offline {
    async fn search(&self, _query: &str) -> Result<Vec<String>, EngineError> {
        Err(EngineError::external("search", "offline"))
    }
}

#[async_trait]
impl PriceCatalog for Offline {
    async fn search(&self, _description: &str) -> Result<Vec<String>, EngineError> {
        Err(EngineError::external("pricing", "offline"))
    }

    async fn price(&self, _service: &str) -> Result<Vec<PriceDimension>, EngineError> {
        Err(EngineError::external("pricing", "offline"))
    }
}

/// A workflow over `provider` whose collaborators are all unreachable
pub(crate) fn workflow(provider: Arc<FixedProvider>) -> Workflow {
    let services = Services {
        renderer: Arc::new(Offline),
        search: Arc::new(Offline),
        prices: Arc::new(Offline),
        reports_dir: PathBuf::from("/nonexistent/reports"),
    };
    let factory = AgentFactory::new(provider, services, TaskKind::ALL.to_vec(), 4000);
    let settings = WorkflowSettings {
        exit_keywords: vec!["exit".to_string(), "quit".to_string(), "bye".to_string()],
        budget: Duration::from_secs(30),
        diagram_requires_research: false,
    };
    Workflow::with_session_id("step-test", factory, settings)
}

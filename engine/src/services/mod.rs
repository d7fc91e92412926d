//! External collaborators
//!
//! Everything the task agents reach outside the process for: diagram
//! rendering, knowledge-base search and the price catalog. Each sits behind
//! a trait so sessions can be driven against in-memory fakes.

pub mod pricing;
pub mod render;
pub mod search;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::LLMProvider;

pub use pricing::{HttpPriceCatalog, PriceCatalog, PriceDimension};
pub use render::{session_slug, DiagramRenderer, PythonDiagramRenderer, RenderOutcome};
pub use search::{HttpSearchBackend, SearchBackend};

/// Handles shared by every session built from one config. Per-session
/// state lives in the session, never in a collaborator; the renderer keys
/// its files by session id.
#[derive(Clone)]
pub struct Services {
    pub renderer: Arc<dyn DiagramRenderer>,
    pub search: Arc<dyn SearchBackend>,
    pub prices: Arc<dyn PriceCatalog>,

    /// Where the report agent writes session reports
    pub reports_dir: PathBuf,
}

impl Services {
    pub fn from_config(config: &Config, provider: Arc<dyn LLMProvider>) -> Self {
        let request_timeout = Duration::from_secs(config.llm.request_timeout_secs);

        Self {
            renderer: Arc::new(PythonDiagramRenderer::new(
                provider,
                config.services.python.clone(),
                config.services.work_dir.clone(),
                Duration::from_secs(config.services.render_timeout_secs),
            )),
            search: Arc::new(HttpSearchBackend::new(
                config.services.rag_url.clone(),
                request_timeout,
            )),
            prices: Arc::new(HttpPriceCatalog::new(
                config.services.pricing_url.clone(),
                request_timeout,
            )),
            reports_dir: config.core.data_dir.join("reports"),
        }
    }
}

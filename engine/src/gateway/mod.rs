//! HTTP gateway
//!
//! Line-oriented access to concierge sessions:
//! - POST /v1/concierge - One line of input in, the turn's replies out
//! - GET /health - Liveness probe
//!
//! Each session owns its own workflow behind its own lock, so two requests
//! for one session are handled one after the other while different
//! sessions proceed independently. Sessions idle past `idle_secs` are
//! dropped, and the table never holds more than `max_sessions`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::errors::{ConciergeErrorExt, EngineError};
use sdk::types::{ConciergeRequest, ConciergeResponse};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::LLMProvider;
use crate::services::Services;
use crate::workflow::{AgentFactory, Turn, Workflow, WorkflowSettings};

struct SessionEntry {
    workflow: Arc<Mutex<Workflow>>,
    last_used: Instant,
}

type SessionMap = HashMap<String, SessionEntry>;

const DEFAULT_IDLE: Duration = Duration::from_secs(1800);
const DEFAULT_MAX_SESSIONS: usize = 256;

/// Gateway state shared across handlers
#[derive(Clone)]
pub struct GatewayState {
    sessions: Arc<Mutex<SessionMap>>,
    factory: AgentFactory,
    settings: WorkflowSettings,
    idle: Duration,
    max_sessions: usize,
}

impl GatewayState {
    pub fn new(factory: AgentFactory, settings: WorkflowSettings) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            factory,
            settings,
            idle: DEFAULT_IDLE,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Drop sessions idle for `idle`, and keep at most `max_sessions`
    pub fn with_limits(mut self, idle: Duration, max_sessions: usize) -> Self {
        self.idle = idle;
        self.max_sessions = max_sessions.max(1);
        self
    }

    pub fn from_config(config: &Config, provider: Arc<dyn LLMProvider>) -> Self {
        let services = Services::from_config(config, Arc::clone(&provider));
        Self::new(
            AgentFactory::new(
                provider,
                services,
                config.workflow.agents.clone(),
                config.workflow.memory_tokens,
            ),
            WorkflowSettings::from_config(&config.workflow),
        )
        .with_limits(
            Duration::from_secs(config.gateway.idle_secs),
            config.gateway.max_sessions,
        )
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Existing session for `id`, or a fresh one (true when created)
    async fn checkout(&self, id: Option<String>) -> (String, Arc<Mutex<Workflow>>, bool) {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        let idle = self.idle;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) < idle);
        if sessions.len() < before {
            info!(evicted = before - sessions.len(), "Idle sessions dropped");
        }

        if let Some(id) = &id {
            if let Some(existing) = sessions.get_mut(id) {
                existing.last_used = now;
                return (id.clone(), Arc::clone(&existing.workflow), false);
            }
        }

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            info!(session = %oldest, "Session table full, least recently used session dropped");
        }

        let workflow = match id {
            Some(id) => Workflow::with_session_id(id, self.factory.clone(), self.settings.clone()),
            None => Workflow::new(self.factory.clone(), self.settings.clone()),
        };
        let id = workflow.session_id().to_string();
        let handle = Arc::new(Mutex::new(workflow));
        sessions.insert(
            id.clone(),
            SessionEntry {
                workflow: Arc::clone(&handle),
                last_used: now,
            },
        );
        info!(session = %id, "Session created");
        (id, handle, true)
    }

    async fn forget(&self, id: &str) {
        if self.sessions.lock().await.remove(id).is_some() {
            debug!(session = %id, "Session removed");
        }
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/concierge", post(concierge_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(
                    |request: &axum::http::Request<_>| {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                        )
                    },
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl+C
pub async fn serve(config: &Config, provider: Arc<dyn LLMProvider>) -> anyhow::Result<()> {
    let state = GatewayState::from_config(config, provider);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid gateway address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Concierge gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Gateway shutting down");
        })
        .await?;

    Ok(())
}

async fn health_handler(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.session_count().await,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn concierge_handler(
    State(state): State<GatewayState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<ConciergeResponse>, Response> {
    let request: ConciergeRequest = serde_json::from_value(payload).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing 'input' field"})),
        )
            .into_response()
    })?;

    if request.input.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "'input' must not be empty"})),
        )
            .into_response());
    }

    let (session_id, handle, created) = state.checkout(request.session_id.clone()).await;
    let mut workflow = handle.lock().await;

    let result = run_turn(&mut workflow, &request, created).await;
    let finished = workflow.is_finished();
    drop(workflow);

    if finished {
        state.forget(&session_id).await;
    }

    match result {
        Ok(replies) => Ok(Json(ConciergeResponse {
            session_id,
            response: replies.join("\n"),
            finished,
        })),
        Err(e) => {
            warn!(session = %session_id, error = %e, "Concierge turn failed");
            Err((
                status_for(&e),
                Json(json!({
                    "error": e.user_hint(),
                    "session_id": session_id,
                    "finished": finished,
                })),
            )
                .into_response())
        }
    }
}

async fn run_turn(
    workflow: &mut Workflow,
    request: &ConciergeRequest,
    created: bool,
) -> Result<Vec<String>, EngineError> {
    if created {
        return Ok(workflow.start(Some(request.input.clone())).await?.replies);
    }

    let mut replies = Vec::new();
    if request.reset {
        let turn: Turn = workflow.reset().await?;
        replies.extend(turn.replies);
    }
    replies.extend(workflow.submit(&request.input).await?.replies);
    Ok(replies)
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        EngineError::NotAwaitingInput => StatusCode::CONFLICT,
        EngineError::SessionFinished => StatusCode::GONE,
        EngineError::WorkflowTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        EngineError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

//! Knowledge-base search backend

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Return the passages most relevant to `query`
    async fn search(&self, query: &str) -> Result<Vec<String>, EngineError>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    passages: Vec<String>,
}

/// `POST {url} {"query": ...}` returning `{"passages": [...]}`
#[derive(Debug, Clone)]
pub struct HttpSearchBackend {
    url: String,
    client: reqwest::Client,
}

impl HttpSearchBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, query: &str) -> Result<Vec<String>, EngineError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SearchRequest { query })
            .send()
            .await
            .map_err(|e| EngineError::external("search", e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::external(
                "search",
                format!("HTTP {}", response.status()),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| EngineError::external("search", format!("bad response: {}", e)))?;

        tracing::debug!(passages = body.passages.len(), "Search completed");
        Ok(body.passages)
    }
}

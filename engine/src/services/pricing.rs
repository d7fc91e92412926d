//! Service price catalog

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One priced dimension of a service (e.g. per GB-month of storage)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDimension {
    pub description: String,
    pub price_usd: String,
    pub unit: String,
}

impl fmt::Display for PriceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ${} per {}", self.description, self.price_usd, self.unit)
    }
}

#[async_trait]
pub trait PriceCatalog: Send + Sync {
    /// Service names matching a free-text description
    async fn search(&self, description: &str) -> Result<Vec<String>, EngineError>;

    /// On-demand price dimensions for an exact service name
    async fn price(&self, service: &str) -> Result<Vec<PriceDimension>, EngineError>;
}

#[derive(Debug, Deserialize)]
struct ServicesResponse {
    #[serde(default)]
    services: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    prices: Vec<PriceDimension>,
}

/// HTTP catalog:
/// - `GET {base}/services?query=...` → `{"services": [...]}`
/// - `GET {base}/price?service=...` → `{"prices": [...]}`
#[derive(Debug, Clone)]
pub struct HttpPriceCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPriceCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, EngineError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| EngineError::external("pricing", e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::external(
                "pricing",
                format!("HTTP {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::external("pricing", format!("bad response: {}", e)))
    }
}

#[async_trait]
impl PriceCatalog for HttpPriceCatalog {
    async fn search(&self, description: &str) -> Result<Vec<String>, EngineError> {
        let body: ServicesResponse = self.get("services", &[("query", description)]).await?;
        Ok(body.services)
    }

    async fn price(&self, service: &str) -> Result<Vec<PriceDimension>, EngineError> {
        let body: PricesResponse = self.get("price", &[("service", service)]).await?;
        Ok(body.prices)
    }
}

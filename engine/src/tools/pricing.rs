//! Price lookup tools
//!
//! Users rarely know the catalog's exact service names, so lookup is two
//! steps: find candidate names, then price one of them.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::ToolArgs;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::agent::tool::invalid_args;
use crate::agent::{Tool, ToolScope};
use crate::services::PriceCatalog;
use crate::workflow::context::scratch;

pub struct SearchForServiceTool {
    catalog: Arc<dyn PriceCatalog>,
}

impl SearchForServiceTool {
    pub fn new(catalog: Arc<dyn PriceCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for SearchForServiceTool {
    fn name(&self) -> &str {
        "search_for_service"
    }

    fn description(&self) -> &str {
        "Find exact catalog service names matching a description"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": { "type": "string", "description": "The service the user means, in their words" }
            },
            "required": ["description"]
        })
    }

    async fn invoke(&self, args: ToolArgs, _scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let description = args
            .param_str("description")
            .map_err(|e| invalid_args(self.name(), e))?;

        let names = self.catalog.search(&description).await?;
        if names.is_empty() {
            Ok(format!("No services match '{}'.", description))
        } else {
            Ok(format!("Matching services: {}", names.join(", ")))
        }
    }
}

pub struct LookupPriceTool {
    catalog: Arc<dyn PriceCatalog>,
}

impl LookupPriceTool {
    pub fn new(catalog: Arc<dyn PriceCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for LookupPriceTool {
    fn name(&self) -> &str {
        "lookup_price"
    }

    fn description(&self) -> &str {
        "Get the on-demand prices of a service by its exact catalog name"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service": { "type": "string", "description": "Exact name returned by search_for_service" }
            },
            "required": ["service"]
        })
    }

    async fn invoke(&self, args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let service = args
            .param_str("service")
            .map_err(|e| invalid_args(self.name(), e))?;

        let prices = self.catalog.price(&service).await?;
        if prices.is_empty() {
            return Ok(format!("No prices found for '{}'.", service));
        }

        scope.state.set_scratch(
            scratch::LAST_PRICE_LOOKUP,
            json!({ "service": service, "prices": prices }),
        );

        let lines: Vec<String> = prices.iter().map(|p| format!("- {}", p)).collect();
        Ok(format!("{}:\n{}", service, lines.join("\n")))
    }
}

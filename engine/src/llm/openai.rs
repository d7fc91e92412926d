//! OpenAI chat-completions provider with native function calling.
//!
//! The API key is read from the environment variable named by
//! `llm.openai.api_key_env` on every request, so a rotated key is picked up
//! without a restart.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{FinalAnswer, LLMError, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolSpec};
use crate::config::OpenAIConfig;

pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn api_key(&self) -> Result<String, LLMError> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LLMError::AuthenticationFailed(format!(
                    "environment variable {} is not set",
                    self.config.api_key_env
                ))
            })
    }

    fn convert_message(msg: &Message) -> Value {
        match msg.role {
            MessageRole::Tool => json!({
                "role": "tool",
                "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
                "content": msg.content,
            }),
            MessageRole::Assistant if !msg.tool_calls.is_empty() => json!({
                "role": "assistant",
                "content": if msg.content.is_empty() { Value::Null } else { json!(msg.content) },
                "tool_calls": msg.tool_calls.iter().map(|tc| json!({
                    "id": tc.id,
                    "type": "function",
                    "function": { "name": tc.name, "arguments": tc.arguments },
                })).collect::<Vec<_>>(),
            }),
            _ => json!({
                "role": msg.role.to_string(),
                "content": msg.content,
            }),
        }
    }

    fn parse_response(data: &Value) -> Result<LLMResponse, LLMError> {
        let message = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| LLMError::ParseError("No message in response".to_string()))?;

        if let Some(raw_calls) = message.get("tool_calls").and_then(|c| c.as_array()) {
            let mut calls = Vec::with_capacity(raw_calls.len());
            for raw in raw_calls {
                let function = raw
                    .get("function")
                    .ok_or_else(|| LLMError::ParseError("tool call without function".to_string()))?;
                let name = function
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| LLMError::ParseError("tool call without name".to_string()))?;
                let arguments = match function.get("arguments") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => "{}".to_string(),
                };
                let id = raw
                    .get("id")
                    .and_then(|i| i.as_str())
                    .map(String::from)
                    .unwrap_or_else(super::new_call_id);
                calls.push(ToolCall::new(id, name, arguments));
            }
            if !calls.is_empty() {
                return Ok(LLMResponse::ToolCalls { calls });
            }
        }

        match message.get("content").and_then(|c| c.as_str()) {
            Some(content) => Ok(LLMResponse::FinalAnswer(FinalAnswer::new(content))),
            None => Err(LLMError::ParseError("Empty content".to_string())),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_local(&self) -> bool {
        false
    }

    fn estimated_cost(&self, tokens: usize) -> f64 {
        // Approx $0.002 per 1k tokens for gpt-4o-mini
        (tokens as f64 / 1000.0) * 0.002
    }

    async fn check_health(&self) -> bool {
        self.api_key().is_ok()
    }

    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> super::Result<LLMResponse> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages.iter().map(Self::convert_message).collect::<Vec<_>>(),
        });
        if !tools.is_empty() {
            payload["tools"] = Value::Array(tools.iter().map(ToolSpec::to_function_json).collect());
        }

        tracing::debug!(model = %self.config.model, messages = messages.len(), tools = tools.len(), "OpenAI request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                500..=599 => LLMError::ProviderUnavailable(format!("HTTP {}: {}", status, text)),
                _ => LLMError::InvalidRequest(text),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        Self::parse_response(&data)
    }
}

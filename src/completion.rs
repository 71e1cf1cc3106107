//! Chat-completion client for the Workers AI `/ai/run/{model}` endpoint.
//!
//! Different models behind this endpoint answer with different response
//! shapes, so extraction tries an ordered list of schemas and takes the
//! first match: a `response` string, OpenAI-style `choices`, an
//! `output_text` string, then a serialized fallback.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// Generation parameters passed through to the service verbatim.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub reasoning_effort: String,
}

impl From<&RagConfig> for GenerationParams {
    fn from(config: &RagConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            reasoning_effort: config.reasoning_effort.clone(),
        }
    }
}

/// Narrow seam over the external completion service.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Run one system + user exchange and return the answer text.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String>;
}

/// Workers AI chat-completion client.
pub struct WorkersAiCompletion {
    client: Client,
    run_url: String,
    api_token: String,
}

impl WorkersAiCompletion {
    pub fn new(client: Client, config: &RagConfig) -> Result<Self> {
        Ok(Self {
            client,
            run_url: format!(
                "{}/accounts/{}/ai/run/{}",
                config.base_url, config.account_id, config.chat_model
            ),
            api_token: config.resolve_api_token()?,
        })
    }

    /// Concatenate `text` fields from an OpenAI-style content-part array.
    fn join_content_parts(parts: &[Value]) -> String {
        parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect()
    }

    /// Extract the answer text, trying each known schema in order.
    /// The result object may sit at the document root or under `"result"`.
    fn extract_answer(body: &Value) -> String {
        let result = body.get("result").unwrap_or(body);

        if let Some(text) = result.get("response").and_then(|v| v.as_str()) {
            return text.to_string();
        }

        if let Some(content) = result
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
        {
            if let Some(text) = content.as_str() {
                return text.to_string();
            }
            if let Some(parts) = content.as_array() {
                return Self::join_content_parts(parts);
            }
        }

        if let Some(text) = result.get("output_text").and_then(|v| v.as_str()) {
            return text.to_string();
        }

        result.to_string()
    }
}

#[async_trait]
impl CompletionModel for WorkersAiCompletion {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String> {
        let body = json!({
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "reasoning_effort": params.reasoning_effort,
        });

        debug!(url = %self.run_url, max_tokens = params.max_tokens, "sending completion request");
        let response = self
            .client
            .post(&self.run_url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RagError::remote_service(status, body));
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| RagError::ResponseParse {
            message: format!("invalid JSON in completion response: {e}"),
        })?;
        Ok(Self::extract_answer(&json))
    }
}

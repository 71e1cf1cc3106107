//! Embedding client for the Workers AI `/ai/run/{model}` endpoint.
//!
//! Turns question text into a dense `Vec<f32>` with a single authenticated
//! round trip. No retries; failures surface to the pipeline unchanged.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// Narrow seam over the external embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a dense vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Workers AI embedding client.
pub struct WorkersAiEmbedder {
    client: Client,
    run_url: String,
    api_token: String,
}

impl WorkersAiEmbedder {
    pub fn new(client: Client, config: &RagConfig) -> Result<Self> {
        Ok(Self {
            client,
            run_url: format!(
                "{}/accounts/{}/ai/run/{}",
                config.base_url, config.account_id, config.embedding_model
            ),
            api_token: config.resolve_api_token()?,
        })
    }

    /// Pull the single result vector out of `result.data[0]`.
    fn extract_vector(body: &Value) -> Result<Vec<f32>> {
        let data = body
            .get("result")
            .and_then(|r| r.get("data"))
            .and_then(|d| d.get(0))
            .and_then(|v| v.as_array())
            .ok_or_else(|| RagError::ResponseParse {
                message: "missing result.data[0] vector in embedding response".to_string(),
            })?;
        data.iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    RagError::ResponseParse {
                        message: "non-numeric element in embedding vector".to_string(),
                    }
                })
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for WorkersAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RagError::EmptyQuery);
        }

        debug!(url = %self.run_url, chars = text.len(), "sending embedding request");
        let response = self
            .client
            .post(&self.run_url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "text": [text] }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RagError::remote_service(status, body));
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| RagError::ResponseParse {
            message: format!("invalid JSON in embedding response: {e}"),
        })?;
        Self::extract_vector(&json)
    }
}

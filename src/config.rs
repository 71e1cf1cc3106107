//! Configuration for the wikirag query core.
//!
//! Uses `figment` for layered configuration: defaults -> TOML file ->
//! `WIKIRAG_`-prefixed environment variables. The resulting value is passed
//! explicitly into [`RagPipeline::new`](crate::pipeline::RagPipeline::new);
//! nothing reads configuration through globals.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

/// Configuration for the RAG query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Cloudflare account id used in the `/accounts/{id}/ai/run/` path.
    #[serde(default)]
    pub account_id: String,
    /// API token. When unset, resolved from the env var in `api_token_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Environment variable consulted when `api_token` is not set.
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,
    /// Base URL of the AI gateway.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Chat model invoked for answer generation.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Embedding model; must match an `embedding_model.name` row in the store.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Maximum tokens for the completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature, passed through verbatim.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Reasoning effort level, passed through verbatim.
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: String,
    /// Number of chunks to retrieve per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Path to the pre-built SQLite vector store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Total request timeout applied to both network clients.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connect timeout applied to both network clients.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_api_token_env() -> String {
    "WIKIRAG_API_TOKEN".into()
}

fn default_base_url() -> String {
    "https://api.cloudflare.com/client/v4".into()
}

fn default_chat_model() -> String {
    "@cf/meta/llama-3.1-8b-instruct".into()
}

fn default_embedding_model() -> String {
    "@cf/baai/bge-m3".into()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_reasoning_effort() -> String {
    "low".into()
}

fn default_top_k() -> usize {
    5
}

fn default_db_path() -> PathBuf {
    PathBuf::from("wiki.sqlite")
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            api_token: None,
            api_token_env: default_api_token_env(),
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            reasoning_effort: default_reasoning_effort(),
            top_k: default_top_k(),
            db_path: default_db_path(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl RagConfig {
    /// Resolve the API token from the config or the configured env var.
    pub fn resolve_api_token(&self) -> Result<String> {
        self.api_token
            .clone()
            .or_else(|| std::env::var(&self.api_token_env).ok())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RagError::MissingCredential {
                var: self.api_token_env.clone(),
            })
    }
}

/// Load configuration: defaults -> optional TOML file -> `WIKIRAG_` env vars.
pub fn load_config(config_file: Option<&Path>) -> Result<RagConfig> {
    let mut figment = Figment::from(Serialized::defaults(RagConfig::default()));
    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed("WIKIRAG_").split("__"));
    Ok(figment.extract()?)
}

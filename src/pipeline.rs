//! The RAG query orchestrator.
//!
//! `answer()` runs a strictly sequential chain: embed the question, scan the
//! store for the top-k most similar chunks, build the grounded prompt, and
//! ask the completion model. No retries, no partial-result fallback; every
//! stage error propagates unchanged to the caller. Nothing is cached between
//! calls, and each call opens its own store connection.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::completion::{CompletionModel, GenerationParams, WorkersAiCompletion};
use crate::config::RagConfig;
use crate::embeddings::{Embedder, WorkersAiEmbedder};
use crate::error::{RagError, Result};
use crate::prompt::{build_context, build_prompt, system_preamble};
use crate::search::{RetrievedChunk, TopK, cosine, dot, l2_norm};
use crate::store::{ChunkSource, VectorStore, decode_vector};

/// Orchestrates embedding, retrieval, prompt assembly, and completion.
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    completion: Arc<dyn CompletionModel>,
    store: Arc<dyn ChunkSource>,
    embedding_model: String,
    top_k: usize,
    params: GenerationParams,
}

impl RagPipeline {
    /// Wire the pipeline against the real Workers AI clients and the SQLite
    /// store named in `config`. The HTTP transport is shared by both clients.
    pub fn new(config: &RagConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        let embedder = WorkersAiEmbedder::new(client.clone(), config)?;
        let completion = WorkersAiCompletion::new(client, config)?;
        let store = VectorStore::new(config.db_path.clone());
        Ok(Self::with_components(
            config,
            Arc::new(embedder),
            Arc::new(completion),
            Arc::new(store),
        ))
    }

    /// Wire the pipeline against explicit components. Tests use this to
    /// substitute fakes for the network and the store.
    pub fn with_components(
        config: &RagConfig,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionModel>,
        store: Arc<dyn ChunkSource>,
    ) -> Self {
        Self {
            embedder,
            completion,
            store,
            embedding_model: config.embedding_model.clone(),
            top_k: config.top_k,
            params: GenerationParams::from(config),
        }
    }

    /// Answer one question against the store.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let query_vec = self.embedder.embed(question).await?;
        let (model_id, dim) = self.store.resolve_model(&self.embedding_model)?;
        if query_vec.len() != dim {
            return Err(RagError::DimensionMismatch {
                expected: dim,
                actual: query_vec.len(),
            });
        }
        let query_norm = l2_norm(&query_vec);
        debug!(model_id, dim, top_k = self.top_k, "retrieving context");

        let mut topk = TopK::new(self.top_k);
        self.store.for_each_candidate(model_id, &mut |candidate| {
            let vec = decode_vector(&candidate.vec, dim)?;
            let score = cosine(dot(&query_vec, &vec), query_norm, candidate.norm);
            topk.push(RetrievedChunk {
                page_id: candidate.page_id,
                chunk_index: candidate.chunk_index,
                text: candidate.text,
                score,
            });
            Ok(())
        })?;

        let ranked = topk.into_ranked();
        info!(
            retrieved = ranked.len(),
            best_score = ranked.first().map(|c| c.score).unwrap_or(0.0),
            "retrieval complete"
        );

        let context = build_context(&ranked);
        let prompt = build_prompt(question, &context);
        self.completion
            .complete(system_preamble(), &prompt, &self.params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::store::{Candidate, encode_vector};

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.trim().is_empty() {
                return Err(RagError::EmptyQuery);
            }
            Ok(self.0.clone())
        }
    }

    /// Echoes the prompt back so tests can inspect what was assembled.
    struct EchoCompletion;

    #[async_trait]
    impl CompletionModel for EchoCompletion {
        async fn complete(
            &self,
            _system: &str,
            prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

    struct FakeSource {
        dim: usize,
        rows: Vec<(i64, i64, &'static str, Vec<f32>)>,
    }

    impl ChunkSource for FakeSource {
        fn resolve_model(&self, name: &str) -> Result<(i64, usize)> {
            if name == "@cf/baai/bge-m3" {
                Ok((1, self.dim))
            } else {
                Err(RagError::ModelNotFound {
                    name: name.to_string(),
                })
            }
        }

        fn for_each_candidate(
            &self,
            _model_id: i64,
            f: &mut dyn FnMut(Candidate) -> Result<()>,
        ) -> Result<()> {
            for (page_id, chunk_index, text, vec) in &self.rows {
                f(Candidate {
                    page_id: *page_id,
                    chunk_index: *chunk_index,
                    text: (*text).to_string(),
                    vec: encode_vector(vec),
                    norm: l2_norm(vec),
                })?;
            }
            Ok(())
        }
    }

    fn pipeline_with(dim: usize, query: Vec<f32>, rows: Vec<(i64, i64, &'static str, Vec<f32>)>) -> RagPipeline {
        let config = RagConfig {
            top_k: 2,
            ..Default::default()
        };
        RagPipeline::with_components(
            &config,
            Arc::new(FixedEmbedder(query)),
            Arc::new(EchoCompletion),
            Arc::new(FakeSource { dim, rows }),
        )
    }

    #[tokio::test]
    async fn test_new_wires_real_clients_with_timeouts() {
        let config = RagConfig {
            api_token: Some("tok".into()),
            request_timeout_secs: 5,
            connect_timeout_secs: 1,
            ..Default::default()
        };
        // Construction configures the transport; no I/O happens yet.
        assert!(RagPipeline::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_answer_rejects_blank_question() {
        let pipeline = pipeline_with(2, vec![1.0, 0.0], vec![]);
        let err = pipeline.answer("  \t ").await.unwrap_err();
        assert!(matches!(err, RagError::EmptyQuery));
    }

    #[tokio::test]
    async fn test_answer_dimension_mismatch() {
        let pipeline = pipeline_with(3, vec![1.0, 0.0], vec![]);
        let err = pipeline.answer("question").await.unwrap_err();
        match err {
            RagError::DimensionMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_answer_uses_best_chunks_in_prompt() {
        let rows = vec![
            (1, 0, "irrelevant text", vec![0.0, 1.0]),
            (2, 0, "wheat seeds cost 10g", vec![1.0, 0.0]),
            (2, 1, "somewhat related", vec![0.7, 0.7]),
        ];
        let pipeline = pipeline_with(2, vec![1.0, 0.0], rows);
        let prompt = pipeline.answer("price of wheat seeds?").await.unwrap();
        assert!(prompt.contains("price of wheat seeds?"));
        // Best-scoring chunk ranks first.
        assert!(prompt.contains("[Context 1]\nwheat seeds cost 10g"));
        assert!(prompt.contains("[Context 2]\nsomewhat related"));
        // top_k = 2: the worst chunk is dropped.
        assert!(!prompt.contains("irrelevant text"));
    }

    #[tokio::test]
    async fn test_answer_empty_store_uses_sentinel() {
        let pipeline = pipeline_with(2, vec![1.0, 0.0], vec![]);
        let prompt = pipeline.answer("anything?").await.unwrap();
        assert!(prompt.contains("(No context retrieved.)"));
    }

    #[tokio::test]
    async fn test_answer_unknown_model_propagates() {
        let config = RagConfig {
            embedding_model: "@cf/other/model".into(),
            ..Default::default()
        };
        let pipeline = RagPipeline::with_components(
            &config,
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Arc::new(EchoCompletion),
            Arc::new(FakeSource { dim: 2, rows: vec![] }),
        );
        let err = pipeline.answer("question").await.unwrap_err();
        assert!(matches!(err, RagError::ModelNotFound { .. }));
    }

    #[tokio::test]
    async fn test_answer_corrupt_blob_propagates_decode_error() {
        struct CorruptSource;
        impl ChunkSource for CorruptSource {
            fn resolve_model(&self, _name: &str) -> Result<(i64, usize)> {
                Ok((1, 2))
            }
            fn for_each_candidate(
                &self,
                _model_id: i64,
                f: &mut dyn FnMut(Candidate) -> Result<()>,
            ) -> Result<()> {
                f(Candidate {
                    page_id: 1,
                    chunk_index: 0,
                    text: "bad".into(),
                    vec: vec![0u8; 7],
                    norm: 1.0,
                })
            }
        }
        let config = RagConfig::default();
        let pipeline = RagPipeline::with_components(
            &config,
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Arc::new(EchoCompletion),
            Arc::new(CorruptSource),
        );
        let err = pipeline.answer("question").await.unwrap_err();
        assert!(matches!(err, RagError::VectorDecode { .. }));
    }
}

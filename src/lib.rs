//! # wikirag
//!
//! A retrieval-augmented generation (RAG) query core for grounded wiki Q&A.
//! Given a natural-language question it embeds the question via an external
//! embedding service, scans a pre-built SQLite table of chunk embeddings for
//! the top-k most similar chunks by cosine similarity, assembles a grounded
//! prompt, and asks an external chat-completion service for the answer.
//!
//! The store is read-only here; ingestion is an external concern. The UI
//! that displays answers is likewise external: it calls
//! [`RagPipeline::answer`] and renders the returned text or the propagated
//! error.

pub mod completion;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod search;
pub mod store;

// Re-export commonly used types at the crate root.
pub use completion::{CompletionModel, GenerationParams, WorkersAiCompletion};
pub use config::{RagConfig, load_config};
pub use embeddings::{Embedder, WorkersAiEmbedder};
pub use error::{RagError, Result};
pub use pipeline::RagPipeline;
pub use prompt::{NO_CONTEXT_SENTINEL, build_context, build_prompt, system_preamble};
pub use search::{RetrievedChunk, TopK, cosine, dot, l2_norm};
pub use store::{Candidate, ChunkSource, StoreStats, VectorStore, decode_vector, encode_vector};

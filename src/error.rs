//! Error types for the wikirag query core.
//!
//! Uses `thiserror` for structured error variants covering validation,
//! remote service calls, response parsing, vector decoding, and storage.
//! None of these are retried or recovered internally; every failure
//! surfaces synchronously to the caller of `answer()`.

/// Top-level error type for the wikirag library.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("question is empty")]
    EmptyQuery,

    #[error("remote service returned HTTP {status} ({reason}): {body}")]
    RemoteService {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("response parse error: {message}")]
    ResponseParse { message: String },

    #[error("vector blob length mismatch: expected {expected} bytes, got {actual}")]
    VectorDecode { expected: usize, actual: usize },

    #[error("embedding model not found: {name}")]
    ModelNotFound { name: String },

    #[error("query vector dimension mismatch: model expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("API token not configured and environment variable '{var}' not set")]
    MissingCredential { var: String },

    #[error("connection failed: {message}")]
    Connection { message: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),
}

impl RagError {
    /// Map a non-success HTTP response to a `RemoteService` error, capturing
    /// the numeric status, its canonical reason, and the raw body.
    pub fn remote_service(status: reqwest::StatusCode, body: String) -> Self {
        RagError::RemoteService {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            body,
        }
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Connection {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `RagError`.
pub type Result<T> = std::result::Result<T, RagError>;

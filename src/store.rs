//! Read-only access to the pre-built SQLite vector store.
//!
//! The store is created and maintained by the external ingestion tool; this
//! crate only resolves embedding-model metadata, scans candidate rows, and
//! decodes packed vector blobs. Connections are opened read-only, per query,
//! and dropped on every exit path.

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RagError, Result};

/// One embedding row joined to its chunk, produced during a scan.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub page_id: i64,
    pub chunk_index: i64,
    pub text: String,
    pub vec: Vec<u8>,
    pub norm: f32,
}

/// Row counts for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub pages: u64,
    pub chunks: u64,
    pub embeddings: u64,
}

/// Narrow interface over the persisted chunk/embedding table, so tests can
/// substitute an in-memory fake without file access.
pub trait ChunkSource: Send + Sync {
    /// Exact lookup of an embedding model by name; returns `(model_id, dim)`.
    fn resolve_model(&self, name: &str) -> Result<(i64, usize)>;

    /// Full scan of every embedding row for `model_id`, lazily row-by-row.
    /// Each call restarts the scan; the cursor is never shared across calls.
    fn for_each_candidate(
        &self,
        model_id: i64,
        f: &mut dyn FnMut(Candidate) -> Result<()>,
    ) -> Result<()>;
}

/// SQLite-backed [`ChunkSource`].
#[derive(Debug, Clone)]
pub struct VectorStore {
    db_path: PathBuf,
}

impl VectorStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    /// Page/chunk/embedding row counts.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.open()?;
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };
        Ok(StoreStats {
            pages: count("SELECT COUNT(*) FROM page")?,
            chunks: count("SELECT COUNT(*) FROM chunk")?,
            embeddings: count("SELECT COUNT(*) FROM embedding")?,
        })
    }
}

impl ChunkSource for VectorStore {
    fn resolve_model(&self, name: &str) -> Result<(i64, usize)> {
        let conn = self.open()?;
        let row = conn.query_row(
            "SELECT model_id, dim FROM embedding_model WHERE name = ?1",
            [name],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        );
        match row {
            Ok((model_id, dim)) => Ok((model_id, dim as usize)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RagError::ModelNotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn for_each_candidate(
        &self,
        model_id: i64,
        f: &mut dyn FnMut(Candidate) -> Result<()>,
    ) -> Result<()> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT c.page_id, c.chunk_index, c.text, e.vec, e.norm \
             FROM embedding e JOIN chunk c ON c.chunk_id = e.chunk_id \
             WHERE e.model_id = ?1",
        )?;
        let mut rows = stmt.query([model_id])?;
        let mut scanned = 0u64;
        while let Some(row) = rows.next()? {
            let candidate = Candidate {
                page_id: row.get(0)?,
                chunk_index: row.get(1)?,
                text: row.get(2)?,
                vec: row.get(3)?,
                norm: row.get::<_, f64>(4)? as f32,
            };
            scanned += 1;
            f(candidate)?;
        }
        debug!(model_id, scanned, "candidate scan complete");
        Ok(())
    }
}

/// Reinterpret a packed little-endian f32 blob as a vector of `dim` floats.
/// The blob must be exactly `dim * 4` bytes; bit patterns are preserved.
pub fn decode_vector(bytes: &[u8], dim: usize) -> Result<Vec<f32>> {
    if bytes.len() != dim * 4 {
        return Err(RagError::VectorDecode {
            expected: dim * 4,
            actual: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Pack a float vector into the store's little-endian blob format.
/// Inverse of [`decode_vector`]; matches the ingestion tool's layout.
pub fn encode_vector(vec: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

//! Bounded top-k similarity selection over a stream of scored candidates.
//!
//! The store is scanned linearly and each candidate is offered to a [`TopK`]
//! accumulator holding at most `k` entries. This is O(n*k), which is fine
//! because `k` is single-digit while the table scan dominates.

/// Floor applied to norms before division, so degenerate zero vectors
/// score near zero instead of dividing by zero.
const NORM_FLOOR: f32 = 1e-8;

/// A chunk retrieved for one query, held only until the prompt is built.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub page_id: i64,
    pub chunk_index: i64,
    pub text: String,
    pub score: f32,
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean (L2) norm.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn effective_norm(n: f32) -> f32 {
    if n <= 0.0 { NORM_FLOOR } else { n }
}

/// Cosine similarity from a precomputed dot product and the two norms.
/// Norms at or below zero are clamped to a small positive floor.
pub fn cosine(dot: f32, a_norm: f32, b_norm: f32) -> f32 {
    dot / (effective_norm(a_norm) * effective_norm(b_norm))
}

/// Bounded best-k accumulator.
///
/// Candidates are offered one at a time. While fewer than `k` are held, every
/// candidate is kept. Once full, the current minimum is replaced only when
/// the new candidate scores strictly higher, so ties keep the first-seen
/// entry. [`TopK::into_ranked`] sorts the survivors by descending score;
/// the sort is stable, so equal scores keep scan order.
#[derive(Debug)]
pub struct TopK {
    k: usize,
    entries: Vec<RetrievedChunk>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            entries: Vec::with_capacity(k),
        }
    }

    /// Offer one candidate to the working set.
    pub fn push(&mut self, candidate: RetrievedChunk) {
        if self.k == 0 {
            return;
        }
        if self.entries.len() < self.k {
            self.entries.push(candidate);
            return;
        }
        let (min_idx, min_score) = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.score))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap_or((0, f32::NEG_INFINITY));
        if candidate.score > min_score {
            self.entries[min_idx] = candidate;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the working set, sorted by descending score.
    pub fn into_ranked(mut self) -> Vec<RetrievedChunk> {
        self.entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.entries
    }
}

//! Cosine-similarity ranking of stored chunks against a query embedding.

use crate::models::{ScoredChunk, StoredChunk};

/// Hard ceiling on the number of chunks sent downstream, bounding the
/// prompt size regardless of what the caller asked for.
pub const MAX_TOP_K: usize = 12;

/// Clamp a caller-supplied K into `[1, MAX_TOP_K]`.
pub fn clamp_top_k(k: usize) -> usize {
    k.clamp(1, MAX_TOP_K)
}

/// Cosine similarity between two embedding vectors.
///
/// Computed over the common prefix when lengths differ. The denominator
/// is floored to 1.0 when it is zero, so degenerate all-zero embeddings
/// score 0 instead of producing NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..n {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    let denom = if denom == 0.0 { 1.0 } else { denom };

    dot / denom
}

/// Score chunks against a query embedding and return the top K,
/// descending. The sort is stable, so exact ties keep their original
/// (insertion) order.
pub fn rank_chunks(query_vec: &[f32], chunks: Vec<StoredChunk>, top_k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .into_iter()
        .map(|chunk| {
            let score = cosine_similarity(query_vec, &chunk.embedding);
            ScoredChunk { chunk, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    scored.truncate(clamp_top_k(top_k));
    scored
}

//! Ingestion pipeline: document text → chunks → embeddings → store.
//!
//! Chunks are embedded at the configured concurrency (default 1, i.e.
//! strictly sequential — a deliberate rate-limit tradeoff) and upserted
//! at their chunk index. Re-running without `reindex` skips chunks whose
//! stored content hash is unchanged, so retries cost no embedding calls.
//!
//! A shrinking document leaves stale tail chunks behind unless the
//! caller passes `reindex`, which deletes the full chunk set first.
//! Two concurrent ingestions of the same document are not serialized;
//! the uniqueness key makes that last-writer-wins per chunk index.

use crate::chunk::{chunk_text, token_estimate};
use crate::config::Config;
use crate::embedding::{embed_batch, EmbedError, Embedder};
use crate::error::PipelineError;
use crate::store::{hash_text, VectorStore};

/// Summary of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Chunks the document's text splits into.
    pub chunk_count: usize,
    /// Chunks that were embedded and written this run.
    pub embedded: usize,
    /// Chunks skipped because their stored hash matched.
    pub skipped: usize,
}

/// Ingest (or re-ingest) one completed document for `user_id`.
pub async fn ingest_document(
    store: &VectorStore,
    embedder: &dyn Embedder,
    config: &Config,
    user_id: &str,
    document_id: &str,
    reindex: bool,
) -> Result<IngestOutcome, PipelineError> {
    let doc = store
        .get_completed_document(user_id, document_id)
        .await
        .map_err(PipelineError::Internal)?
        .ok_or_else(|| PipelineError::NotFound("Document not found".to_string()))?;

    let text = doc.extracted_text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(PipelineError::BadRequest(
            "No extracted text to ingest".to_string(),
        ));
    }

    if reindex {
        store
            .delete_chunks_for_document(user_id, document_id)
            .await
            .map_err(PipelineError::Internal)?;
    }

    let pieces = chunk_text(&text, config.chunking.max_chars, config.chunking.overlap_chars);
    if pieces.is_empty() {
        return Err(PipelineError::BadRequest(
            "No chunks produced from text".to_string(),
        ));
    }

    // Decide which indices actually need an embedding call.
    let mut to_embed: Vec<(usize, &str, String)> = Vec::new();
    let mut skipped = 0usize;
    for (i, piece) in pieces.iter().enumerate() {
        let hash = hash_text(piece);
        if !reindex {
            let existing = store
                .chunk_hash(user_id, document_id, i as i64)
                .await
                .map_err(PipelineError::Internal)?;
            if existing.as_deref() == Some(hash.as_str()) {
                skipped += 1;
                continue;
            }
        }
        to_embed.push((i, piece.as_str(), hash));
    }

    let texts: Vec<String> = to_embed.iter().map(|(_, piece, _)| piece.to_string()).collect();
    let vectors = embed_batch(embedder, &texts, config.embedding.concurrency)
        .await
        .map_err(map_embed_err)?;

    for ((i, piece, hash), vector) in to_embed.iter().zip(vectors.iter()) {
        store
            .upsert_chunk(
                user_id,
                document_id,
                *i as i64,
                piece,
                vector,
                token_estimate(piece),
                hash,
            )
            .await
            .map_err(PipelineError::Internal)?;
    }

    let outcome = IngestOutcome {
        chunk_count: pieces.len(),
        embedded: to_embed.len(),
        skipped,
    };
    tracing::info!(
        document_id,
        chunks = outcome.chunk_count,
        embedded = outcome.embedded,
        skipped = outcome.skipped,
        reindex,
        "document ingested"
    );

    Ok(outcome)
}

fn map_embed_err(err: EmbedError) -> PipelineError {
    match err {
        EmbedError::Misconfigured(msg) => PipelineError::Misconfigured(msg),
        EmbedError::Unavailable(msg) => PipelineError::upstream(anyhow::anyhow!(msg)),
    }
}

/// CLI entry point: ingest and print a summary.
pub async fn run_ingest(
    config: &Config,
    user_id: &str,
    document_id: &str,
    reindex: bool,
) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    let store = VectorStore::new(pool.clone());
    let embedder = crate::embedding::create_embedder(&config.embedding)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let outcome = ingest_document(&store, embedder.as_ref(), config, user_id, document_id, reindex)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!("ingest {}", document_id);
    println!("  chunks: {}", outcome.chunk_count);
    println!("  embedded: {}", outcome.embedded);
    println!("  skipped (unchanged): {}", outcome.skipped);
    println!("ok");

    pool.close().await;
    Ok(())
}

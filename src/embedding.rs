//! Embedding client abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and concrete implementations:
//! - **[`DisabledEmbedder`]** — returns `Misconfigured`; used when
//!   embeddings are not configured.
//! - **[`GeminiEmbedder`]** — calls the Gemini `embedContent` API.
//!
//! Also provides the vector codec used for SQLite BLOB storage:
//! [`vec_to_blob`] and [`blob_to_vec`] encode embedding vectors as
//! little-endian `f32` bytes.
//!
//! There is no retry logic at this layer; retries, if any, belong to the
//! caller. Batch embedding ([`embed_batch`]) runs at a configurable
//! concurrency limit whose default of 1 keeps calls strictly sequential.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Duration;
use thiserror::Error;

use crate::config::EmbeddingConfig;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// A required credential is absent or the provider is disabled.
    /// Callers surface this distinctly so operators can tell a broken
    /// deployment apart from a transient upstream failure.
    #[error("{0}")]
    Misconfigured(String),

    /// The service could not be reached, timed out, or returned an
    /// unusable response.
    #[error("embedding service failure: {0}")]
    Unavailable(String),
}

/// An external text-to-vector service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-004"`).
    fn model_name(&self) -> &str;
    /// Embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Convert one text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Embed a batch of texts, preserving input order.
///
/// `concurrency` bounds the number of in-flight calls; at the default of
/// 1 this degenerates to a plain sequential loop, which is the
/// rate-limit-safe contract ingestion relies on.
pub async fn embed_batch(
    embedder: &dyn Embedder,
    texts: &[String],
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    let concurrency = concurrency.max(1);

    if concurrency == 1 {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(embedder.embed(text).await?);
        }
        return Ok(out);
    }

    let mut futures = Vec::with_capacity(texts.len());
    for text in texts {
        futures.push(embedder.embed(text));
    }
    stream::iter(futures)
        .buffered(concurrency)
        .try_collect()
        .await
}

// ============ Disabled provider ============

/// A no-op embedder that always fails with `Misconfigured`.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Misconfigured(
            "Embedding provider is disabled. Set [embedding] provider in config.".to_string(),
        ))
    }
}

// ============ Gemini provider ============

/// Embedding client for the Gemini `embedContent` endpoint.
///
/// Requires the `GEMINI_API_KEY` environment variable. One text per
/// call; the upstream batch endpoint behaves inconsistently across
/// models, so batching is handled by [`embed_batch`] instead.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            EmbedError::Misconfigured("GEMINI_API_KEY environment variable not set".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dims: config.dims,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:embedContent",
            self.model
        )
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let body = serde_json::json!({
            "content": { "parts": [{ "text": text }] }
        });

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Unavailable(format!(
                "embedding API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;

        let values = json
            .get("embedding")
            .and_then(|e| e.get("values"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                EmbedError::Unavailable("invalid embedding response: missing embedding.values".to_string())
            })?;

        Ok(values
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }
}

/// Create the embedder named by the configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbedError> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "gemini" => Ok(Box::new(GeminiEmbedder::new(config)?)),
        other => Err(EmbedError::Misconfigured(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Vector codec ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

//! Owner-scoped document and chunk storage over SQLite.
//!
//! Every query filters by `user_id`; nothing in this module can read or
//! write another user's rows. Chunk writes are idempotent upserts keyed
//! by `(user_id, document_id, chunk_index)`, which is what makes
//! re-running an ingestion safe under retry — correctness comes from the
//! uniqueness constraint, not from write ordering.

use anyhow::Result;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{Document, DocumentStatus, StoredChunk};

#[derive(Clone)]
pub struct VectorStore {
    pool: SqlitePool,
}

impl VectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ============ Documents ============

    /// Insert a document owned by `user_id`. Returns the new id.
    pub async fn insert_document(
        &self,
        user_id: &str,
        name: &str,
        status: DocumentStatus,
        extracted_text: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO documents (id, user_id, name, status, extracted_text, error_message, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(status.as_str())
        .bind(extracted_text)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Fetch one of the owner's documents, only if it is `completed`.
    pub async fn get_completed_document(
        &self,
        user_id: &str,
        document_id: &str,
    ) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, status, extracted_text, error_message, created_at, updated_at
            FROM documents
            WHERE id = ? AND user_id = ? AND status = 'completed'
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_document))
    }

    /// All of the owner's completed documents, optionally restricted to
    /// an explicit id scope. Ids outside the owner's documents are
    /// silently absent from the result.
    pub async fn completed_documents(
        &self,
        user_id: &str,
        scope: Option<&[String]>,
    ) -> Result<Vec<Document>> {
        match scope {
            None => {
                let rows = sqlx::query(
                    r#"
                    SELECT id, user_id, name, status, extracted_text, error_message, created_at, updated_at
                    FROM documents
                    WHERE user_id = ? AND status = 'completed'
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
                Ok(rows.into_iter().map(row_to_document).collect())
            }
            Some(ids) => {
                let mut docs = Vec::new();
                for id in ids {
                    if let Some(doc) = self.get_completed_document(user_id, id).await? {
                        docs.push(doc);
                    }
                }
                Ok(docs)
            }
        }
    }

    /// All of the owner's documents regardless of status.
    pub async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, status, extracted_text, error_message, created_at, updated_at
            FROM documents
            WHERE user_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_document).collect())
    }

    // ============ Chunks ============

    /// Idempotent write keyed by `(user_id, document_id, chunk_index)`.
    /// Replaces content, embedding, and hash if the key already exists.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_chunk(
        &self,
        user_id: &str,
        document_id: &str,
        chunk_index: i64,
        content: &str,
        embedding: &[f32],
        token_estimate: i64,
        hash: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO chunks (id, user_id, document_id, chunk_index, content, embedding, token_estimate, hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, document_id, chunk_index) DO UPDATE SET
                content = excluded.content,
                embedding = excluded.embedding,
                token_estimate = excluded.token_estimate,
                hash = excluded.hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(document_id)
        .bind(chunk_index)
        .bind(content)
        .bind(vec_to_blob(embedding))
        .bind(token_estimate)
        .bind(hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stored content hash at a chunk index, if the chunk exists. Used
    /// to skip re-embedding unchanged content during ingestion.
    pub async fn chunk_hash(
        &self,
        user_id: &str,
        document_id: &str,
        chunk_index: i64,
    ) -> Result<Option<String>> {
        let hash: Option<String> = sqlx::query_scalar(
            "SELECT hash FROM chunks WHERE user_id = ? AND document_id = ? AND chunk_index = ?",
        )
        .bind(user_id)
        .bind(document_id)
        .bind(chunk_index)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hash)
    }

    /// Delete every chunk for a document. Used before a full reindex.
    pub async fn delete_chunks_for_document(&self, user_id: &str, document_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE user_id = ? AND document_id = ?")
            .bind(user_id)
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_chunks_for_document(
        &self,
        user_id: &str,
        document_id: &str,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chunks WHERE user_id = ? AND document_id = ?",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Bulk fetch of all chunks for a document set, strictly filtered by
    /// owner, ordered by (document, chunk index).
    pub async fn chunks_for_documents(
        &self,
        user_id: &str,
        document_ids: &[String],
    ) -> Result<Vec<StoredChunk>> {
        let mut chunks = Vec::new();

        for document_id in document_ids {
            let rows = sqlx::query(
                r#"
                SELECT id, user_id, document_id, chunk_index, content, embedding
                FROM chunks
                WHERE user_id = ? AND document_id = ?
                ORDER BY chunk_index ASC
                "#,
            )
            .bind(user_id)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;

            for row in rows {
                let blob: Vec<u8> = row.get("embedding");
                chunks.push(StoredChunk {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    document_id: row.get("document_id"),
                    chunk_index: row.get("chunk_index"),
                    content: row.get("content"),
                    embedding: blob_to_vec(&blob),
                });
            }
        }

        Ok(chunks)
    }
}

fn row_to_document(row: sqlx::sqlite::SqliteRow) -> Document {
    let status: String = row.get("status");
    Document {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        status: DocumentStatus::parse(&status).unwrap_or(DocumentStatus::Error),
        extracted_text: row.get("extracted_text"),
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// SHA-256 hex digest of chunk content, used for staleness detection.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

//! Core data models for the ingestion and question-answering pipeline.

use serde::{Deserialize, Serialize};

/// Processing state of an uploaded document.
///
/// Only `Completed` documents are eligible for chunking or QA context;
/// the other states exist so callers can surface progress and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Completed,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploading" => Some(DocumentStatus::Uploading),
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "error" => Some(DocumentStatus::Error),
            _ => None,
        }
    }
}

/// A user-owned text source.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub status: DocumentStatus,
    pub extracted_text: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An indexed slice of a document's text with its embedding, as read
/// back from the store.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub user_id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A stored chunk paired with its similarity score against a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub score: f32,
}

/// Supporting evidence for part of an answer. Derived per-request,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "documentName")]
    pub document_name: String,
    pub snippet: String,
    #[serde(rename = "pageNumber", default)]
    pub page_number: u32,
}

/// The normalized result of a QA request.
#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

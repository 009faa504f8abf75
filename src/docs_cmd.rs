//! Document management CLI commands.
//!
//! In a full deployment, documents arrive through the upload/extraction
//! service and land here already `completed`. These commands stand in
//! for that collaborator so the pipeline can be operated and tested
//! locally from plain text files.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::models::DocumentStatus;
use crate::store::VectorStore;

/// Insert a completed document from a local text file.
pub async fn run_docs_add(config: &Config, user_id: &str, name: &str, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if text.trim().is_empty() {
        anyhow::bail!("{} contains no text", file.display());
    }

    let pool = db::connect(config).await?;
    let store = VectorStore::new(pool.clone());

    let id = store
        .insert_document(user_id, name, DocumentStatus::Completed, Some(&text))
        .await?;

    println!("docs add");
    println!("  id: {}", id);
    println!("  name: {}", name);
    println!("  chars: {}", text.chars().count());
    println!("ok");

    pool.close().await;
    Ok(())
}

/// List all of a user's documents with status and chunk counts.
pub async fn run_docs_list(config: &Config, user_id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = VectorStore::new(pool.clone());

    let docs = store.list_documents(user_id).await?;
    if docs.is_empty() {
        println!("No documents.");
        pool.close().await;
        return Ok(());
    }

    for doc in &docs {
        let chunk_count = store.count_chunks_for_document(user_id, &doc.id).await?;
        let chars = doc
            .extracted_text
            .as_ref()
            .map(|t| t.chars().count())
            .unwrap_or(0);
        println!(
            "{}  [{}]  {}  ({} chars, {} chunks)",
            doc.id,
            doc.status.as_str(),
            doc.name,
            chars,
            chunk_count
        );
    }

    pool.close().await;
    Ok(())
}

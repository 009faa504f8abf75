//! Prompt context assembly.
//!
//! Renders ranked chunks (or, when a document was never ingested, raw
//! document text) into a single bounded context block with document-name
//! attribution. Blocks are joined with a dedicated separator line that
//! will not occur naturally inside normalized chunk content.

use std::collections::HashMap;

use crate::models::{Document, ScoredChunk};

/// Separator between context blocks.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Suffix appended to content cut by a character cap, so downstream
/// consumers can detect that truncation occurred.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Truncate to `max` characters, appending the truncation marker when
/// anything was cut. Character-based, never byte-based.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Render ranked chunks into a context block, labelling each with a
/// 1-based sequence number and its parent document's display name.
pub fn assemble_chunk_context(
    ranked: &[ScoredChunk],
    doc_names: &HashMap<String, String>,
) -> String {
    ranked
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            let name = doc_names
                .get(&scored.chunk.document_id)
                .map(String::as_str)
                .unwrap_or(scored.chunk.document_id.as_str());
            format!("Chunk {} (doc: {}):\n{}", i + 1, name, scored.chunk.content)
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Fallback context for documents that were never ingested into chunks:
/// each document's raw extracted text, capped per document and limited
/// to the first `doc_limit` documents.
pub fn assemble_raw_context(docs: &[Document], per_doc_chars: usize, doc_limit: usize) -> String {
    docs.iter()
        .take(doc_limit)
        .enumerate()
        .map(|(i, doc)| {
            let text = doc.extracted_text.as_deref().unwrap_or("");
            format!(
                "Document {}: {}\n{}",
                i + 1,
                doc.name,
                truncate_chars(text, per_doc_chars)
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentStatus, StoredChunk};

    fn scored(doc_id: &str, index: i64, content: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: StoredChunk {
                id: format!("c{}", index),
                user_id: "u1".to_string(),
                document_id: doc_id.to_string(),
                chunk_index: index,
                content: content.to_string(),
                embedding: vec![0.0],
            },
            score: 0.5,
        }
    }

    fn doc(id: &str, name: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: name.to_string(),
            status: DocumentStatus::Completed,
            extracted_text: Some(text.to_string()),
            error_message: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_chunk_context_labels_and_separator() {
        let names = HashMap::from([("d1".to_string(), "Biology Notes".to_string())]);
        let ctx = assemble_chunk_context(
            &[scored("d1", 0, "mitochondria"), scored("d1", 1, "ribosomes")],
            &names,
        );
        assert!(ctx.starts_with("Chunk 1 (doc: Biology Notes):\nmitochondria"));
        assert!(ctx.contains(CONTEXT_SEPARATOR));
        assert!(ctx.contains("Chunk 2 (doc: Biology Notes):\nribosomes"));
    }

    #[test]
    fn test_chunk_context_unknown_doc_falls_back_to_id() {
        let ctx = assemble_chunk_context(&[scored("d9", 0, "text")], &HashMap::new());
        assert!(ctx.contains("(doc: d9)"));
    }

    #[test]
    fn test_raw_context_caps_documents() {
        let docs: Vec<Document> = (0..8)
            .map(|i| doc(&format!("d{}", i), &format!("Doc {}", i), "body"))
            .collect();
        let ctx = assemble_raw_context(&docs, 1000, 5);
        assert!(ctx.contains("Document 5: Doc 4"));
        assert!(!ctx.contains("Doc 5"));
    }

    #[test]
    fn test_raw_context_truncates_with_marker() {
        let long = "x".repeat(500);
        let ctx = assemble_raw_context(&[doc("d1", "Long", &long)], 100, 5);
        assert!(ctx.contains(TRUNCATION_MARKER));
        // 100 kept chars plus the marker, nothing more of the body.
        assert!(!ctx.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_truncate_chars_noop_under_cap() {
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_chars_is_char_based() {
        let s = "ééééé";
        let out = truncate_chars(s, 3);
        assert!(out.starts_with("ééé"));
        assert!(out.ends_with(TRUNCATION_MARKER));
    }
}

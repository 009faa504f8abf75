//! Answer synthesis: prompt construction, tolerant response parsing,
//! and citation normalization.
//!
//! The generative model is asked for a JSON object but is not trusted to
//! return one. Parsing is multi-stage — strip a fenced code block if
//! present, extract the substring between the outermost braces, then
//! parse — and a total failure degrades to using the raw text as the
//! answer rather than failing the request. The internal result is the
//! tagged [`ParseOutcome`] even though both arms normalize to the same
//! external shape.

use std::collections::HashMap;

use crate::context::truncate_chars;
use crate::models::{Citation, ScoredChunk};

/// Upper bound on citations returned per answer, regardless of how many
/// the model proposes.
pub const MAX_CITATIONS: usize = 3;

/// Leading-snippet length for citations synthesized from chunks.
pub const CITATION_SNIPPET_CHARS: usize = 220;

const OUTPUT_SHAPE: &str = r#"Return ONLY JSON in this shape:
{
  "answer": "string",
  "citations": [
    { "documentName": "string", "snippet": "string", "pageNumber": 0 }
  ]
}"#;

/// Prompt for the chunk-context path.
pub fn build_chunk_prompt(context: &str, question: &str) -> String {
    let system = "You are an academic study assistant.\n\
        - Use only the provided chunks to answer.\n\
        - Be concise and structured.\n\
        - Include up to 3 citations with document name and a short snippet.";
    format!(
        "{}\n\nChunks:\n{}\n\nQuestion: {}\n\n{}",
        system, context, question, OUTPUT_SHAPE
    )
}

/// Prompt for the raw-document fallback path (documents exist but were
/// never ingested into chunks).
pub fn build_raw_prompt(context: &str, question: &str) -> String {
    let system = "You are an academic study assistant. Answer using only the \
        provided context. If unsure, say so.";
    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\n\n{}",
        system, context, question, OUTPUT_SHAPE
    )
}

/// Prompt when the user has no completed documents in scope. The
/// assistant still answers conversationally rather than erroring.
pub fn build_no_context_prompt(question: &str) -> String {
    let system = "You are an academic study assistant. The user has no study \
        documents available yet, so answer from general knowledge, and note \
        that uploading documents enables answers grounded in their material.";
    format!("{}\n\nQuestion: {}\n\n{}", system, question, OUTPUT_SHAPE)
}

/// Result of parsing the model's raw output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed {
        answer: String,
        citations: Vec<Citation>,
    },
    Unparsed {
        raw: String,
    },
}

impl ParseOutcome {
    /// Normalize to the external (answer, citations) shape.
    pub fn into_parts(self) -> (String, Vec<Citation>) {
        match self {
            ParseOutcome::Parsed { answer, citations } => (answer, citations),
            ParseOutcome::Unparsed { raw } => (raw, Vec::new()),
        }
    }
}

/// Strip the first fenced code block, if any, returning its body.
fn strip_code_fence(text: &str) -> &str {
    if let Some(open) = text.find("```") {
        let after = &text[open + 3..];
        // Skip an optional language tag line (e.g. "json").
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(close) = body.find("```") {
            return body[..close].trim();
        }
    }
    text
}

/// Extract the substring between the first `{` and the last `}`.
fn extract_json_object(text: &str) -> Option<&str> {
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if last < first {
        return None;
    }
    Some(&text[first..=last])
}

/// Tolerant multi-stage parse of the model's raw text output.
pub fn parse_model_reply(text: &str) -> ParseOutcome {
    let candidate = strip_code_fence(text);
    let object = extract_json_object(candidate).unwrap_or(candidate);

    match serde_json::from_str::<serde_json::Value>(object) {
        Ok(value) => {
            let answer = value
                .get("answer")
                .and_then(|a| a.as_str())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| text.to_string());
            let citations = value
                .get("citations")
                .and_then(|c| c.as_array())
                .map(|arr| normalize_citations(arr))
                .unwrap_or_default();
            ParseOutcome::Parsed { answer, citations }
        }
        Err(_) => ParseOutcome::Unparsed {
            raw: text.to_string(),
        },
    }
}

/// Normalize model-proposed citations: at most [`MAX_CITATIONS`],
/// `pageNumber` defaulting to 0, entries with neither a document name
/// nor a snippet dropped.
fn normalize_citations(arr: &[serde_json::Value]) -> Vec<Citation> {
    arr.iter()
        .take(MAX_CITATIONS)
        .filter_map(|v| {
            let document_name = v
                .get("documentName")
                .and_then(|x| x.as_str())
                .unwrap_or("")
                .trim()
                .to_string();
            let snippet = v
                .get("snippet")
                .and_then(|x| x.as_str())
                .unwrap_or("")
                .trim()
                .to_string();
            let page_number = v.get("pageNumber").and_then(|x| x.as_u64()).unwrap_or(0) as u32;

            if document_name.is_empty() && snippet.is_empty() {
                None
            } else {
                Some(Citation {
                    document_name,
                    snippet,
                    page_number,
                })
            }
        })
        .collect()
}

/// Synthesize citations from the top-ranked chunks when the model
/// provided none. Guarantees supporting material is cited whenever it
/// exists, independent of model compliance.
pub fn fallback_citations(
    ranked: &[ScoredChunk],
    doc_names: &HashMap<String, String>,
) -> Vec<Citation> {
    ranked
        .iter()
        .take(MAX_CITATIONS)
        .map(|scored| {
            let name = doc_names
                .get(&scored.chunk.document_id)
                .cloned()
                .unwrap_or_else(|| scored.chunk.document_id.clone());
            Citation {
                document_name: name,
                snippet: truncate_chars(&scored.chunk.content, CITATION_SNIPPET_CHARS),
                page_number: 0,
            }
        })
        .collect()
}

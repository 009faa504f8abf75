//! Question answering pipeline.
//!
//! Each request walks a small state machine keyed on what data exists
//! for the caller's document scope:
//!
//! 1. **No completed documents** — the model is invoked with no context
//!    and the assistant answers conversationally (never an error).
//! 2. **Documents but no chunks** — raw document text, truncated and
//!    capped, stands in for chunk context.
//! 3. **Chunks** — the question is embedded once, stored chunks are
//!    ranked by cosine similarity, and the top K become the context.
//!
//! The model response is parsed tolerantly; when parsing succeeds with
//! zero citations on the chunk path, citations are synthesized from the
//! top-ranked chunks so supporting material is always cited when it
//! exists.

use std::collections::HashMap;

use crate::answer::{
    build_chunk_prompt, build_no_context_prompt, build_raw_prompt, fallback_citations,
    parse_model_reply, ParseOutcome,
};
use crate::config::Config;
use crate::context::{assemble_chunk_context, assemble_raw_context};
use crate::embedding::{EmbedError, Embedder};
use crate::error::PipelineError;
use crate::generate::{GenerateError, Generator};
use crate::models::QaAnswer;
use crate::rank::rank_chunks;
use crate::store::VectorStore;

/// Answer a question against the caller's completed documents.
///
/// `scope` restricts which documents are searched; `None` (or an empty
/// slice treated upstream as `None`) means all of the user's completed
/// documents. `top_k` is clamped into `[1, 12]` downstream.
pub async fn answer_question(
    store: &VectorStore,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    config: &Config,
    user_id: &str,
    question: &str,
    scope: Option<&[String]>,
    top_k: Option<usize>,
) -> Result<QaAnswer, PipelineError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PipelineError::BadRequest("Question is required".to_string()));
    }

    let docs = store
        .completed_documents(user_id, scope)
        .await
        .map_err(PipelineError::Internal)?;

    // NoDocuments: still answer, conversationally, with no citations.
    if docs.is_empty() {
        tracing::debug!(user_id, "qa: no completed documents in scope");
        let prompt = build_no_context_prompt(question);
        let raw = generator.complete(&prompt).await.map_err(map_generate_err)?;
        let (answer, _) = parse_model_reply(&raw).into_parts();
        return Ok(QaAnswer {
            answer,
            citations: Vec::new(),
        });
    }

    let doc_ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
    let doc_names: HashMap<String, String> = docs
        .iter()
        .map(|d| (d.id.clone(), d.name.clone()))
        .collect();

    let chunks = store
        .chunks_for_documents(user_id, &doc_ids)
        .await
        .map_err(PipelineError::Internal)?;

    // NoChunks: fall back to raw (truncated) document text as context.
    if chunks.is_empty() {
        tracing::debug!(user_id, docs = docs.len(), "qa: no chunks, raw-text fallback");
        let context = assemble_raw_context(
            &docs,
            config.retrieval.raw_doc_chars,
            config.retrieval.raw_doc_limit,
        );
        let prompt = build_raw_prompt(&context, question);
        let raw = generator.complete(&prompt).await.map_err(map_generate_err)?;
        let (answer, citations) = parse_model_reply(&raw).into_parts();
        return Ok(QaAnswer { answer, citations });
    }

    // Chunked: embed the query once, rank, assemble the top K.
    let query_vec = embedder.embed(question).await.map_err(map_embed_err)?;
    let ranked = rank_chunks(
        &query_vec,
        chunks,
        top_k.unwrap_or(config.retrieval.top_k),
    );
    tracing::debug!(
        user_id,
        ranked = ranked.len(),
        top_score = ranked.first().map(|s| s.score).unwrap_or(0.0),
        "qa: ranked chunks"
    );

    let context = assemble_chunk_context(&ranked, &doc_names);
    let prompt = build_chunk_prompt(&context, question);
    let raw = generator.complete(&prompt).await.map_err(map_generate_err)?;

    let (answer, citations) = match parse_model_reply(&raw) {
        ParseOutcome::Parsed { answer, citations } => {
            // The model complied structurally but cited nothing; cite
            // the supporting chunks ourselves.
            let citations = if citations.is_empty() {
                fallback_citations(&ranked, &doc_names)
            } else {
                citations
            };
            (answer, citations)
        }
        ParseOutcome::Unparsed { raw } => (raw, Vec::new()),
    };

    Ok(QaAnswer { answer, citations })
}

fn map_embed_err(err: EmbedError) -> PipelineError {
    match err {
        EmbedError::Misconfigured(msg) => PipelineError::Misconfigured(msg),
        EmbedError::Unavailable(msg) => PipelineError::upstream(anyhow::anyhow!(msg)),
    }
}

fn map_generate_err(err: GenerateError) -> PipelineError {
    match err {
        GenerateError::Misconfigured(msg) => PipelineError::Misconfigured(msg),
        GenerateError::Timeout => PipelineError::Timeout,
        GenerateError::Unavailable(msg) => PipelineError::upstream(anyhow::anyhow!(msg)),
    }
}

/// CLI entry point: answer a question and print it with citations.
pub async fn run_ask(
    config: &Config,
    user_id: &str,
    question: &str,
    scope: Option<Vec<String>>,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    let store = VectorStore::new(pool.clone());
    let embedder = crate::embedding::create_embedder(&config.embedding)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let generator = crate::generate::create_generator(&config.generation)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let result = answer_question(
        &store,
        embedder.as_ref(),
        generator.as_ref(),
        config,
        user_id,
        question,
        scope.as_deref(),
        top_k,
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!("{}", result.answer);
    if !result.citations.is_empty() {
        println!();
        for (i, citation) in result.citations.iter().enumerate() {
            println!(
                "[{}] {} — \"{}\"",
                i + 1,
                citation.document_name,
                citation.snippet.replace('\n', " ")
            );
        }
    }

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrate;
    use crate::models::DocumentStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        fn model_name(&self) -> &str {
            "fake"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Returns a canned reply and records the prompt it was given.
    struct FakeGenerator {
        reply: String,
        last_prompt: Mutex<Option<String>>,
    }

    impl FakeGenerator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                last_prompt: Mutex::new(None),
            }
        }

        fn prompt(&self) -> String {
            self.last_prompt.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl Generator for FakeGenerator {
        fn model_name(&self) -> &str {
            "fake"
        }
        async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn test_config() -> Config {
        let toml = "[db]\npath = \"unused.sqlite\"\n";
        toml::from_str(toml).unwrap()
    }

    async fn setup() -> (VectorStore, Config) {
        let pool = db::connect_memory().await.unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        (VectorStore::new(pool), test_config())
    }

    #[tokio::test]
    async fn test_no_documents_answers_conversationally() {
        let (store, config) = setup().await;
        let generator = FakeGenerator::new(r#"{"answer":"Hello! Upload something.","citations":[]}"#);

        let result = answer_question(
            &store,
            &FakeEmbedder,
            &generator,
            &config,
            "u1",
            "hi there",
            None,
            None,
        )
        .await
        .unwrap();

        assert!(!result.answer.is_empty());
        assert!(result.citations.is_empty());
        // No context block of either kind in the prompt.
        let prompt = generator.prompt();
        assert!(!prompt.contains("Chunks:"));
        assert!(!prompt.contains("Context:"));
    }

    #[tokio::test]
    async fn test_no_chunks_uses_raw_text_fallback() {
        let (store, config) = setup().await;
        store
            .insert_document(
                "u1",
                "History Notes",
                DocumentStatus::Completed,
                Some("The Roman Empire fell in 476 AD."),
            )
            .await
            .unwrap();

        let generator = FakeGenerator::new(r#"{"answer":"476 AD","citations":[]}"#);
        let result = answer_question(
            &store,
            &FakeEmbedder,
            &generator,
            &config,
            "u1",
            "When did Rome fall?",
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.answer, "476 AD");
        let prompt = generator.prompt();
        assert!(prompt.contains("Document 1: History Notes"));
        assert!(prompt.contains("The Roman Empire fell in 476 AD."));
        // No chunk fallback on the raw path.
        assert!(result.citations.is_empty());
    }

    async fn seed_chunked_doc(store: &VectorStore) -> String {
        let doc_id = store
            .insert_document(
                "u1",
                "Biology",
                DocumentStatus::Completed,
                Some("cells and more"),
            )
            .await
            .unwrap();
        // Chunk 0 aligns exactly with the fake query embedding; chunk 1
        // is orthogonal.
        store
            .upsert_chunk("u1", &doc_id, 0, "Mitochondria produce ATP.", &[1.0, 0.0], 25, "h0")
            .await
            .unwrap();
        store
            .upsert_chunk("u1", &doc_id, 1, "Unrelated passage.", &[0.0, 1.0], 18, "h1")
            .await
            .unwrap();
        doc_id
    }

    #[tokio::test]
    async fn test_chunked_path_ranks_and_builds_context() {
        let (store, config) = setup().await;
        seed_chunked_doc(&store).await;

        let generator = FakeGenerator::new(
            r#"{"answer":"ATP","citations":[{"documentName":"Biology","snippet":"Mitochondria produce ATP."}]}"#,
        );
        let result = answer_question(
            &store,
            &FakeEmbedder,
            &generator,
            &config,
            "u1",
            "What produces ATP?",
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.answer, "ATP");
        assert_eq!(result.citations.len(), 1);
        let prompt = generator.prompt();
        // Best-matching chunk is labelled first with its document name.
        assert!(prompt.contains("Chunk 1 (doc: Biology):\nMitochondria produce ATP."));
    }

    #[tokio::test]
    async fn test_chunked_path_synthesizes_missing_citations() {
        let (store, config) = setup().await;
        seed_chunked_doc(&store).await;

        let generator = FakeGenerator::new(r#"{"answer":"ATP","citations":[]}"#);
        let result = answer_question(
            &store,
            &FakeEmbedder,
            &generator,
            &config,
            "u1",
            "What produces ATP?",
            None,
            None,
        )
        .await
        .unwrap();

        assert!(!result.citations.is_empty());
        assert_eq!(result.citations[0].document_name, "Biology");
        assert!(result.citations[0].snippet.contains("Mitochondria"));
    }

    #[tokio::test]
    async fn test_unparsable_reply_becomes_raw_answer() {
        let (store, config) = setup().await;
        seed_chunked_doc(&store).await;

        let generator = FakeGenerator::new("Mitochondria make ATP, plain and simple.");
        let result = answer_question(
            &store,
            &FakeEmbedder,
            &generator,
            &config,
            "u1",
            "What produces ATP?",
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.answer, "Mitochondria make ATP, plain and simple.");
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_scope_restricts_documents() {
        let (store, config) = setup().await;
        let in_scope = store
            .insert_document("u1", "In", DocumentStatus::Completed, Some("alpha"))
            .await
            .unwrap();
        store
            .insert_document("u1", "Out", DocumentStatus::Completed, Some("beta"))
            .await
            .unwrap();

        let generator = FakeGenerator::new(r#"{"answer":"ok","citations":[]}"#);
        let scope = vec![in_scope];
        answer_question(
            &store,
            &FakeEmbedder,
            &generator,
            &config,
            "u1",
            "anything",
            Some(&scope),
            None,
        )
        .await
        .unwrap();

        let prompt = generator.prompt();
        assert!(prompt.contains("Document 1: In"));
        assert!(!prompt.contains("Out"));
    }

    #[tokio::test]
    async fn test_empty_question_is_bad_request() {
        let (store, config) = setup().await;
        let generator = FakeGenerator::new("unused");
        let err = answer_question(
            &store,
            &FakeEmbedder,
            &generator,
            &config,
            "u1",
            "   ",
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_misconfigured_generator_surfaces_distinctly() {
        let (store, config) = setup().await;
        let err = answer_question(
            &store,
            &FakeEmbedder,
            &crate::generate::DisabledGenerator,
            &config,
            "u1",
            "hello",
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Misconfigured(_)));
    }
}

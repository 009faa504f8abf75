//! Generative model client.
//!
//! The pipeline treats the model as an opaque single-shot text
//! completion service: prompt in, raw text out, no streaming. The
//! request-level timeout lives here because the generative call is the
//! highest-latency, least-bounded dependency in the pipeline.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::GenerationConfig;

#[derive(Debug, Error)]
pub enum GenerateError {
    /// A required credential is absent or the provider is disabled.
    #[error("{0}")]
    Misconfigured(String),

    /// The request exceeded the configured timeout.
    #[error("generation request timed out")]
    Timeout,

    /// The service failed or returned an unusable response.
    #[error("generation service failure: {0}")]
    Unavailable(String),
}

/// An external text-completion service.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;
    /// Single-shot completion of a fully assembled prompt.
    async fn complete(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// A no-op generator that always fails with `Misconfigured`.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _prompt: &str) -> Result<String, GenerateError> {
        Err(GenerateError::Misconfigured(
            "Generation provider is disabled. Set [generation] provider in config.".to_string(),
        ))
    }
}

/// Completion client for the Gemini `generateContent` endpoint.
///
/// Requires the `GEMINI_API_KEY` environment variable.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerateError> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            GenerateError::Misconfigured("GEMINI_API_KEY environment variable not set".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerateError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout
                } else {
                    GenerateError::Unavailable(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Unavailable(format!(
                "generation API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GenerateError::Unavailable(e.to_string()))?;

        // candidates[0].content.parts[0].text
        let text = json
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                GenerateError::Unavailable(
                    "invalid generation response: missing candidates[0].content.parts[0].text"
                        .to_string(),
                )
            })?;

        Ok(text.to_string())
    }
}

/// Create the generator named by the configuration.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>, GenerateError> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "gemini" => Ok(Box::new(GeminiGenerator::new(config)?)),
        other => Err(GenerateError::Misconfigured(format!(
            "Unknown generation provider: {}",
            other
        ))),
    }
}

//! Pipeline error taxonomy.
//!
//! Every failure the ingestion and QA pipelines can surface maps to one
//! variant here, and each variant carries its HTTP classification and a
//! machine-readable code. Upstream failures keep their full detail for
//! server-side logging but surface only a generic message to clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// No authenticated owner identifier on the request.
    #[error("unauthorized")]
    Unauthorized,

    /// Referenced document doesn't exist, isn't completed, or belongs
    /// to someone else. All three collapse to the same surface so the
    /// response doesn't reveal other users' document ids.
    #[error("{0}")]
    NotFound(String),

    /// Malformed or nonsensical request (including the hard EmptyInput
    /// cases, e.g. ingesting a document with no text).
    #[error("{0}")]
    BadRequest(String),

    /// A required external credential or provider is absent. Kept
    /// distinct from transient failures so operators can tell a broken
    /// deployment from a flaky upstream.
    #[error("{0}")]
    Misconfigured(String),

    /// The generative model call exceeded its request-level timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// Embedding or generation service failed, or returned something
    /// unusable. The inner detail is for logs only.
    #[error("upstream service failure")]
    Upstream(#[source] anyhow::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    /// Machine-readable error code for the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Unauthorized => "unauthorized",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::BadRequest(_) => "bad_request",
            PipelineError::Misconfigured(_) => "misconfigured",
            PipelineError::Timeout => "timeout",
            PipelineError::Upstream(_) => "upstream",
            PipelineError::Internal(_) => "internal",
        }
    }

    pub fn upstream(err: impl Into<anyhow::Error>) -> Self {
        PipelineError::Upstream(err.into())
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Internal(err.into())
    }
}

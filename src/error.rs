//! Error taxonomy for the ingestion and retrieval core.
//!
//! Three families, matching the decisions they drive:
//!
//! - [`StoreError`] — persistence failures. `NotFound` and `Validation`
//!   are terminal for the caller; `Unavailable` is transient infra and
//!   safe to retry whole-operation.
//! - [`EmbedError`] — per-call embedding failures. The variant decides
//!   what the orchestrator does with the *rest of the batch*: quota and
//!   auth stop it, transient skips one chunk and continues.
//! - [`IngestError`] — orchestration failures, attributed to the stage
//!   that failed so callers can render "created but not chunked" vs
//!   "chunked but not embedded" distinctly.

use thiserror::Error;

/// Failures raised by [`DocumentStore`](crate::store::DocumentStore)
/// implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Transient infrastructure failure. Distinct from "no data" so the
    /// caller can tell an empty store from a broken one.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Failures raised by a single embedding call.
///
/// Classification is the key contract here: for a multi-chunk document
/// embedding is best-effort and partial, never all-or-nothing.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Provider-side rate/credit exhaustion. Stop issuing further
    /// embedding calls for the current batch.
    #[error("embedding quota exhausted: {0}")]
    QuotaExceeded(String),

    /// Invalid or missing credential. Retrying is futile; stop the
    /// batch immediately.
    #[error("embedding authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Network or provider hiccup. Skip this one chunk and continue.
    #[error("transient embedding failure: {0}")]
    Transient(String),
}

/// Pipeline stage an [`IngestError`] is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    /// Re-reading an existing document (regeneration only).
    Load,
    /// Creating the document row.
    Persist,
    /// Chunking and persisting chunk rows.
    Chunk,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IngestStage::Load => "load",
            IngestStage::Persist => "persist",
            IngestStage::Chunk => "chunk",
        };
        f.write_str(s)
    }
}

/// Failures raised by the ingestion orchestrator.
///
/// Per-chunk embedding failures are *not* errors at this level; they are
/// reported through [`IngestResult`](crate::models::IngestResult).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("chunking configuration invalid: {0}")]
    Config(String),

    #[error("{stage} stage failed: {source}")]
    Store {
        stage: IngestStage,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    pub(crate) fn store(stage: IngestStage, source: StoreError) -> Self {
        IngestError::Store { stage, source }
    }
}

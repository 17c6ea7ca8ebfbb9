//! Core data models used throughout docrag.
//!
//! These types represent the documents, chunks, and results that flow
//! through the ingestion and retrieval pipeline.

use serde::Serialize;
use uuid::Uuid;

/// A document submitted for ingestion and stored relationally.
///
/// `body` is the single source of truth: chunks are always derivable
/// from it, and regeneration replaces the whole chunk set.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
    pub source_url: Option<String>,
    /// Free-form JSON object (e.g. a version tag). Stored verbatim.
    pub metadata_json: String,
    pub published: bool,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

impl Document {
    /// Build a new document with a fresh UUID and current timestamps.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        source_url: Option<String>,
        metadata_json: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            body: body.into(),
            source_url,
            metadata_json: metadata_json.unwrap_or_else(|| "{}".to_string()),
            published: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One contiguous slice of a document's normalized body text.
///
/// `(document_id, chunk_index)` is unique; indices are contiguous from 0
/// and define reconstruction and citation order. `embedding` is absent
/// until the embedding phase reaches this chunk (or permanently, if the
/// provider failed for it).
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, for embedding staleness detection.
    pub hash: String,
    pub embedding: Option<Vec<f32>>,
    /// Unix seconds.
    pub created_at: i64,
}

/// A chunk paired with its similarity score, as returned by retrieval.
#[derive(Debug, Clone, Serialize)]
pub struct RankedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Filter for document listing and nearest-chunk search.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// `Some(true)` restricts to published documents.
    pub published: Option<bool>,
}

impl DocumentFilter {
    pub fn published_only() -> Self {
        Self {
            published: Some(true),
        }
    }
}

/// How far the embedding phase of an ingestion got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmbeddingStatus {
    /// Every chunk has an embedding (vacuously true for zero chunks).
    Complete,
    /// Some chunks embedded, some skipped on transient failures.
    Partial,
    /// No embedding was attempted or none succeeded.
    NotEmbedded,
    /// Provider reported quota exhaustion; remaining chunks were skipped.
    AbortedQuota,
    /// Provider rejected the credential; the batch stopped immediately.
    AbortedAuth,
}

impl std::fmt::Display for EmbeddingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EmbeddingStatus::Complete => "complete",
            EmbeddingStatus::Partial => "partial",
            EmbeddingStatus::NotEmbedded => "not-embedded",
            EmbeddingStatus::AbortedQuota => "aborted-quota",
            EmbeddingStatus::AbortedAuth => "aborted-auth",
        };
        f.write_str(s)
    }
}

/// Summary of a single ingestion or regeneration.
///
/// This is the single source of truth for "how much succeeded": partial
/// embedding is a normal outcome, not an error, so callers must read
/// these counts rather than infer success from the absence of an `Err`.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub document_id: String,
    pub title: String,
    pub total_chunks: u64,
    pub embedded_chunks: u64,
    pub status: EmbeddingStatus,
}

/// Summary of an administrative chunk reset.
#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub chunks_removed: u64,
    pub documents_touched: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::new("Policy", "body text", None, None);
        assert!(!doc.id.is_empty());
        assert_eq!(doc.metadata_json, "{}");
        assert!(doc.published);
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn test_new_document_keeps_metadata() {
        let doc = Document::new(
            "Policy",
            "body",
            Some("https://example.org/p".into()),
            Some(r#"{"version":"2"}"#.into()),
        );
        assert_eq!(doc.metadata_json, r#"{"version":"2"}"#);
        assert_eq!(doc.source_url.as_deref(), Some("https://example.org/p"));
    }
}

//! Ingestion pipeline orchestration.
//!
//! Coordinates the full ingestion flow: validate → normalize → persist
//! document → chunk → embed per chunk. Embedding is best-effort and
//! partial, never all-or-nothing: a document with zero embedded chunks
//! is still a valid, listable document whose raw text is viewable —
//! only vector retrieval quality degrades.
//!
//! # Per-chunk failure policy
//!
//! The embedding loop is an explicit match over the three
//! [`EmbedError`] classes, so every outcome is handled exhaustively:
//!
//! - `Transient` — skip this chunk (leave it unembedded), continue.
//! - `QuotaExceeded` — stop issuing embedding calls for the rest of the
//!   batch; keep the embeddings already obtained.
//! - `AuthenticationFailed` — stop immediately; retrying is futile.
//!
//! The returned [`IngestResult`] is the single source of truth for how
//! much succeeded; callers must not infer success from the absence of
//! an `Err`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EmbedError, IngestError, IngestStage, StoreError};
use crate::models::{Chunk, ClearResult, Document, EmbeddingStatus, IngestResult};
use crate::normalize::normalize;
use crate::store::DocumentStore;

/// One admin ingestion submission.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub title: String,
    pub body: String,
    pub source_url: Option<String>,
    pub metadata_json: Option<String>,
}

impl IngestRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            source_url: None,
            metadata_json: None,
        }
    }
}

/// Coordinates normalize → chunk → persist → embed for one document at
/// a time. Ingestions for different documents are independent; a single
/// `Ingestor` may serve them concurrently.
pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    chunking: ChunkingConfig,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            provider,
            chunking,
        }
    }

    /// Ingest a new document.
    ///
    /// Validation and document-creation failures are fatal and leave no
    /// side effects (no chunks, no embeddings). Once chunks are
    /// persisted, embedding failures only affect the result summary.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestResult, IngestError> {
        if request.title.trim().is_empty() {
            return Err(IngestError::Validation("title must not be empty".into()));
        }
        if request.body.trim().is_empty() {
            return Err(IngestError::Validation("body must not be empty".into()));
        }

        let body = normalize(&request.body);
        let doc = Document::new(request.title, body, request.source_url, request.metadata_json);

        self.store
            .create_document(&doc)
            .await
            .map_err(|e| match e {
                StoreError::Validation(msg) => IngestError::Validation(msg),
                other => IngestError::store(IngestStage::Persist, other),
            })?;

        debug!(document = %doc.id, title = %doc.title, "document created");
        self.chunk_and_embed(&doc).await
    }

    /// Re-chunk and re-embed an existing document from its current body.
    ///
    /// The prior chunk set is discarded entirely via `replace_chunks`.
    /// Idempotent on chunk texts and indices for unchanged content.
    pub async fn regenerate(&self, document_id: &str) -> Result<IngestResult, IngestError> {
        let doc = self
            .store
            .get_document(document_id)
            .await
            .map_err(|e| IngestError::store(IngestStage::Load, e))?
            .ok_or_else(|| {
                IngestError::store(
                    IngestStage::Load,
                    StoreError::NotFound(format!("document {}", document_id)),
                )
            })?;

        // Body may have been edited through the admin surface since the
        // original ingestion; normalize again before chunking.
        let doc = Document {
            body: normalize(&doc.body),
            ..doc
        };

        debug!(document = %doc.id, "regenerating chunks");
        self.chunk_and_embed(&doc).await
    }

    /// Administrative reset: delete every chunk across every document
    /// and bump every document's `updated_at` so downstream caches see
    /// their embeddings as stale. Documents themselves survive.
    pub async fn clear_all(&self) -> Result<ClearResult, StoreError> {
        let chunks_removed = self.store.clear_all_chunks().await?;
        let documents_touched = self.store.touch_all_documents().await?;
        Ok(ClearResult {
            chunks_removed,
            documents_touched,
        })
    }

    async fn chunk_and_embed(&self, doc: &Document) -> Result<IngestResult, IngestError> {
        let chunks = chunk_text(
            &doc.id,
            &doc.body,
            self.chunking.max_tokens,
            self.chunking.overlap_tokens,
        )
        .map_err(|e| IngestError::Config(e.to_string()))?;

        self.store
            .replace_chunks(&doc.id, &chunks)
            .await
            .map_err(|e| IngestError::store(IngestStage::Chunk, e))?;

        let total_chunks = chunks.len() as u64;

        // Nothing to embed is a successful completion, not an error.
        if chunks.is_empty() {
            return Ok(IngestResult {
                document_id: doc.id.clone(),
                title: doc.title.clone(),
                total_chunks: 0,
                embedded_chunks: 0,
                status: EmbeddingStatus::Complete,
            });
        }

        let (embedded_chunks, status) = self.embed_chunks(&chunks).await;

        Ok(IngestResult {
            document_id: doc.id.clone(),
            title: doc.title.clone(),
            total_chunks,
            embedded_chunks,
            status,
        })
    }

    /// Embed chunks in index order, applying the tri-state policy.
    /// Never fails: the outcome is fully described by the returned
    /// count and status.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> (u64, EmbeddingStatus) {
        let Some(provider) = &self.provider else {
            return (0, EmbeddingStatus::NotEmbedded);
        };

        let mut embedded = 0u64;
        let mut aborted: Option<EmbeddingStatus> = None;

        for chunk in chunks {
            match provider.embed(&chunk.text).await {
                Ok(vector) => {
                    match self.store.set_chunk_embedding(&chunk.id, &vector).await {
                        Ok(()) => embedded += 1,
                        Err(e) => {
                            warn!(
                                chunk = %chunk.id,
                                error = %e,
                                "failed to store embedding; chunk left unembedded"
                            );
                        }
                    }
                }
                Err(EmbedError::Transient(msg)) => {
                    warn!(
                        chunk = %chunk.id,
                        index = chunk.chunk_index,
                        %msg,
                        "transient embedding failure; skipping chunk"
                    );
                }
                Err(EmbedError::QuotaExceeded(msg)) => {
                    warn!(
                        document = %chunk.document_id,
                        index = chunk.chunk_index,
                        %msg,
                        "embedding quota exhausted; stopping batch"
                    );
                    aborted = Some(EmbeddingStatus::AbortedQuota);
                    break;
                }
                Err(EmbedError::AuthenticationFailed(msg)) => {
                    warn!(
                        document = %chunk.document_id,
                        %msg,
                        "embedding authentication failed; stopping batch"
                    );
                    aborted = Some(EmbeddingStatus::AbortedAuth);
                    break;
                }
            }
        }

        let status = aborted.unwrap_or_else(|| {
            if embedded == chunks.len() as u64 {
                EmbeddingStatus::Complete
            } else if embedded == 0 {
                EmbeddingStatus::NotEmbedded
            } else {
                EmbeddingStatus::Partial
            }
        });

        (embedded, status)
    }
}

//! Storage abstraction for documents and their chunks.
//!
//! The [`DocumentStore`] trait defines every persistence operation the
//! ingestion orchestrator and retrieval query path need, enabling
//! pluggable backends (SQLite, in-memory for tests, a dedicated vector
//! index later without touching either caller).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Chunk, Document, DocumentFilter};

/// Abstract storage backend.
///
/// All operations are async (via `async-trait`); in-memory
/// implementations return immediately-ready futures. Absence is `None`
/// or `NotFound`, never a generic error, so callers can distinguish
/// "empty" from "broken" ([`StoreError::Unavailable`]).
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_document`](DocumentStore::create_document) | Persist a new document |
/// | [`get_document`](DocumentStore::get_document) | Fetch one document, `None` if absent |
/// | [`get_document_chunks`](DocumentStore::get_document_chunks) | Chunks for a document, by index |
/// | [`list_documents`](DocumentStore::list_documents) | Filtered listing, newest first |
/// | [`delete_document`](DocumentStore::delete_document) | Remove document and all chunks atomically |
/// | [`replace_chunks`](DocumentStore::replace_chunks) | Swap the full chunk set transactionally |
/// | [`set_chunk_embedding`](DocumentStore::set_chunk_embedding) | Attach/overwrite one embedding |
/// | [`find_nearest_chunks`](DocumentStore::find_nearest_chunks) | Cosine top-k over embedded chunks |
/// | [`clear_all_chunks`](DocumentStore::clear_all_chunks) | Bulk-delete every chunk |
/// | [`touch_all_documents`](DocumentStore::touch_all_documents) | Bump every `updated_at` |
/// | [`count_chunks`](DocumentStore::count_chunks) | Row count, for orphan checks and stats |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document.
    ///
    /// Fails with [`StoreError::Validation`] if the title or body is
    /// empty.
    async fn create_document(&self, doc: &Document) -> Result<(), StoreError>;

    /// Fetch a document by id. Absence is `Ok(None)`.
    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// All chunks for a document, ordered by `chunk_index`.
    async fn get_document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>, StoreError>;

    /// List documents matching the filter, newest `updated_at` first.
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError>;

    /// Delete a document and all its chunks in one transaction.
    ///
    /// No orphaned chunks may remain under any failure mode. Fails with
    /// [`StoreError::NotFound`] for an unknown id.
    async fn delete_document(&self, id: &str) -> Result<(), StoreError>;

    /// Replace the document's full chunk set in one transaction.
    ///
    /// Concurrent readers observe the old set or the new set, never a
    /// partial mix. The old set is discarded entirely, never merged.
    async fn replace_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<(), StoreError>;

    /// Attach or overwrite a chunk's embedding. Idempotent.
    async fn set_chunk_embedding(&self, chunk_id: &str, vector: &[f32]) -> Result<(), StoreError>;

    /// Top-`k` chunks nearest the query vector by cosine similarity.
    ///
    /// Chunks without an embedding are excluded from consideration, not
    /// scored as zero. Descending similarity; ties broken by ascending
    /// chunk creation order, then index, for determinism.
    async fn find_nearest_chunks(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<(Chunk, f32)>, StoreError>;

    /// Delete every chunk across every document. Documents survive.
    /// Returns the number of chunks removed.
    async fn clear_all_chunks(&self) -> Result<u64, StoreError>;

    /// Bump every document's `updated_at` to now, signalling downstream
    /// caches that embeddings are stale. Returns documents touched.
    async fn touch_all_documents(&self) -> Result<u64, StoreError>;

    /// Count chunks, optionally scoped to one document.
    async fn count_chunks(&self, document_id: Option<&str>) -> Result<u64, StoreError>;
}

/// Shared input validation for [`DocumentStore::create_document`]
/// implementations.
pub(crate) fn validate_document(doc: &Document) -> Result<(), StoreError> {
    if doc.title.trim().is_empty() {
        return Err(StoreError::Validation("title must not be empty".into()));
    }
    if doc.body.trim().is_empty() {
        return Err(StoreError::Validation("body must not be empty".into()));
    }
    Ok(())
}

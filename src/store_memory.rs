//! In-memory [`DocumentStore`] implementation.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread
//! safety. Vector search is brute-force cosine similarity over all
//! embedded chunks. Intended for tests and embedded use; guards are
//! scoped so no lock is ever held across an await point.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::StoreError;
use crate::models::{Chunk, Document, DocumentFilter};
use crate::store::{validate_document, DocumentStore};

/// In-memory store for tests and embedded environments.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn doc_passes(&self, document_id: &str, filter: Option<&DocumentFilter>) -> bool {
        let Some(filter) = filter else { return true };
        let Some(published) = filter.published else {
            return true;
        };
        let docs = self.docs.read().unwrap();
        docs.get(document_id)
            .map(|d| d.published == published)
            .unwrap_or(false)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create_document(&self, doc: &Document) -> Result<(), StoreError> {
        validate_document(doc)?;
        let mut docs = self.docs.write().unwrap();
        docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.docs.read().unwrap();
        Ok(docs.get(id).cloned())
    }

    async fn get_document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>, StoreError> {
        let chunks = self.chunks.read().unwrap();
        let mut owned: Vec<Chunk> = chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        owned.sort_by_key(|c| c.chunk_index);
        Ok(owned)
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().unwrap();
        let mut listed: Vec<Document> = docs
            .values()
            .filter(|d| filter.published.map(|p| d.published == p).unwrap_or(true))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn delete_document(&self, id: &str) -> Result<(), StoreError> {
        let mut docs = self.docs.write().unwrap();
        if docs.remove(id).is_none() {
            return Err(StoreError::NotFound(format!("document {}", id)));
        }
        let mut chunks = self.chunks.write().unwrap();
        chunks.retain(|c| c.document_id != id);
        Ok(())
    }

    async fn replace_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<(), StoreError> {
        let mut stored = self.chunks.write().unwrap();
        stored.retain(|c| c.document_id != document_id);
        stored.extend(chunks.iter().cloned());
        Ok(())
    }

    async fn set_chunk_embedding(&self, chunk_id: &str, vector: &[f32]) -> Result<(), StoreError> {
        let mut chunks = self.chunks.write().unwrap();
        let chunk = chunks
            .iter_mut()
            .find(|c| c.id == chunk_id)
            .ok_or_else(|| StoreError::NotFound(format!("chunk {}", chunk_id)))?;
        chunk.embedding = Some(vector.to_vec());
        Ok(())
    }

    async fn find_nearest_chunks(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<(Chunk, f32)>, StoreError> {
        let candidates: Vec<(Chunk, f32)> = {
            let chunks = self.chunks.read().unwrap();
            chunks
                .iter()
                .filter(|c| c.embedding.is_some())
                .map(|c| {
                    let score = cosine_similarity(query, c.embedding.as_deref().unwrap_or(&[]));
                    (c.clone(), score)
                })
                .collect()
        };

        let mut scored: Vec<(Chunk, f32)> = candidates
            .into_iter()
            .filter(|(c, _)| self.doc_passes(&c.document_id, filter))
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn clear_all_chunks(&self) -> Result<u64, StoreError> {
        let mut chunks = self.chunks.write().unwrap();
        let removed = chunks.len() as u64;
        chunks.clear();
        Ok(removed)
    }

    async fn touch_all_documents(&self) -> Result<u64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let mut docs = self.docs.write().unwrap();
        for doc in docs.values_mut() {
            doc.updated_at = now;
        }
        Ok(docs.len() as u64)
    }

    async fn count_chunks(&self, document_id: Option<&str>) -> Result<u64, StoreError> {
        let chunks = self.chunks.read().unwrap();
        let count = match document_id {
            Some(id) => chunks.iter().filter(|c| c.document_id == id).count(),
            None => chunks.len(),
        };
        Ok(count as u64)
    }
}

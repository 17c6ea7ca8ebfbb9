//! Question answering retrieval path.
//!
//! Embeds the visitor's question and ranks published chunks by cosine
//! similarity. Failures on this path degrade rather than error: any
//! problem producing the query embedding yields an empty result set, so
//! the caller can still answer from general knowledge.

use std::sync::Arc;

use tracing::warn;

use crate::embedding::EmbeddingProvider;
use crate::models::{DocumentFilter, RankedChunk};
use crate::store::DocumentStore;

pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            provider,
            top_k,
        }
    }

    /// Retrieve the top-k most similar published chunks for a question.
    ///
    /// Returns an empty vec when the provider is disabled, the question
    /// embedding fails for any reason, or no embedded chunks exist.
    /// Never returns chunks from unpublished documents.
    pub async fn retrieve(&self, question: &str) -> Vec<RankedChunk> {
        self.retrieve_top(question, self.top_k).await
    }

    /// Same as [`retrieve`](Self::retrieve) with an explicit result
    /// count, for callers that want more or less context than the
    /// configured default.
    pub async fn retrieve_top(&self, question: &str, k: usize) -> Vec<RankedChunk> {
        if question.trim().is_empty() || k == 0 {
            return Vec::new();
        }

        let Some(provider) = &self.provider else {
            return Vec::new();
        };

        let query = match provider.embed(question).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed; returning no context");
                return Vec::new();
            }
        };

        let filter = DocumentFilter::published_only();
        match self
            .store
            .find_nearest_chunks(&query, k, Some(&filter))
            .await
        {
            Ok(hits) => hits
                .into_iter()
                .map(|(chunk, score)| RankedChunk { chunk, score })
                .collect(),
            Err(e) => {
                warn!(error = %e, "nearest-chunk lookup failed; returning no context");
                Vec::new()
            }
        }
    }
}

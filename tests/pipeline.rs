//! End-to-end pipeline tests over the in-memory store with a scripted
//! embedding provider, covering the partial-success semantics of
//! ingestion and the degrade-to-empty behavior of retrieval.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use docrag::config::ChunkingConfig;
use docrag::embedding::EmbeddingProvider;
use docrag::error::{EmbedError, IngestError};
use docrag::ingest::{IngestRequest, Ingestor};
use docrag::models::{Chunk, Document, DocumentFilter, EmbeddingStatus};
use docrag::retrieve::Retriever;
use docrag::store::DocumentStore;
use docrag::store_memory::InMemoryStore;

/// Provider whose outcome per call is decided by a script keyed on the
/// 1-based call number. Counts calls so tests can assert exactly when a
/// batch stopped.
struct ScriptedProvider {
    calls: AtomicUsize,
    script: Box<dyn Fn(usize) -> Result<Vec<f32>, EmbedError> + Send + Sync>,
}

impl ScriptedProvider {
    fn new(
        script: impl Fn(usize) -> Result<Vec<f32>, EmbedError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Box::new(script),
        })
    }

    fn ok() -> Arc<Self> {
        Self::new(|_| Ok(vec![1.0, 0.0, 0.0]))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn dims(&self) -> usize {
        3
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        (self.script)(n)
    }
}

/// Small windows so a short body yields many chunks:
/// window = 15 / 0.75 = 20 words, overlap = 3 / 0.75 = 4 words,
/// step = 16 words. 160 words → exactly 10 chunks.
fn test_chunking() -> ChunkingConfig {
    ChunkingConfig {
        max_tokens: 15,
        overlap_tokens: 3,
    }
}

fn body_with_words(n: usize) -> String {
    (0..n)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ingestor(store: &Arc<InMemoryStore>, provider: Option<Arc<ScriptedProvider>>) -> Ingestor {
    let provider = provider.map(|p| p as Arc<dyn EmbeddingProvider>);
    Ingestor::new(store.clone(), provider, test_chunking())
}

#[tokio::test]
async fn test_ingest_embeds_every_chunk_when_provider_healthy() {
    let store = Arc::new(InMemoryStore::new());
    let provider = ScriptedProvider::ok();
    let ingestor = ingestor(&store, Some(provider.clone()));

    let result = ingestor
        .ingest(IngestRequest::new("Healthy", body_with_words(160)))
        .await
        .unwrap();

    assert_eq!(result.total_chunks, 10);
    assert_eq!(result.embedded_chunks, 10);
    assert_eq!(result.status, EmbeddingStatus::Complete);
    assert_eq!(provider.calls(), 10);
}

#[tokio::test]
async fn test_transient_failures_skip_chunks_and_continue() {
    let store = Arc::new(InMemoryStore::new());
    // Every third call hiccups; the rest of the batch must still run.
    let provider = ScriptedProvider::new(|n| {
        if n % 3 == 0 {
            Err(EmbedError::Transient("upstream 503".into()))
        } else {
            Ok(vec![1.0, 0.0, 0.0])
        }
    });
    let ingestor = ingestor(&store, Some(provider.clone()));

    let result = ingestor
        .ingest(IngestRequest::new("Flaky", body_with_words(160)))
        .await
        .unwrap();

    assert_eq!(result.total_chunks, 10);
    assert_eq!(result.embedded_chunks, 7);
    assert_eq!(result.status, EmbeddingStatus::Partial);
    assert_eq!(provider.calls(), 10);

    let chunks = store.get_document_chunks(&result.document_id).await.unwrap();
    let embedded = chunks.iter().filter(|c| c.embedding.is_some()).count();
    let bare = chunks.iter().filter(|c| c.embedding.is_none()).count();
    assert_eq!(embedded, 7);
    assert_eq!(bare, 3);
}

#[tokio::test]
async fn test_quota_exhaustion_stops_batch_but_keeps_progress() {
    let store = Arc::new(InMemoryStore::new());
    let provider = ScriptedProvider::new(|n| {
        if n >= 4 {
            Err(EmbedError::QuotaExceeded("credits exhausted".into()))
        } else {
            Ok(vec![1.0, 0.0, 0.0])
        }
    });
    let ingestor = ingestor(&store, Some(provider.clone()));

    let result = ingestor
        .ingest(IngestRequest::new("Quota", body_with_words(160)))
        .await
        .unwrap();

    assert_eq!(result.total_chunks, 10);
    assert_eq!(result.embedded_chunks, 3);
    assert_eq!(result.status, EmbeddingStatus::AbortedQuota);
    // The quota error must stop the batch at the fourth call; no
    // further calls are attempted for the remaining chunks.
    assert_eq!(provider.calls(), 4);

    // Chunks past the abort remain stored, just unembedded.
    assert_eq!(
        store.count_chunks(Some(&result.document_id)).await.unwrap(),
        10
    );
}

#[tokio::test]
async fn test_auth_failure_aborts_on_first_call() {
    let store = Arc::new(InMemoryStore::new());
    let provider = ScriptedProvider::new(|_| {
        Err(EmbedError::AuthenticationFailed("invalid api key".into()))
    });
    let ingestor = ingestor(&store, Some(provider.clone()));

    let result = ingestor
        .ingest(IngestRequest::new("Auth", body_with_words(160)))
        .await
        .unwrap();

    assert_eq!(result.embedded_chunks, 0);
    assert_eq!(result.status, EmbeddingStatus::AbortedAuth);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_disabled_provider_stores_chunks_unembedded() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = ingestor(&store, None);

    let result = ingestor
        .ingest(IngestRequest::new("No provider", body_with_words(160)))
        .await
        .unwrap();

    assert_eq!(result.total_chunks, 10);
    assert_eq!(result.embedded_chunks, 0);
    assert_eq!(result.status, EmbeddingStatus::NotEmbedded);

    let chunks = store.get_document_chunks(&result.document_id).await.unwrap();
    assert!(chunks.iter().all(|c| c.embedding.is_none()));
}

#[tokio::test]
async fn test_blank_title_or_body_rejected_without_side_effects() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = ingestor(&store, Some(ScriptedProvider::ok()));

    let err = ingestor
        .ingest(IngestRequest::new("   ", "some body"))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Validation(_)));

    let err = ingestor
        .ingest(IngestRequest::new("Title", " \n\t "))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Validation(_)));

    assert!(store
        .list_documents(&DocumentFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(store.count_chunks(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_regenerate_reproduces_chunk_texts_and_indices() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = ingestor(&store, Some(ScriptedProvider::ok()));

    let result = ingestor
        .ingest(IngestRequest::new("Stable", body_with_words(160)))
        .await
        .unwrap();

    let before = store.get_document_chunks(&result.document_id).await.unwrap();

    let redo = ingestor.regenerate(&result.document_id).await.unwrap();
    assert_eq!(redo.total_chunks, result.total_chunks);
    assert_eq!(redo.status, EmbeddingStatus::Complete);

    let after = store.get_document_chunks(&result.document_id).await.unwrap();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.chunk_index, a.chunk_index);
        assert_eq!(b.text, a.text);
        assert_eq!(b.hash, a.hash);
    }
}

#[tokio::test]
async fn test_regenerate_unknown_document_is_an_error() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = ingestor(&store, None);

    let err = ingestor.regenerate("no-such-id").await.unwrap_err();
    assert!(matches!(err, IngestError::Store { .. }));
}

#[tokio::test]
async fn test_delete_document_leaves_no_orphan_chunks() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = ingestor(&store, None);

    let kept = ingestor
        .ingest(IngestRequest::new("Kept", body_with_words(160)))
        .await
        .unwrap();
    let doomed = ingestor
        .ingest(IngestRequest::new("Doomed", body_with_words(160)))
        .await
        .unwrap();

    store.delete_document(&doomed.document_id).await.unwrap();

    assert!(store
        .get_document(&doomed.document_id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(store.count_chunks(Some(&doomed.document_id)).await.unwrap(), 0);
    assert_eq!(
        store.count_chunks(None).await.unwrap(),
        store.count_chunks(Some(&kept.document_id)).await.unwrap()
    );
}

#[tokio::test]
async fn test_clear_all_removes_chunks_and_touches_documents() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = ingestor(&store, None);

    ingestor
        .ingest(IngestRequest::new("One", body_with_words(160)))
        .await
        .unwrap();
    ingestor
        .ingest(IngestRequest::new("Two", body_with_words(160)))
        .await
        .unwrap();

    let result = ingestor.clear_all().await.unwrap();
    assert_eq!(result.chunks_removed, 20);
    assert_eq!(result.documents_touched, 2);

    assert_eq!(store.count_chunks(None).await.unwrap(), 0);
    // Documents survive a chunk wipe.
    assert_eq!(
        store
            .list_documents(&DocumentFilter::default())
            .await
            .unwrap()
            .len(),
        2
    );
}

fn embedded_chunk(document_id: &str, index: i64, vector: Vec<f32>) -> Chunk {
    Chunk {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: format!("chunk {}", index),
        hash: format!("hash-{}", index),
        embedding: Some(vector),
        created_at: chrono::Utc::now().timestamp(),
    }
}

#[tokio::test]
async fn test_ask_returns_only_published_chunks() {
    let store = Arc::new(InMemoryStore::new());

    let public = Document::new("Public", "body", None, None);
    let mut draft = Document::new("Draft", "body", None, None);
    draft.published = false;

    store.create_document(&public).await.unwrap();
    store.create_document(&draft).await.unwrap();
    store
        .replace_chunks(&public.id, &[embedded_chunk(&public.id, 0, vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();
    store
        .replace_chunks(&draft.id, &[embedded_chunk(&draft.id, 0, vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();

    let retriever = Retriever::new(
        store.clone(),
        Some(ScriptedProvider::ok() as Arc<dyn EmbeddingProvider>),
        5,
    );

    let hits = retriever.retrieve("anything").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.document_id, public.id);
    assert!(hits[0].score > 0.99);
}

#[tokio::test]
async fn test_retrieval_degrades_to_empty_on_embedding_failure() {
    let store = Arc::new(InMemoryStore::new());
    let doc = Document::new("Doc", "body", None, None);
    store.create_document(&doc).await.unwrap();
    store
        .replace_chunks(&doc.id, &[embedded_chunk(&doc.id, 0, vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();

    let failing =
        ScriptedProvider::new(|_| Err(EmbedError::Transient("provider down".into())));
    let retriever = Retriever::new(
        store.clone(),
        Some(failing as Arc<dyn EmbeddingProvider>),
        5,
    );
    assert!(retriever.retrieve("question").await.is_empty());

    // No provider configured behaves the same way.
    let retriever = Retriever::new(store, None, 5);
    assert!(retriever.retrieve("question").await.is_empty());
}

#[tokio::test]
async fn test_blank_question_returns_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let retriever = Retriever::new(
        store,
        Some(ScriptedProvider::ok() as Arc<dyn EmbeddingProvider>),
        5,
    );
    assert!(retriever.retrieve("  \n ").await.is_empty());
}

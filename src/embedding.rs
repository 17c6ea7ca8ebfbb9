//! Embedding provider abstraction and the OpenAI adapter.
//!
//! Defines the [`EmbeddingProvider`] trait, the [`OpenAiEmbedder`]
//! implementation, and vector utilities:
//! - [`cosine_similarity`] — similarity between two embedding vectors
//! - [`vec_to_blob`] / [`blob_to_vec`] — little-endian f32 byte encoding
//!   for SQLite BLOB storage
//!
//! # Failure classification
//!
//! Every provider failure is classified into one of three
//! [`EmbedError`] variants, because the orchestrator's batch policy
//! pivots on the class, not the message:
//!
//! | HTTP outcome | Classification |
//! |--------------|----------------|
//! | 401, 403 | `AuthenticationFailed` — abort the batch |
//! | 429 | `QuotaExceeded` — stop further calls, keep what we have |
//! | 5xx, network error | retried with backoff, then `Transient` |
//! | anything else | `Transient` — skip this chunk, continue |
//!
//! # Retry strategy
//!
//! Transient-looking failures (network errors, 5xx) are retried with
//! exponential backoff: 1s, 2s, 4s, … capped at 2^5. Quota and auth
//! failures are never retried — a drained credit pool or a bad key does
//! not recover within a batch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::EmbedError;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Trait for embedding providers.
///
/// The credential and model identity are fixed at construction; `embed`
/// is a single-text call so the orchestrator can attribute every failure
/// to one chunk.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Fixed embedding dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed one text, returning a vector of exactly `dims()` floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Embedding provider backed by the OpenAI embeddings API.
///
/// The API key is injected here rather than read from the environment,
/// so tests can construct the pipeline with a fake adapter instead.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    /// Build an adapter from configuration plus an injected API key.
    ///
    /// Fails if `model` or `dims` is missing from the config.
    pub fn new(api_key: String, config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_key,
            model,
            dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut last_err = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(OPENAI_EMBEDDINGS_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| EmbedError::Transient(e.to_string()))?;
                        return parse_embedding_response(&json, self.dims);
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    match status.as_u16() {
                        401 | 403 => {
                            return Err(EmbedError::AuthenticationFailed(format!(
                                "{}: {}",
                                status, body_text
                            )))
                        }
                        429 => {
                            return Err(EmbedError::QuotaExceeded(format!(
                                "{}: {}",
                                status, body_text
                            )))
                        }
                        s if (500..600).contains(&s) => {
                            last_err = format!("{}: {}", status, body_text);
                            continue;
                        }
                        _ => {
                            return Err(EmbedError::Transient(format!(
                                "{}: {}",
                                status, body_text
                            )))
                        }
                    }
                }
                Err(e) => {
                    last_err = e.to_string();
                    continue;
                }
            }
        }

        Err(EmbedError::Transient(format!(
            "embedding failed after {} retries: {}",
            self.max_retries, last_err
        )))
    }
}

/// Extract `data[0].embedding` from an embeddings API response and
/// verify it has the expected dimensionality. Partial or malformed
/// vectors are rejected rather than stored.
fn parse_embedding_response(
    json: &serde_json::Value,
    dims: usize,
) -> Result<Vec<f32>, EmbedError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbedError::Transient("malformed embeddings response".to_string()))?;

    let vec: Vec<f32> = embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    if vec.len() != dims {
        return Err(EmbedError::Transient(format!(
            "provider returned {} dims, expected {}",
            vec.len(),
            dims
        )));
    }

    Ok(vec)
}

/// Create the configured provider, if any.
///
/// Returns `None` for `provider = "disabled"`: the pipeline then skips
/// the embedding phase and retrieval degrades to an empty context.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<String>,
) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => {
            let key = api_key
                .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set for OpenAI provider"))?;
            Ok(Some(Arc::new(OpenAiEmbedder::new(key, config)?)))
        }
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing
/// a BLOB of `vec.len() × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values
/// from the byte slice.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

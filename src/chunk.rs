//! Word-window text chunker.
//!
//! Splits normalized body text into overlapping, word-bounded chunks
//! sized to a target token budget. The overlap carries context across
//! chunk boundaries, which keeps retrieval grounded near the seams.
//!
//! Each chunk receives a UUID plus a SHA-256 hash of its text for
//! staleness detection in the embedding pipeline.
//!
//! # Algorithm
//!
//! 1. Split the text on whitespace into words.
//! 2. Convert `max_tokens` and `overlap_tokens` to word counts using the
//!    0.75 words-per-token heuristic.
//! 3. Emit windows of `window` words starting at word 0, advancing by
//!    `window - overlap` each step.
//! 4. Stop once a window reaches or passes the end of the word list;
//!    that final (possibly short) window is still emitted.
//! 5. Rejoin each window's words with single spaces.
//!
//! The heuristic deliberately avoids depending on the embedding
//! provider's exact tokenizer; chunk sizes stay predictable and the
//! external contract (ordered, overlapping, non-empty chunks) would
//! survive swapping in a real tokenizer.

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Chunk;

/// Approximate words-per-token ratio for English prose.
const WORDS_PER_TOKEN: f64 = 0.75;

/// Raised when the overlap budget is not smaller than the chunk window.
///
/// With `overlap >= window` the window start would never advance; this
/// is a caller configuration error, not something to loop on.
#[derive(Debug, Error)]
#[error(
    "chunk overlap ({overlap_words} words) must be smaller than the chunk window ({window_words} words)"
)]
pub struct ChunkConfigError {
    pub window_words: usize,
    pub overlap_words: usize,
}

fn words_for(tokens: usize) -> usize {
    (tokens as f64 / WORDS_PER_TOKEN) as usize
}

/// Split normalized text into overlapping word-window chunks.
///
/// Returns chunks with contiguous indices starting at 0, in document
/// order. Empty input yields an empty vector. Fails only on a
/// non-terminating window configuration.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    max_tokens: usize,
    overlap_tokens: usize,
) -> Result<Vec<Chunk>, ChunkConfigError> {
    let window = words_for(max_tokens);
    let overlap = words_for(overlap_tokens);

    if window == 0 || overlap >= window {
        return Err(ChunkConfigError {
            window_words: window,
            overlap_words: overlap,
        });
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = window - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index: i64 = 0;

    loop {
        let end = (start + window).min(words.len());
        let piece = words[start..end].join(" ");
        if !piece.is_empty() {
            chunks.push(make_chunk(document_id, index, &piece));
            index += 1;
        }
        if start + window >= words.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Create a single [`Chunk`] with a UUID and SHA-256 content hash.
fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
        embedding: None,
        created_at: chrono::Utc::now().timestamp(),
    }
}

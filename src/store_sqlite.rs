//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Wraps a [`SqlitePool`] and translates every store method into one or
//! more SQL statements against the schema created by
//! [`migrate::run_migrations`](crate::migrate::run_migrations).
//! Multi-row mutations (`delete_document`, `replace_chunks`) run inside
//! a transaction so concurrent readers observe either the old state or
//! the new state, never a partial mix.
//!
//! Vector search decodes the embedding BLOBs and computes cosine
//! similarity in Rust; `find_nearest_chunks` is a trait method so a
//! dedicated vector index could replace this scan without touching the
//! orchestrator or the query path.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::StoreError;
use crate::models::{Chunk, Document, DocumentFilter};
use crate::store::{validate_document, DocumentStore};

/// SQLite implementation of [`DocumentStore`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        source_url: row.get("source_url"),
        metadata_json: row.get("metadata_json"),
        published: row.get("published"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn chunk_from_row(row: &sqlx::sqlite::SqliteRow) -> Chunk {
    let blob: Option<Vec<u8>> = row.get("embedding");
    Chunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        chunk_index: row.get("chunk_index"),
        text: row.get("text"),
        hash: row.get("hash"),
        embedding: blob.map(|b| blob_to_vec(&b)),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create_document(&self, doc: &Document) -> Result<(), StoreError> {
        validate_document(doc)?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, title, body, source_url, metadata_json,
                                   published, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.body)
        .bind(&doc.source_url)
        .bind(&doc.metadata_json)
        .bind(doc.published)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(
            "SELECT id, title, body, source_url, metadata_json, published, created_at, updated_at
             FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(document_from_row))
    }

    async fn get_document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, document_id, chunk_index, text, hash, embedding, created_at
             FROM chunks WHERE document_id = ? ORDER BY chunk_index ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(chunk_from_row).collect())
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError> {
        let rows = match filter.published {
            Some(published) => {
                sqlx::query(
                    "SELECT id, title, body, source_url, metadata_json, published, created_at, updated_at
                     FROM documents WHERE published = ? ORDER BY updated_at DESC, id ASC",
                )
                .bind(published)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, title, body, source_url, metadata_json, published, created_at, updated_at
                     FROM documents ORDER BY updated_at DESC, id ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(document_from_row).collect())
    }

    async fn delete_document(&self, id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the chunk delete.
            return Err(StoreError::NotFound(format!("document {}", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn replace_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            let blob = chunk.embedding.as_deref().map(vec_to_blob);
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, text, hash, embedding, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(blob)
            .bind(chunk.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_chunk_embedding(&self, chunk_id: &str, vector: &[f32]) -> Result<(), StoreError> {
        let blob = vec_to_blob(vector);
        let result = sqlx::query("UPDATE chunks SET embedding = ? WHERE id = ?")
            .bind(&blob)
            .bind(chunk_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("chunk {}", chunk_id)));
        }
        Ok(())
    }

    async fn find_nearest_chunks(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<(Chunk, f32)>, StoreError> {
        let published = filter.and_then(|f| f.published);

        let rows = match published {
            Some(published) => {
                sqlx::query(
                    r#"
                    SELECT c.id, c.document_id, c.chunk_index, c.text, c.hash,
                           c.embedding, c.created_at
                    FROM chunks c
                    JOIN documents d ON d.id = c.document_id
                    WHERE c.embedding IS NOT NULL AND d.published = ?
                    "#,
                )
                .bind(published)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT c.id, c.document_id, c.chunk_index, c.text, c.hash,
                           c.embedding, c.created_at
                    FROM chunks c
                    WHERE c.embedding IS NOT NULL
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut scored: Vec<(Chunk, f32)> = rows
            .iter()
            .map(|row| {
                let chunk = chunk_from_row(row);
                let score =
                    cosine_similarity(query, chunk.embedding.as_deref().unwrap_or(&[]));
                (chunk, score)
            })
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
        let result = sqlx::query("DELETE FROM chunks").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn touch_all_documents(&self) -> Result<u64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query("UPDATE documents SET updated_at = ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_chunks(&self, document_id: Option<&str>) -> Result<u64, StoreError> {
        let count: i64 = match document_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE document_id = ?")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count as u64)
    }
}

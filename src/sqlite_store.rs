//! SQLite-backed [`CorpusStore`] implementation.
//!
//! Passage sets live in `passage_sets` (one row per document) and
//! `passages` (one row per passage, vector as a little-endian f32 BLOB).
//! Both are replaced wholesale inside one transaction.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use simcheck_core::embedding::{blob_to_vec, vec_to_blob};
use simcheck_core::models::{Batch, Document, Passage, PassageSet};
use simcheck_core::store::CorpusStore;

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`CorpusStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const DOCUMENT_COLUMNS: &str = "id, batch_id, filename, content_hash, body, created_at";

fn row_to_document(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        batch_id: row.get("batch_id"),
        filename: row.get("filename"),
        content_hash: row.get("content_hash"),
        text: row.get("body"),
        created_at: row.get("created_at"),
        passages: None,
    }
}

fn row_to_passage(row: &SqliteRow) -> Passage {
    let embedding: Option<Vec<u8>> = row.get("embedding");
    Passage {
        index: row.get::<i64, _>("passage_index") as usize,
        start: row.get::<i64, _>("start_char") as usize,
        end: row.get::<i64, _>("end_char") as usize,
        text: row.get("text"),
        vector: embedding.map(|blob| blob_to_vec(&blob)),
    }
}

fn row_to_set_header(row: &SqliteRow) -> PassageSet {
    PassageSet {
        chunk_size: row.get::<i64, _>("chunk_size") as usize,
        overlap: row.get::<i64, _>("overlap") as usize,
        model: row.get("model"),
        dims: row.get::<i64, _>("dims") as usize,
        passages: Vec::new(),
    }
}

async fn load_passage_set(conn: &mut SqliteConnection, doc_id: &str) -> Result<Option<PassageSet>> {
    let header = sqlx::query(
        "SELECT chunk_size, overlap, model, dims FROM passage_sets WHERE document_id = ?",
    )
    .bind(doc_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };
    let mut set = row_to_set_header(&header);

    let rows = sqlx::query(
        "SELECT passage_index, start_char, end_char, text, embedding FROM passages \
         WHERE document_id = ? ORDER BY passage_index ASC",
    )
    .bind(doc_id)
    .fetch_all(&mut *conn)
    .await?;
    set.passages = rows.iter().map(row_to_passage).collect();

    Ok(Some(set))
}

async fn write_passage_set(
    conn: &mut SqliteConnection,
    doc_id: &str,
    set: &PassageSet,
) -> Result<()> {
    sqlx::query("DELETE FROM passages WHERE document_id = ?")
        .bind(doc_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM passage_sets WHERE document_id = ?")
        .bind(doc_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO passage_sets (document_id, chunk_size, overlap, model, dims, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(doc_id)
    .bind(set.chunk_size as i64)
    .bind(set.overlap as i64)
    .bind(&set.model)
    .bind(set.dims as i64)
    .bind(chrono::Utc::now().timestamp())
    .execute(&mut *conn)
    .await?;

    for passage in &set.passages {
        sqlx::query(
            "INSERT INTO passages (document_id, passage_index, start_char, end_char, text, embedding) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(doc_id)
        .bind(passage.index as i64)
        .bind(passage.start as i64)
        .bind(passage.end as i64)
        .bind(&passage.text)
        .bind(passage.vector.as_deref().map(vec_to_blob))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl CorpusStore for SqliteStore {
    async fn upsert_batch(&self, name: &str) -> Result<Batch> {
        sqlx::query(
            "INSERT INTO batches (id, name, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT id, name, created_at FROM batches WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(Batch {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        })
    }

    async fn list_batches(&self) -> Result<Vec<Batch>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM batches ORDER BY created_at, name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| Batch {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO documents (id, batch_id, filename, content_hash, body, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&doc.id)
        .bind(&doc.batch_id)
        .bind(&doc.filename)
        .bind(&doc.content_hash)
        .bind(&doc.text)
        .bind(doc.created_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert document {}", doc.filename))?;

        if let Some(set) = &doc.passages {
            write_passage_set(&mut tx, &doc.id, set).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query(&format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let mut doc = row_to_document(&row);
                doc.passages = load_passage_set(&mut conn, id).await?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE content_hash = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_document))
    }

    async fn list_documents(&self, batch_id: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE batch_id = ? ORDER BY seq ASC",
            DOCUMENT_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn fetch_candidates(&self, batch_id: &str, exclude_id: &str) -> Result<Vec<Document>> {
        // Both reads share one transaction so they see the same snapshot.
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE batch_id = ? AND id != ? ORDER BY seq ASC",
            DOCUMENT_COLUMNS
        ))
        .bind(batch_id)
        .bind(exclude_id)
        .fetch_all(&mut *tx)
        .await?;
        let mut docs: Vec<Document> = rows.iter().map(row_to_document).collect();

        let headers = sqlx::query(
            "SELECT s.document_id, s.chunk_size, s.overlap, s.model, s.dims \
             FROM passage_sets s JOIN documents d ON d.id = s.document_id \
             WHERE d.batch_id = ? AND d.id != ?",
        )
        .bind(batch_id)
        .bind(exclude_id)
        .fetch_all(&mut *tx)
        .await?;
        let mut sets: HashMap<String, PassageSet> = headers
            .iter()
            .map(|row| (row.get("document_id"), row_to_set_header(row)))
            .collect();

        let passage_rows = sqlx::query(
            "SELECT p.document_id, p.passage_index, p.start_char, p.end_char, p.text, p.embedding \
             FROM passages p JOIN documents d ON d.id = p.document_id \
             WHERE d.batch_id = ? AND d.id != ? \
             ORDER BY p.document_id, p.passage_index ASC",
        )
        .bind(batch_id)
        .bind(exclude_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        for row in &passage_rows {
            let doc_id: String = row.get("document_id");
            if let Some(set) = sets.get_mut(&doc_id) {
                set.passages.push(row_to_passage(row));
            }
        }
        for doc in &mut docs {
            doc.passages = sets.remove(&doc.id);
        }

        Ok(docs)
    }

    async fn replace_passages(&self, doc_id: &str, passages: &PassageSet) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM documents WHERE id = ?")
            .bind(doc_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            bail!("document not found: {}", doc_id);
        }

        write_passage_set(&mut tx, doc_id, passages).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM passages WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM passage_sets WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

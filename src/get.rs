//! Corpus inspection: batches, document listings, single documents, and
//! deletion.

use anyhow::{anyhow, Result};
use serde::Serialize;

use simcheck_core::models::{Batch, Document};
use simcheck_core::store::CorpusStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Look up a batch by name.
pub async fn find_batch<S: CorpusStore + ?Sized>(store: &S, name: &str) -> Result<Batch> {
    store
        .list_batches()
        .await?
        .into_iter()
        .find(|b| b.name == name)
        .ok_or_else(|| anyhow!("batch not found: {}", name))
}

/// Fetch a document by id, failing if it does not exist.
pub async fn require_document<S: CorpusStore + ?Sized>(store: &S, id: &str) -> Result<Document> {
    store
        .get_document(id)
        .await?
        .ok_or_else(|| anyhow!("document not found: {}", id))
}

#[derive(Debug, Clone, Serialize)]
pub struct PassageResponse {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub embedded: bool,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub batch: String,
    pub filename: String,
    pub content_hash: String,
    pub created_at: String, // ISO8601
    pub embedding_model: Option<String>,
    pub text: String,
    pub passages: Vec<PassageResponse>,
}

/// Core get function returning structured data.
pub async fn get_document<S: CorpusStore + ?Sized>(store: &S, id: &str) -> Result<DocumentResponse> {
    let doc = require_document(store, id).await?;
    let batch = store
        .list_batches()
        .await?
        .into_iter()
        .find(|b| b.id == doc.batch_id)
        .map(|b| b.name)
        .unwrap_or_else(|| doc.batch_id.clone());

    let (embedding_model, passages) = match doc.passages {
        Some(set) => (
            Some(set.model),
            set.passages
                .into_iter()
                .map(|p| PassageResponse {
                    index: p.index,
                    start: p.start,
                    end: p.end,
                    embedded: p.vector.is_some(),
                    text: p.text,
                })
                .collect(),
        ),
        None => (None, Vec::new()),
    };

    Ok(DocumentResponse {
        id: doc.id,
        batch,
        filename: doc.filename,
        content_hash: doc.content_hash,
        created_at: format_ts_iso(doc.created_at),
        embedding_model,
        text: doc.text,
        passages,
    })
}

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let doc = get_document(&store, id).await?;
    store.close().await;

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!("batch:        {}", doc.batch);
    println!("filename:     {}", doc.filename);
    println!("content_hash: {}", doc.content_hash);
    println!("created_at:   {}", doc.created_at);
    println!(
        "embedding:    {}",
        doc.embedding_model.as_deref().unwrap_or("(not embedded)")
    );
    println!();

    println!("--- Text ---");
    println!("{}", doc.text);
    println!();

    println!("--- Passages ({}) ---", doc.passages.len());
    for passage in &doc.passages {
        println!(
            "[passage {}] chars {}..{}{}",
            passage.index,
            passage.start,
            passage.end,
            if passage.embedded { "" } else { " (no vector)" }
        );
        println!("{}", passage.text);
        println!();
    }

    Ok(())
}

pub async fn run_batches(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let batches = store.list_batches().await?;

    if batches.is_empty() {
        println!("no batches");
    }
    for batch in &batches {
        let count = store.list_documents(&batch.id).await?.len();
        println!(
            "{}  {}  {} documents  created {}",
            batch.id,
            batch.name,
            count,
            format_ts_iso(batch.created_at)
        );
    }

    store.close().await;
    Ok(())
}

pub async fn run_list(config: &Config, batch_name: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let batch = find_batch(&store, batch_name).await?;
    let docs = store.list_documents(&batch.id).await?;

    println!("batch {} ({} documents)", batch.name, docs.len());
    for doc in &docs {
        println!(
            "{}  {}  {} chars",
            doc.id,
            doc.filename,
            doc.text.chars().count()
        );
    }

    store.close().await;
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let deleted = store.delete_document(id).await?;
    store.close().await;

    if !deleted {
        anyhow::bail!("document not found: {}", id);
    }
    println!("deleted {}", id);
    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcheck_core::models::{Passage, PassageSet};
    use simcheck_core::store::memory::InMemoryStore;

    #[tokio::test]
    async fn test_get_document_resolves_batch_name() {
        let store = InMemoryStore::new();
        let batch = store.upsert_batch("spring").await.unwrap();
        let doc = Document::new(&batch.id, "a.txt", "hello");
        store.insert_document(&doc).await.unwrap();
        store
            .replace_passages(
                &doc.id,
                &PassageSet {
                    chunk_size: 500,
                    overlap: 50,
                    model: "m".to_string(),
                    dims: 1,
                    passages: vec![Passage {
                        index: 0,
                        start: 0,
                        end: 5,
                        text: "hello".to_string(),
                        vector: None,
                    }],
                },
            )
            .await
            .unwrap();

        let resp = get_document(&store, &doc.id).await.unwrap();
        assert_eq!(resp.batch, "spring");
        assert_eq!(resp.embedding_model.as_deref(), Some("m"));
        assert_eq!(resp.passages.len(), 1);
        assert!(!resp.passages[0].embedded);
    }

    #[tokio::test]
    async fn test_missing_lookups_fail() {
        let store = InMemoryStore::new();
        assert!(get_document(&store, "nope").await.is_err());
        assert!(find_batch(&store, "nope").await.is_err());
    }

    #[test]
    fn test_format_ts_iso() {
        assert_eq!(format_ts_iso(0), "1970-01-01T00:00:00Z");
    }
}

//! In-memory [`CorpusStore`] implementation for testing and embedding.
//!
//! Uses `Vec` behind `std::sync::RwLock` for thread safety. Guards are
//! dropped before every return, so no lock is held across an `.await`.

use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Batch, Document, PassageSet};

use super::CorpusStore;

/// In-memory corpus. Documents keep insertion order.
pub struct InMemoryStore {
    batches: RwLock<Vec<Batch>>,
    docs: RwLock<Vec<Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            batches: RwLock::new(Vec::new()),
            docs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl CorpusStore for InMemoryStore {
    async fn upsert_batch(&self, name: &str) -> Result<Batch> {
        let mut batches = self.batches.write().map_err(poisoned)?;
        if let Some(existing) = batches.iter().find(|b| b.name == name) {
            return Ok(existing.clone());
        }
        let batch = Batch {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        };
        batches.push(batch.clone());
        Ok(batch)
    }

    async fn list_batches(&self) -> Result<Vec<Batch>> {
        Ok(self.batches.read().map_err(poisoned)?.clone())
    }

    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        if docs.iter().any(|d| d.id == doc.id) {
            bail!("document {} already exists", doc.id);
        }
        if let Some(dup) = docs.iter().find(|d| d.content_hash == doc.content_hash) {
            bail!(
                "document with content hash {} already exists ({})",
                doc.content_hash,
                dup.id
            );
        }
        docs.push(doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.iter().find(|d| d.content_hash == content_hash).cloned())
    }

    async fn list_documents(&self, batch_id: &str) -> Result<Vec<Document>> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.iter().filter(|d| d.batch_id == batch_id).cloned().collect())
    }

    async fn fetch_candidates(&self, batch_id: &str, exclude_id: &str) -> Result<Vec<Document>> {
        // Cloning under one read guard is the snapshot.
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs
            .iter()
            .filter(|d| d.batch_id == batch_id && d.id != exclude_id)
            .cloned()
            .collect())
    }

    async fn replace_passages(&self, doc_id: &str, passages: &PassageSet) -> Result<()> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == doc_id)
            .ok_or_else(|| anyhow!("document not found: {}", doc_id))?;
        doc.passages = Some(passages.clone());
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passage;

    #[tokio::test]
    async fn test_upsert_batch_is_idempotent() {
        let store = InMemoryStore::new();
        let a = store.upsert_batch("spring").await.unwrap();
        let b = store.upsert_batch("spring").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.list_batches().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_hash_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_document(&Document::new("b", "a.txt", "same"))
            .await
            .unwrap();
        let dup = Document::new("b", "copy.txt", "same");
        assert!(store.insert_document(&dup).await.is_err());
        let found = store
            .find_by_hash(&dup.content_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.filename, "a.txt");
    }

    #[tokio::test]
    async fn test_fetch_candidates_excludes_and_keeps_order() {
        let store = InMemoryStore::new();
        let docs: Vec<Document> = (0..4)
            .map(|i| Document::new("b1", &format!("{}.txt", i), &format!("text {}", i)))
            .collect();
        for d in &docs {
            store.insert_document(d).await.unwrap();
        }
        store
            .insert_document(&Document::new("b2", "other.txt", "elsewhere"))
            .await
            .unwrap();

        let candidates = store.fetch_candidates("b1", &docs[1].id).await.unwrap();
        let names: Vec<&str> = candidates.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["0.txt", "2.txt", "3.txt"]);
    }

    #[tokio::test]
    async fn test_snapshot_unaffected_by_later_inserts() {
        let store = InMemoryStore::new();
        let first = Document::new("b", "first.txt", "one");
        store.insert_document(&first).await.unwrap();
        let snapshot = store.fetch_candidates("b", "nobody").await.unwrap();
        store
            .insert_document(&Document::new("b", "second.txt", "two"))
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.fetch_candidates("b", "nobody").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replace_passages_and_delete() {
        let store = InMemoryStore::new();
        let doc = Document::new("b", "a.txt", "abc");
        store.insert_document(&doc).await.unwrap();
        let set = PassageSet {
            chunk_size: 500,
            overlap: 50,
            model: "m".to_string(),
            dims: 1,
            passages: vec![Passage {
                index: 0,
                start: 0,
                end: 3,
                text: "abc".to_string(),
                vector: Some(vec![1.0]),
            }],
        };
        store.replace_passages(&doc.id, &set).await.unwrap();
        let stored = store.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(stored.passages, Some(set.clone()));

        assert!(store.replace_passages("missing", &set).await.is_err());
        assert!(store.delete_document(&doc.id).await.unwrap());
        assert!(!store.delete_document(&doc.id).await.unwrap());
        assert!(store.get_document(&doc.id).await.unwrap().is_none());
    }
}

//! Corpus storage contract.
//!
//! The [`CorpusStore`] trait is the only read/write surface the comparison
//! core needs from persistence. Schema, transactions, and file storage
//! belong to the implementation (SQLite in the app crate, [`memory`] for
//! tests and embedding in other hosts).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Batch, Document, PassageSet};

/// Abstract corpus backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_batch`](CorpusStore::upsert_batch) | Get or create a batch by name |
/// | [`list_batches`](CorpusStore::list_batches) | All batches, oldest first |
/// | [`insert_document`](CorpusStore::insert_document) | Add a new document |
/// | [`get_document`](CorpusStore::get_document) | Document with its passages, by ID |
/// | [`find_by_hash`](CorpusStore::find_by_hash) | Deduplication lookup |
/// | [`list_documents`](CorpusStore::list_documents) | Documents of one batch |
/// | [`fetch_candidates`](CorpusStore::fetch_candidates) | Snapshot of a batch minus one document |
/// | [`replace_passages`](CorpusStore::replace_passages) | Store a document's passages wholesale |
/// | [`delete_document`](CorpusStore::delete_document) | Remove a document and its passages |
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Return the batch called `name`, creating it if needed.
    async fn upsert_batch(&self, name: &str) -> Result<Batch>;

    async fn list_batches(&self) -> Result<Vec<Batch>>;

    /// Insert a document. Fails if its id or content hash already exists.
    async fn insert_document(&self, doc: &Document) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// The document whose content hash is `content_hash`, if any.
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>>;

    /// Documents in `batch_id`, in insertion order.
    async fn list_documents(&self, batch_id: &str) -> Result<Vec<Document>>;

    /// Every document in `batch_id` except `exclude_id`, with passages,
    /// in insertion order.
    ///
    /// Must be a snapshot: documents ingested while the result is being
    /// consumed are not part of it.
    async fn fetch_candidates(&self, batch_id: &str, exclude_id: &str) -> Result<Vec<Document>>;

    /// Replace all passages of a document.
    async fn replace_passages(&self, doc_id: &str, passages: &PassageSet) -> Result<()>;

    /// Delete a document. Returns whether it existed.
    async fn delete_document(&self, id: &str) -> Result<bool>;
}

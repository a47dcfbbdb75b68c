//! Core data models: documents, passages, matches, and comparison reports.
//!
//! Documents and passage sets are what the corpus store persists. Matches,
//! comparison results, and batch rankings are derived artifacts produced
//! per request and reproducible from the same inputs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunk::ChunkParams;
use crate::hash::content_hash_str;

/// A named collection of documents ranked against one another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// An ingested document.
///
/// `text` and `content_hash` never change after creation. `passages` is
/// `None` until the document has been chunked and embedded, and is only
/// ever replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub batch_id: String,
    pub filename: String,
    pub content_hash: String,
    pub text: String,
    pub created_at: i64,
    pub passages: Option<PassageSet>,
}

impl Document {
    /// Create a new document with a fresh UUID and its content hash.
    pub fn new(batch_id: &str, filename: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            filename: filename.to_string(),
            content_hash: content_hash_str(text),
            text: text.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            passages: None,
        }
    }
}

/// The passages of one document for one chunking configuration and one
/// embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageSet {
    pub chunk_size: usize,
    pub overlap: usize,
    pub model: String,
    pub dims: usize,
    pub passages: Vec<Passage>,
}

impl PassageSet {
    /// Whether this set was produced with `chunking` by `model` at `dims`
    /// dimensions, and every passage carries a vector of that dimension.
    pub fn is_compatible(&self, chunking: &ChunkParams, model: &str, dims: usize) -> bool {
        self.chunk_size == chunking.chunk_size
            && self.overlap == chunking.overlap
            && self.model == model
            && self.dims == dims
            && self
                .passages
                .iter()
                .all(|p| p.vector.as_ref().map(|v| v.len()) == Some(self.dims))
    }
}

/// One fixed-size, possibly overlapping slice of a document.
///
/// `start` and `end` are character offsets into the document text
/// (end exclusive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// An accepted pairing of a source passage with its best target passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub source_index: usize,
    pub target_index: usize,
    /// Similarity in `[0.0, 1.0]`, rounded to 4 decimals.
    pub score: f64,
    pub source_chunk: String,
    pub target_chunk: String,
}

/// Whether a score is backed by embeddings on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Signal {
    Embedded,
    /// At least one side had no usable vectors; the score is 0.0 for lack
    /// of evidence, not because the documents differ.
    NoSignal { reason: String },
}

impl Signal {
    pub fn is_embedded(&self) -> bool {
        matches!(self, Signal::Embedded)
    }
}

/// Directional comparison of a source document against a target.
///
/// `score` is normalized by the source's passage count, so comparing
/// (A, B) need not equal comparing (B, A).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub score: f64,
    pub matches: Vec<Match>,
    pub chunks_a: usize,
    pub chunks_b: usize,
    pub signal: Signal,
}

impl ComparisonResult {
    pub fn no_signal(chunks_a: usize, chunks_b: usize, reason: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            matches: Vec::new(),
            chunks_a,
            chunks_b,
            signal: Signal::NoSignal {
                reason: reason.into(),
            },
        }
    }
}

/// One candidate's row in a batch ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRankingEntry {
    pub document_id: String,
    pub filename: String,
    pub similarity: f64,
    pub matches: Vec<Match>,
}

/// A candidate that could not be compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub candidate_id: String,
    pub reason: String,
}

/// Output of ranking one document against the rest of its batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRanking {
    pub target_id: String,
    /// Whether the target itself was embedded. When it was not, every
    /// candidate lands in `no_signal` and `entries` is empty for lack of
    /// evidence.
    pub signal: Signal,
    /// Sorted by `similarity`, highest first.
    pub entries: Vec<BatchRankingEntry>,
    pub failures: Vec<CandidateFailure>,
    /// Candidates compared without embeddings on one side, so their 0.0
    /// score says nothing about similarity.
    pub no_signal: Vec<CandidateFailure>,
    pub candidates_considered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(index: usize, vector: Option<Vec<f32>>) -> Passage {
        Passage {
            index,
            start: 0,
            end: 1,
            text: "x".to_string(),
            vector,
        }
    }

    #[test]
    fn test_document_new_hashes_content() {
        let doc = Document::new("b1", "a.txt", "hello");
        assert_eq!(doc.content_hash, content_hash_str("hello"));
        assert_eq!(doc.batch_id, "b1");
        assert!(doc.passages.is_none());
        assert_ne!(doc.id, Document::new("b1", "a.txt", "hello").id);
    }

    #[test]
    fn test_passage_set_compatibility() {
        let params = ChunkParams::new(500, 50).unwrap();
        let set = PassageSet {
            chunk_size: 500,
            overlap: 50,
            model: "m".to_string(),
            dims: 2,
            passages: vec![passage(0, Some(vec![1.0, 0.0]))],
        };
        assert!(set.is_compatible(&params, "m", 2));
        assert!(!set.is_compatible(&params, "other", 2));
        assert!(!set.is_compatible(&ChunkParams::new(400, 50).unwrap(), "m", 2));

        let mut missing = set.clone();
        missing.passages.push(passage(1, None));
        assert!(!missing.is_compatible(&params, "m", 2));
    }

    #[test]
    fn test_passage_set_from_other_dimension_is_stale() {
        let params = ChunkParams::new(500, 50).unwrap();
        let set = PassageSet {
            chunk_size: 500,
            overlap: 50,
            model: "m".to_string(),
            dims: 2,
            passages: vec![passage(0, Some(vec![1.0, 0.0]))],
        };
        assert!(!set.is_compatible(&params, "m", 3));

        // A header that disagrees with its own vectors is never trusted.
        let mut mislabeled = set.clone();
        mislabeled.dims = 3;
        assert!(!mislabeled.is_compatible(&params, "m", 3));
    }

    #[test]
    fn test_signal_serializes_with_status_tag() {
        let json = serde_json::to_value(Signal::NoSignal {
            reason: "embedder down".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "no_signal");
        assert_eq!(json["reason"], "embedder down");
    }
}

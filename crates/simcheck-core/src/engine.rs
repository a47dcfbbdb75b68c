//! The similarity engine: chunking, embedding, caching, comparison, and
//! batch ranking behind one constructor-injected embedder.
//!
//! The application builds one [`SimilarityEngine`] at startup and shares
//! it. Embedding is the only suspension point; every comparison after it
//! is a pure function of the two passage sets.
//!
//! # Embedding reuse
//!
//! [`SimilarityEngine::prepare`] looks for vectors in this order:
//!
//! 1. The document's stored [`PassageSet`], if it was produced with the
//!    current chunking parameters and model.
//! 2. The in-process [`EmbeddingCache`], keyed by content hash.
//! 3. Chunk and embed now, then cache.
//!
//! When the embedder fails, `prepare` degrades to passages without vectors
//! marked [`Signal::NoSignal`], so downstream scores are an explicit 0.0
//! rather than an error or a silently wrong number.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::chunk::{chunk_text, ChunkParams};
use crate::compare::{compare_embedded, EmbeddedDocument, MatchParams};
use crate::embedding::Embedder;
use crate::error::CoreError;
use crate::models::{BatchRanking, CandidateFailure, ComparisonResult, Document, PassageSet, Signal};
use crate::rank::{rank_embedded, CancellationFlag};
use crate::store::CorpusStore;

/// All tunable parameters of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineParams {
    pub chunking: ChunkParams,
    pub matching: MatchParams,
}

impl EngineParams {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.chunking.validate()?;
        self.matching.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    content_hash: String,
    chunking: ChunkParams,
    model: String,
}

/// Per-process cache of embedded passage sets.
///
/// Keyed by content hash, chunking parameters, and model, so two
/// documents with identical text share one embedding run.
#[derive(Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<CacheKey, Arc<PassageSet>>>,
}

impl EmbeddingCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<PassageSet>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn insert(&self, key: CacheKey, set: Arc<PassageSet>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, set);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// Document similarity engine.
pub struct SimilarityEngine {
    embedder: Arc<dyn Embedder>,
    params: EngineParams,
    cache: EmbeddingCache,
}

impl SimilarityEngine {
    /// # Errors
    ///
    /// [`CoreError::InvalidConfiguration`] for unusable parameters.
    pub fn new(embedder: Arc<dyn Embedder>, params: EngineParams) -> Result<Self, CoreError> {
        params.validate()?;
        Ok(Self {
            embedder,
            params,
            cache: EmbeddingCache::default(),
        })
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    fn cache_key(&self, doc: &Document) -> CacheKey {
        CacheKey {
            content_hash: doc.content_hash.clone(),
            chunking: self.params.chunking,
            model: self.embedder.model_name().to_string(),
        }
    }

    /// Chunk and embed `doc`, reusing stored or cached vectors.
    ///
    /// # Errors
    ///
    /// [`CoreError::EmbeddingUnavailable`] if the embedder fails or returns
    /// the wrong number or dimension of vectors.
    pub async fn embed_strict(&self, doc: &Document) -> Result<PassageSet, CoreError> {
        let model = self.embedder.model_name();

        if let Some(stored) = &doc.passages {
            if stored.is_compatible(&self.params.chunking, model, self.embedder.dims()) {
                return Ok(stored.clone());
            }
        }

        let key = self.cache_key(doc);
        if let Some(cached) = self.cache.get(&key) {
            tracing::trace!(doc_id = %doc.id, "embedding cache hit");
            return Ok(cached.as_ref().clone());
        }

        let mut passages: Vec<_> = chunk_text(&doc.text, &self.params.chunking)?.collect();
        let dims = self.embedder.dims();

        if !passages.is_empty() {
            let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .map_err(|e| CoreError::EmbeddingUnavailable(format!("{:#}", e)))?;

            if vectors.len() != passages.len() {
                return Err(CoreError::EmbeddingUnavailable(format!(
                    "embedder returned {} vectors for {} passages",
                    vectors.len(),
                    passages.len()
                )));
            }
            for (passage, vector) in passages.iter_mut().zip(vectors) {
                if vector.len() != dims {
                    return Err(CoreError::EmbeddingUnavailable(format!(
                        "embedder returned a {}-dimensional vector, expected {}",
                        vector.len(),
                        dims
                    )));
                }
                passage.vector = Some(vector);
            }
        }

        let set = PassageSet {
            chunk_size: self.params.chunking.chunk_size,
            overlap: self.params.chunking.overlap,
            model: model.to_string(),
            dims,
            passages,
        };
        tracing::debug!(doc_id = %doc.id, passages = set.passages.len(), "embedded document");
        self.cache.insert(key, Arc::new(set.clone()));
        Ok(set)
    }

    /// Embed `doc` for comparison, degrading to "no signal" when the
    /// embedder is unavailable.
    pub async fn prepare(&self, doc: &Document) -> Result<EmbeddedDocument, CoreError> {
        match self.embed_strict(doc).await {
            Ok(set) => Ok(EmbeddedDocument {
                id: doc.id.clone(),
                filename: doc.filename.clone(),
                content_hash: doc.content_hash.clone(),
                dims: Some(set.dims),
                passages: set.passages,
                signal: Signal::Embedded,
            }),
            Err(CoreError::EmbeddingUnavailable(reason)) => {
                tracing::warn!(
                    doc_id = %doc.id,
                    reason = %reason,
                    "embedding unavailable; document carries no signal"
                );
                Ok(EmbeddedDocument {
                    id: doc.id.clone(),
                    filename: doc.filename.clone(),
                    content_hash: doc.content_hash.clone(),
                    passages: chunk_text(&doc.text, &self.params.chunking)?.collect(),
                    dims: None,
                    signal: Signal::NoSignal { reason },
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Compare two documents, `source` against `target`.
    ///
    /// # Errors
    ///
    /// [`CoreError::SelfComparison`] when both are the same document,
    /// [`CoreError::DimensionMismatch`] if their stored vectors disagree.
    pub async fn compare_documents(
        &self,
        source: &Document,
        target: &Document,
    ) -> Result<ComparisonResult, CoreError> {
        if source.id == target.id {
            return Err(CoreError::SelfComparison(source.id.clone()));
        }
        let a = self.prepare(source).await?;
        let b = self.prepare(target).await?;
        compare_embedded(&a, &b, &self.params.matching)
    }

    /// Compare two raw texts that are not part of any corpus.
    pub async fn compare_texts(
        &self,
        source: &str,
        target: &str,
    ) -> Result<ComparisonResult, CoreError> {
        let a = Document::new("", "source", source);
        let b = Document::new("", "target", target);
        self.compare_documents(&a, &b).await
    }

    /// Rank every other document of `doc`'s batch by similarity to `doc`.
    ///
    /// The candidate list is read once up front, so documents ingested
    /// during the pass are not ranked. `cancel` is checked before each
    /// candidate is prepared and before each comparison.
    ///
    /// # Errors
    ///
    /// [`CoreError::Store`] if the candidate snapshot cannot be read,
    /// [`CoreError::Cancelled`] on cancellation. Failures of individual
    /// candidates are reported in [`BatchRanking::failures`], and candidates
    /// that could not be scored without embeddings in
    /// [`BatchRanking::no_signal`].
    pub async fn rank_batch<S: CorpusStore + ?Sized>(
        &self,
        store: &S,
        doc: &Document,
        cancel: &CancellationFlag,
    ) -> Result<BatchRanking, CoreError> {
        cancel.check()?;

        let candidates = store
            .fetch_candidates(&doc.batch_id, &doc.id)
            .await
            .map_err(CoreError::store)?;
        tracing::info!(
            doc_id = %doc.id,
            batch_id = %doc.batch_id,
            candidates = candidates.len(),
            "ranking batch"
        );

        let target = self.prepare(doc).await?;

        let mut prepared = Vec::with_capacity(candidates.len());
        let mut failures = Vec::new();
        for candidate in &candidates {
            cancel.check()?;
            match self.prepare(candidate).await {
                Ok(embedded) => prepared.push(embedded),
                Err(e) => {
                    let failure = CandidateFailure {
                        candidate_id: candidate.id.clone(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(error = %CoreError::from(failure.clone()), "skipping candidate");
                    failures.push(failure);
                }
            }
        }

        let mut ranking = rank_embedded(&target, &prepared, &self.params.matching, cancel)?;
        ranking.candidates_considered += failures.len();
        failures.append(&mut ranking.failures);
        ranking.failures = failures;
        Ok(ranking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Letter-frequency embedder: deterministic and content-sensitive.
    struct LetterEmbedder {
        calls: AtomicUsize,
    }

    impl LetterEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for LetterEmbedder {
        fn model_name(&self) -> &str {
            "letters"
        }
        fn dims(&self) -> usize {
            26
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_ascii_lowercase().bytes() {
                        if c.is_ascii_lowercase() {
                            v[(c - b'a') as usize] += 1.0;
                        }
                    }
                    v
                })
                .collect())
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn model_name(&self) -> &str {
            "down"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("connection refused")
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn model_name(&self) -> &str {
            "short"
        }
        fn dims(&self) -> usize {
            8
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; 3]).collect())
        }
    }

    fn engine(embedder: Arc<dyn Embedder>) -> SimilarityEngine {
        SimilarityEngine::new(embedder, EngineParams::default()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_params() {
        let params = EngineParams {
            chunking: ChunkParams {
                chunk_size: 10,
                overlap: 10,
            },
            matching: MatchParams::default(),
        };
        assert!(matches!(
            SimilarityEngine::new(Arc::new(DownEmbedder), params),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_identical_texts_score_one() {
        let engine = engine(Arc::new(LetterEmbedder::new()));
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(30);
        let result = engine.compare_texts(&text, &text).await.unwrap();
        assert_eq!(result.score, 1.0);
        assert_eq!(result.matches.len(), result.chunks_a);
        assert!(result.chunks_a > 1);
        for m in &result.matches {
            assert!((m.score - 1.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn test_empty_source_scores_zero() {
        let engine = engine(Arc::new(LetterEmbedder::new()));
        let result = engine.compare_texts("", "some target text").await.unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.matches.is_empty());
        assert_eq!(result.chunks_a, 0);
        assert_eq!(result.chunks_b, 1);
    }

    #[tokio::test]
    async fn test_embedder_down_degrades_to_no_signal() {
        let engine = engine(Arc::new(DownEmbedder));
        let result = engine.compare_texts("alpha", "alpha").await.unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.chunks_a, 1);
        match result.signal {
            Signal::NoSignal { reason } => assert!(reason.contains("connection refused")),
            Signal::Embedded => panic!("expected no signal"),
        }
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_unavailable() {
        let engine = engine(Arc::new(ShortEmbedder));
        let doc = Document::new("b", "a.txt", "text");
        assert!(matches!(
            engine.embed_strict(&doc).await,
            Err(CoreError::EmbeddingUnavailable(_))
        ));
        let prepared = engine.prepare(&doc).await.unwrap();
        assert!(!prepared.signal.is_embedded());
        assert!(prepared.passages.iter().all(|p| p.vector.is_none()));
    }

    #[tokio::test]
    async fn test_cache_prevents_reembedding() {
        let embedder = Arc::new(LetterEmbedder::new());
        let engine = engine(embedder.clone());
        let a = Document::new("b", "a.txt", "shared content");
        let b = Document::new("b", "b.txt", "other content");
        engine.compare_documents(&a, &b).await.unwrap();
        engine.compare_documents(&b, &a).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_stored_passages_reused() {
        let embedder = Arc::new(LetterEmbedder::new());
        let engine = engine(embedder.clone());
        let mut doc = Document::new("b", "a.txt", "abc");
        doc.passages = Some(engine.embed_strict(&doc).await.unwrap());
        engine.cache().clear();
        engine.prepare(&doc).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stored_passages_of_other_dimension_reembedded() {
        let embedder = Arc::new(LetterEmbedder::new());
        let engine = engine(embedder.clone());
        let mut doc = Document::new("b", "a.txt", "abc");
        let mut stale = engine.embed_strict(&doc).await.unwrap();
        engine.cache().clear();
        for passage in &mut stale.passages {
            passage.vector = Some(vec![1.0; 8]);
        }
        stale.dims = 8;
        doc.passages = Some(stale);

        let set = engine.embed_strict(&doc).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(set.dims, 26);
        assert!(set
            .passages
            .iter()
            .all(|p| p.vector.as_ref().map(Vec::len) == Some(26)));
    }

    #[tokio::test]
    async fn test_self_comparison_rejected() {
        let engine = engine(Arc::new(LetterEmbedder::new()));
        let doc = Document::new("b", "a.txt", "abc");
        assert!(matches!(
            engine.compare_documents(&doc, &doc).await,
            Err(CoreError::SelfComparison(_))
        ));
    }

    #[tokio::test]
    async fn test_rank_batch_over_store() {
        let store = InMemoryStore::new();
        let engine = engine(Arc::new(LetterEmbedder::new()));
        let target = Document::new("b", "target.txt", "aaaa bbbb");
        let twin = Document::new("b", "twin.txt", "bbbb aaaa");
        let unrelated = Document::new("b", "zz.txt", "zzzz yyyy");
        for d in [&target, &twin, &unrelated] {
            store.insert_document(d).await.unwrap();
        }
        store
            .insert_document(&Document::new("other", "x.txt", "aaaa bbbb !"))
            .await
            .unwrap();

        let ranking = engine
            .rank_batch(&store, &target, &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(ranking.candidates_considered, 2);
        assert_eq!(ranking.entries.len(), 1);
        assert_eq!(ranking.entries[0].document_id, twin.id);
        assert_eq!(ranking.entries[0].similarity, 1.0);
    }

    #[tokio::test]
    async fn test_rank_batch_cancelled() {
        let store = InMemoryStore::new();
        let engine = engine(Arc::new(LetterEmbedder::new()));
        let target = Document::new("b", "t.txt", "abc");
        store.insert_document(&target).await.unwrap();
        let cancel = CancellationFlag::new();
        cancel.cancel();
        assert_eq!(
            engine.rank_batch(&store, &target, &cancel).await,
            Err(CoreError::Cancelled)
        );
    }
}

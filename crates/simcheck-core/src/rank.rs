//! Batch ranking: compare one document against every other document in a
//! collection and report the relevant ones, most similar first.
//!
//! Each (target, candidate) comparison is independent, so candidates are
//! compared on the rayon pool when the `parallel` feature is enabled. A
//! failing candidate is logged and recorded in [`BatchRanking::failures`];
//! it never aborts the batch. A candidate that could not be scored for lack
//! of embeddings on either side goes to [`BatchRanking::no_signal`], never
//! into the relevance filter.
//!
//! # Ordering
//!
//! 1. Drop the target's own id from the candidates.
//! 2. Drop candidates whose score is `<= min_relevance`.
//! 3. Stable sort by score (desc), so equal scores keep candidate order.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::compare::{compare_embedded, EmbeddedDocument, MatchParams};
use crate::error::CoreError;
use crate::models::{BatchRanking, BatchRankingEntry, CandidateFailure, ComparisonResult, Signal};

/// Cooperative cancellation shared between a caller and a ranking pass.
///
/// Cloning shares the same flag. Ranking checks it before every candidate.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }

    /// `Err(CoreError::Cancelled)` once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> Result<(), CoreError> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

enum Outcome {
    Ranked(BatchRankingEntry),
    Irrelevant,
    NoSignal(CandidateFailure),
    Failed(CandidateFailure),
    Cancelled,
}

fn evaluate(
    target: &EmbeddedDocument,
    candidate: &EmbeddedDocument,
    params: &MatchParams,
    cancel: &CancellationFlag,
) -> Outcome {
    if cancel.is_cancelled() {
        return Outcome::Cancelled;
    }

    match compare_embedded(target, candidate, params) {
        Ok(ComparisonResult {
            signal: Signal::NoSignal { reason },
            ..
        }) => Outcome::NoSignal(CandidateFailure {
            candidate_id: candidate.id.clone(),
            reason,
        }),
        Ok(result) if result.score > params.min_relevance => Outcome::Ranked(BatchRankingEntry {
            document_id: candidate.id.clone(),
            filename: candidate.filename.clone(),
            similarity: result.score,
            matches: result.matches,
        }),
        Ok(_) => Outcome::Irrelevant,
        Err(e) => {
            let failure = CandidateFailure {
                candidate_id: candidate.id.clone(),
                reason: e.to_string(),
            };
            tracing::warn!(
                target_id = %target.id,
                error = %CoreError::from(failure.clone()),
                "skipping candidate"
            );
            Outcome::Failed(failure)
        }
    }
}

/// Rank `candidates` by similarity to `target`.
///
/// # Errors
///
/// [`CoreError::Cancelled`] if `cancel` is raised before or during the
/// pass. Individual comparison failures are reported in the result
/// instead.
pub fn rank_embedded(
    target: &EmbeddedDocument,
    candidates: &[EmbeddedDocument],
    params: &MatchParams,
    cancel: &CancellationFlag,
) -> Result<BatchRanking, CoreError> {
    cancel.check()?;

    let others: Vec<&EmbeddedDocument> = candidates.iter().filter(|c| c.id != target.id).collect();

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Outcome> = others
        .par_iter()
        .map(|c| evaluate(target, c, params, cancel))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Outcome> = others
        .iter()
        .map(|c| evaluate(target, c, params, cancel))
        .collect();

    let mut entries = Vec::new();
    let mut failures = Vec::new();
    let mut no_signal = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Ranked(entry) => entries.push(entry),
            Outcome::Irrelevant => {}
            Outcome::NoSignal(missing) => no_signal.push(missing),
            Outcome::Failed(failure) => failures.push(failure),
            Outcome::Cancelled => return Err(CoreError::Cancelled),
        }
    }

    entries.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });

    tracing::debug!(
        target_id = %target.id,
        considered = others.len(),
        reported = entries.len(),
        failed = failures.len(),
        no_signal = no_signal.len(),
        "batch ranking complete"
    );
    if !no_signal.is_empty() {
        tracing::warn!(
            target_id = %target.id,
            unscored = no_signal.len(),
            "some candidates could not be scored without embeddings"
        );
    }

    Ok(BatchRanking {
        target_id: target.id.clone(),
        entries,
        signal: target.signal.clone(),
        failures,
        no_signal,
        candidates_considered: others.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passage;

    fn doc(id: &str, vectors: &[Vec<f32>]) -> EmbeddedDocument {
        EmbeddedDocument {
            id: id.to_string(),
            filename: format!("{}.txt", id),
            content_hash: String::new(),
            passages: vectors
                .iter()
                .enumerate()
                .map(|(i, v)| Passage {
                    index: i,
                    start: 0,
                    end: 1,
                    text: format!("{}-{}", id, i),
                    vector: Some(v.clone()),
                })
                .collect(),
            dims: vectors.first().map(|v| v.len()),
            signal: Signal::Embedded,
        }
    }

    fn target() -> EmbeddedDocument {
        doc(
            "target",
            &[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0], vec![0.0, -1.0]],
        )
    }

    #[test]
    fn test_sorted_filtered_and_excludes_self() {
        let candidates = vec![
            doc("half", &[vec![1.0, 0.0], vec![0.0, 1.0]]),
            target(),
            doc("none", &[vec![0.7, 0.7]]),
            doc("full", &[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0], vec![0.0, -1.0]]),
            doc("quarter", &[vec![1.0, 0.0]]),
        ];
        let ranking = rank_embedded(
            &target(),
            &candidates,
            &MatchParams::default(),
            &CancellationFlag::new(),
        )
        .unwrap();

        let ids: Vec<&str> = ranking.entries.iter().map(|e| e.document_id.as_str()).collect();
        assert_eq!(ids, vec!["full", "half", "quarter"]);
        assert_eq!(ranking.candidates_considered, 4);
        assert!(ranking.failures.is_empty());
        for pair in ranking.entries.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        for e in &ranking.entries {
            assert!(e.similarity > 0.1);
            assert_ne!(e.document_id, "target");
        }
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let candidates: Vec<EmbeddedDocument> = ["c1", "c2", "c3", "c4"]
            .iter()
            .map(|id| doc(id, &[vec![1.0, 0.0]]))
            .collect();
        let ranking = rank_embedded(
            &target(),
            &candidates,
            &MatchParams::default(),
            &CancellationFlag::new(),
        )
        .unwrap();
        let ids: Vec<&str> = ranking.entries.iter().map(|e| e.document_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
    }

    #[test]
    fn test_failing_candidate_is_skipped() {
        let candidates = vec![
            doc("good", &[vec![1.0, 0.0]]),
            doc("wrong-dims", &[vec![1.0, 0.0, 0.0]]),
        ];
        let ranking = rank_embedded(
            &target(),
            &candidates,
            &MatchParams::default(),
            &CancellationFlag::new(),
        )
        .unwrap();
        assert_eq!(ranking.entries.len(), 1);
        assert_eq!(ranking.entries[0].document_id, "good");
        assert_eq!(ranking.failures.len(), 1);
        assert_eq!(ranking.failures[0].candidate_id, "wrong-dims");
    }

    #[test]
    fn test_unembedded_candidate_is_reported_not_filtered() {
        let mut unembedded = doc("unembedded", &[]);
        unembedded.signal = Signal::NoSignal {
            reason: "embedder down".to_string(),
        };
        let candidates = vec![doc("good", &[vec![1.0, 0.0]]), unembedded];
        let ranking = rank_embedded(
            &target(),
            &candidates,
            &MatchParams::default(),
            &CancellationFlag::new(),
        )
        .unwrap();
        assert!(ranking.signal.is_embedded());
        assert_eq!(ranking.entries.len(), 1);
        assert!(ranking.failures.is_empty());
        assert_eq!(ranking.no_signal.len(), 1);
        assert_eq!(ranking.no_signal[0].candidate_id, "unembedded");
        assert!(ranking.no_signal[0].reason.contains("embedder down"));
        assert_eq!(ranking.candidates_considered, 2);
    }

    #[test]
    fn test_unembedded_target_marks_whole_ranking() {
        let mut target = target();
        target.signal = Signal::NoSignal {
            reason: "embedder down".to_string(),
        };
        let candidates = vec![doc("a", &[vec![1.0, 0.0]]), doc("b", &[vec![0.0, 1.0]])];
        let ranking = rank_embedded(
            &target,
            &candidates,
            &MatchParams::default(),
            &CancellationFlag::new(),
        )
        .unwrap();
        assert!(!ranking.signal.is_embedded());
        assert!(ranking.entries.is_empty());
        assert_eq!(ranking.no_signal.len(), 2);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationFlag::new();
        let shared = cancel.clone();
        shared.cancel();
        let result = rank_embedded(
            &target(),
            &[doc("c", &[vec![1.0, 0.0]])],
            &MatchParams::default(),
            &cancel,
        );
        assert_eq!(result, Err(CoreError::Cancelled));
    }

    #[test]
    fn test_empty_candidates() {
        let ranking = rank_embedded(
            &target(),
            &[],
            &MatchParams::default(),
            &CancellationFlag::new(),
        )
        .unwrap();
        assert!(ranking.entries.is_empty());
        assert_eq!(ranking.candidates_considered, 0);
    }
}

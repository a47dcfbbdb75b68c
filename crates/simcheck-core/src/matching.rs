//! Pairwise passage matching.
//!
//! For every source passage, find the single most similar target passage
//! and keep the pair as a [`Match`] when the similarity exceeds the match
//! threshold. The default search is exhaustive (`O(N × M)` cosine
//! evaluations), which is fine for document-sized passage sets.
//!
//! The inner search sits behind [`NeighborIndex`] so an approximate
//! nearest-neighbor structure can replace [`ExhaustiveIndex`] without
//! changing what a [`Match`] means.

use crate::aggregate::round_score;
use crate::embedding::cosine_similarity;
use crate::models::{Match, Passage};

/// Default similarity a best match must exceed to be accepted.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;

/// Nearest-neighbor search over a fixed set of target passages.
pub trait NeighborIndex {
    /// Position (within the indexed slice) and similarity of the target
    /// most similar to `query`, or `None` if nothing is comparable.
    ///
    /// Ties must resolve to the lowest position so results are
    /// deterministic.
    fn best_match(&self, query: &[f32]) -> Option<(usize, f64)>;
}

/// Brute-force cosine search over every target passage.
///
/// Target passages without a vector are never returned.
pub struct ExhaustiveIndex<'a> {
    targets: &'a [Passage],
}

impl<'a> ExhaustiveIndex<'a> {
    pub fn new(targets: &'a [Passage]) -> Self {
        Self { targets }
    }
}

impl NeighborIndex for ExhaustiveIndex<'_> {
    fn best_match(&self, query: &[f32]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (pos, target) in self.targets.iter().enumerate() {
            let Some(vector) = target.vector.as_deref() else {
                continue;
            };
            let score = cosine_similarity(query, vector);
            // Strict comparison keeps the first of equal scores.
            if best.map_or(!score.is_nan(), |(_, b)| score > b) {
                best = Some((pos, score));
            }
        }
        best
    }
}

/// Match every source passage against `targets` with an exhaustive search.
///
/// Returns matches in source order. Either side being empty yields no
/// matches. Source passages without a vector are skipped.
pub fn find_matches(source: &[Passage], targets: &[Passage], threshold: f64) -> Vec<Match> {
    find_matches_with(source, targets, &ExhaustiveIndex::new(targets), threshold)
}

/// [`find_matches`] with a caller-supplied index built over `targets`.
pub fn find_matches_with<I: NeighborIndex + ?Sized>(
    source: &[Passage],
    targets: &[Passage],
    index: &I,
    threshold: f64,
) -> Vec<Match> {
    if source.is_empty() || targets.is_empty() {
        return Vec::new();
    }

    source
        .iter()
        .filter_map(|passage| {
            let query = passage.vector.as_deref()?;
            let (pos, score) = index.best_match(query)?;
            if score <= threshold {
                return None;
            }
            let target = targets.get(pos)?;
            Some(Match {
                source_index: passage.index,
                target_index: target.index,
                score: round_score(score.clamp(0.0, 1.0)),
                source_chunk: passage.text.clone(),
                target_chunk: target.text.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(index: usize, text: &str, vector: Option<Vec<f32>>) -> Passage {
        Passage {
            index,
            start: 0,
            end: text.chars().count(),
            text: text.to_string(),
            vector,
        }
    }

    #[test]
    fn test_picks_best_target() {
        let source = vec![p(0, "s0", Some(vec![1.0, 0.0]))];
        let targets = vec![
            p(0, "t0", Some(vec![0.0, 1.0])),
            p(1, "t1", Some(vec![0.9, 0.1])),
            p(2, "t2", Some(vec![0.5, 0.5])),
        ];
        let matches = find_matches(&source, &targets, 0.75);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_index, 0);
        assert_eq!(matches[0].target_index, 1);
        assert_eq!(matches[0].target_chunk, "t1");
        assert!(matches[0].score > 0.99);
    }

    #[test]
    fn test_ties_break_to_lowest_index() {
        let source = vec![p(0, "s", Some(vec![1.0, 0.0]))];
        let targets = vec![
            p(0, "a", Some(vec![0.0, 1.0])),
            p(1, "b", Some(vec![2.0, 0.0])),
            p(2, "c", Some(vec![1.0, 0.0])),
        ];
        let matches = find_matches(&source, &targets, 0.5);
        assert_eq!(matches[0].target_index, 1);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let source = vec![p(0, "s", Some(vec![1.0, 0.0]))];
        let targets = vec![p(0, "t", Some(vec![1.0, 0.0]))];
        assert!(find_matches(&source, &targets, 1.0).is_empty());
        assert_eq!(find_matches(&source, &targets, 0.99).len(), 1);
    }

    #[test]
    fn test_below_threshold_dropped() {
        let source = vec![
            p(0, "s0", Some(vec![1.0, 0.0])),
            p(1, "s1", Some(vec![0.0, 1.0])),
        ];
        let targets = vec![p(0, "t0", Some(vec![1.0, 0.05]))];
        let matches = find_matches(&source, &targets, 0.75);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_index, 0);
    }

    #[test]
    fn test_empty_sides() {
        let one = vec![p(0, "x", Some(vec![1.0]))];
        assert!(find_matches(&[], &one, 0.75).is_empty());
        assert!(find_matches(&one, &[], 0.75).is_empty());
    }

    #[test]
    fn test_missing_vectors_skipped() {
        let source = vec![p(0, "s0", None), p(1, "s1", Some(vec![1.0, 0.0]))];
        let targets = vec![p(0, "t0", None), p(1, "t1", Some(vec![1.0, 0.0]))];
        let matches = find_matches(&source, &targets, 0.75);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_index, 1);
        assert_eq!(matches[0].target_index, 1);
    }

    #[test]
    fn test_deterministic() {
        let source: Vec<Passage> = (0..8)
            .map(|i| p(i, "s", Some(vec![(i as f32).sin(), (i as f32).cos(), 0.3])))
            .collect();
        let targets: Vec<Passage> = (0..11)
            .map(|i| p(i, "t", Some(vec![(i as f32 * 0.7).sin(), (i as f32 * 0.7).cos(), 0.3])))
            .collect();
        let a = find_matches(&source, &targets, 0.5);
        let b = find_matches(&source, &targets, 0.5);
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    struct FixedIndex(usize, f64);

    impl NeighborIndex for FixedIndex {
        fn best_match(&self, _query: &[f32]) -> Option<(usize, f64)> {
            Some((self.0, self.1))
        }
    }

    #[test]
    fn test_custom_index_drop_in() {
        let source = vec![p(0, "s", Some(vec![1.0]))];
        let targets = vec![p(0, "t0", Some(vec![1.0])), p(1, "t1", Some(vec![1.0]))];
        let matches = find_matches_with(&source, &targets, &FixedIndex(1, 0.8), 0.75);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].target_index, 1);
        assert_eq!(matches[0].score, 0.8);
    }
}

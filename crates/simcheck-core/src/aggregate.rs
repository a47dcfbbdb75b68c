//! Document-level score aggregation.
//!
//! ```text
//! overall = Σ match.score / source_chunk_count
//! ```
//!
//! The score answers "how much of the source is found in the target".
//! Unmatched source passages contribute nothing, so any unmatched passage
//! keeps the score below 1.0. It is directional: callers must not assume
//! `score(A, B) == score(B, A)`.

use crate::models::Match;

/// Decimal places kept in reported scores.
pub const SCORE_DECIMALS: i32 = 4;

/// Round a score to [`SCORE_DECIMALS`] places.
///
/// ```rust
/// use simcheck_core::aggregate::round_score;
///
/// assert_eq!(round_score(0.123456), 0.1235);
/// ```
pub fn round_score(score: f64) -> f64 {
    let factor = 10f64.powi(SCORE_DECIMALS);
    (score * factor).round() / factor
}

/// Aggregate accepted matches into one score in `[0.0, 1.0]`.
///
/// Returns `0.0` when the source produced no passages.
pub fn aggregate_score(source_chunk_count: usize, matches: &[Match]) -> f64 {
    if source_chunk_count == 0 {
        return 0.0;
    }
    let total: f64 = matches.iter().map(|m| m.score).sum();
    round_score((total / source_chunk_count as f64).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(score: f64) -> Match {
        Match {
            source_index: 0,
            target_index: 0,
            score,
            source_chunk: String::new(),
            target_chunk: String::new(),
        }
    }

    #[test]
    fn test_zero_chunks_is_zero() {
        assert_eq!(aggregate_score(0, &[]), 0.0);
        assert_eq!(aggregate_score(0, &[m(0.9)]), 0.0);
    }

    #[test]
    fn test_partial_coverage() {
        let score = aggregate_score(4, &[m(0.9), m(0.8)]);
        assert_eq!(score, 0.425);
    }

    #[test]
    fn test_full_coverage_is_one() {
        assert_eq!(aggregate_score(3, &[m(1.0), m(1.0), m(1.0)]), 1.0);
    }

    #[test]
    fn test_no_matches_is_zero() {
        assert_eq!(aggregate_score(5, &[]), 0.0);
    }

    #[test]
    fn test_always_in_unit_interval() {
        for count in 1..20 {
            for n in 0..=count {
                let matches: Vec<Match> = (0..n).map(|i| m(0.76 + 0.012 * i as f64)).collect();
                let score = aggregate_score(count, &matches);
                assert!((0.0..=1.0).contains(&score), "out of range: {}", score);
            }
        }
    }

    #[test]
    fn test_rounds_to_four_places() {
        assert_eq!(aggregate_score(3, &[m(0.8)]), 0.2667);
    }
}

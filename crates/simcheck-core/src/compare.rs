//! Directional comparison of two embedded documents.
//!
//! [`compare_embedded`] is a pure function of its two inputs: the same
//! passages and vectors always produce a bit-identical
//! [`ComparisonResult`].

use serde::{Deserialize, Serialize};

use crate::aggregate::aggregate_score;
use crate::error::CoreError;
use crate::matching::{find_matches, DEFAULT_MATCH_THRESHOLD};
use crate::models::{ComparisonResult, Passage, Signal};

/// Default aggregate score a batch candidate must exceed to be reported.
pub const DEFAULT_MIN_RELEVANCE: f64 = 0.1;

/// Thresholds for accepting passage matches and ranking candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchParams {
    /// A best match is kept only if its similarity exceeds this.
    pub match_threshold: f64,
    /// A batch candidate is reported only if its score exceeds this.
    pub min_relevance: f64,
}

impl MatchParams {
    pub fn new(match_threshold: f64, min_relevance: f64) -> Result<Self, CoreError> {
        let params = Self {
            match_threshold,
            min_relevance,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("match_threshold", self.match_threshold),
            ("min_relevance", self.min_relevance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoreError::InvalidConfiguration(format!(
                    "{} must be in [0.0, 1.0], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            min_relevance: DEFAULT_MIN_RELEVANCE,
        }
    }
}

/// A document's passages with their vectors, ready for comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDocument {
    pub id: String,
    pub filename: String,
    pub content_hash: String,
    pub passages: Vec<Passage>,
    /// Dimension shared by every vector, `None` when nothing was embedded.
    pub dims: Option<usize>,
    pub signal: Signal,
}

impl EmbeddedDocument {
    pub fn chunk_count(&self) -> usize {
        self.passages.len()
    }
}

/// Compare `source` against `target`.
///
/// The score is the sum of accepted match scores divided by the source's
/// passage count. If either side has no usable embeddings the result is
/// a 0.0 score marked [`Signal::NoSignal`].
///
/// # Errors
///
/// [`CoreError::DimensionMismatch`] when the two sides were embedded with
/// different dimensions.
pub fn compare_embedded(
    source: &EmbeddedDocument,
    target: &EmbeddedDocument,
    params: &MatchParams,
) -> Result<ComparisonResult, CoreError> {
    let chunks_a = source.chunk_count();
    let chunks_b = target.chunk_count();

    for side in [source, target] {
        if let Signal::NoSignal { reason } = &side.signal {
            return Ok(ComparisonResult::no_signal(
                chunks_a,
                chunks_b,
                format!("{}: {}", side.filename, reason),
            ));
        }
    }

    if let (Some(expected), Some(found)) = (source.dims, target.dims) {
        if expected != found {
            return Err(CoreError::DimensionMismatch { expected, found });
        }
    }

    let matches = find_matches(&source.passages, &target.passages, params.match_threshold);
    let score = aggregate_score(chunks_a, &matches);

    Ok(ComparisonResult {
        score,
        matches,
        chunks_a,
        chunks_b,
        signal: Signal::Embedded,
    })
}

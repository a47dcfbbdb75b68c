//! Error taxonomy for the comparison core.

use thiserror::Error;

use crate::models::CandidateFailure;

/// Errors raised by the comparison core.
///
/// Only [`InvalidConfiguration`](CoreError::InvalidConfiguration) and
/// [`Store`](CoreError::Store) abort an operation outright. Embedding
/// failures degrade to a "no signal" result on comparison paths, and
/// per-candidate failures are collected into the batch report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    /// Chunking or threshold parameters are unusable. The caller must fix
    /// them before retrying.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedder is absent, failed, or produced vectors of the wrong
    /// dimension.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Two passage sets with different embedding dimensions were compared.
    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A document was compared with itself.
    #[error("document {0} cannot be compared with itself")]
    SelfComparison(String),

    /// A single candidate could not be compared during batch ranking.
    #[error("candidate {candidate_id} failed: {reason}")]
    CandidateFailed {
        candidate_id: String,
        reason: String,
    },

    /// The operation observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,

    /// The corpus storage collaborator failed.
    #[error("corpus store error: {0}")]
    Store(String),
}

impl From<CandidateFailure> for CoreError {
    fn from(failure: CandidateFailure) -> Self {
        CoreError::CandidateFailed {
            candidate_id: failure.candidate_id,
            reason: failure.reason,
        }
    }
}

impl CoreError {
    pub(crate) fn store(err: anyhow::Error) -> Self {
        CoreError::Store(format!("{:#}", err))
    }
}

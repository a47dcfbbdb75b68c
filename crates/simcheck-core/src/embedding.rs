//! Embedding capability trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! plus pure helpers for vector normalization, persistence, and cosine
//! similarity.
//!
//! Concrete providers (OpenAI, Ollama, fastembed, feature hashing) live in
//! the `simcheck` app crate.

use anyhow::Result;
use async_trait::async_trait;

/// Maps passages of text to fixed-dimension vectors.
///
/// One instance is constructed at process start and shared by reference.
/// Implementations must return exactly one vector of length [`dims`]
/// per input text, in input order, and must be idempotent for identical
/// input within a session.
///
/// [`dims`]: Embedder::dims
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Convert a vector of any primitive numeric type into the internal `f32`
/// representation.
///
/// ```rust
/// use simcheck_core::embedding::normalize_vector;
///
/// assert_eq!(normalize_vector(&[1.5f64, -2.0]), vec![1.5f32, -2.0]);
/// assert_eq!(normalize_vector(&[3i32, 0]), vec![3.0f32, 0.0]);
/// ```
pub fn normalize_vector<T: Copy + Into<f64>>(values: &[T]) -> Vec<f32> {
    values.iter().map(|&v| v.into() as f32).collect()
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use simcheck_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]. Trailing bytes that do not form a whole
/// `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Accumulates in `f64`.
///
/// Returns `0.0` (no signal) for empty vectors, vectors of different
/// lengths, or a zero-norm vector on either side.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// [`cosine_similarity`] over possibly-absent vectors. Absence on either
/// side yields `0.0`.
pub fn cosine_similarity_opt(a: Option<&[f32]>, b: Option<&[f32]>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_preserves_bits() {
        let v = vec![0.25f32, -7.5, f32::MIN_POSITIVE, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&v)), v);
    }

    #[test]
    fn test_blob_ignores_partial_trailing_float() {
        let mut blob = vec_to_blob(&[2.0f32]);
        blob.extend_from_slice(&[0xff, 0xff]);
        assert_eq!(blob_to_vec(&blob), vec![2.0f32]);
    }

    #[test]
    fn test_cosine_reference_values() {
        let x = [1.0f32, 0.0];
        let diag = [1.0f32, 1.0];
        assert!((cosine_similarity(&x, &x) - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&x, &diag) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
        assert!(cosine_similarity(&x, &[0.0, 3.0]).abs() < 1e-9);
        assert!((cosine_similarity(&x, &[-2.0, 0.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = [0.3f32, -1.2, 4.0, 0.01];
        let b = [2.0f32, 0.5, -0.7, 9.0];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_degenerate_inputs_are_zero() {
        let v = [1.0f32, 2.0];
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&v, &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&v, &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &v), 0.0);
    }

    #[test]
    fn test_cosine_absent() {
        let v = vec![1.0f32, 2.0];
        assert_eq!(cosine_similarity_opt(None, Some(&v)), 0.0);
        assert_eq!(cosine_similarity_opt(Some(&v), None), 0.0);
        assert!((cosine_similarity_opt(Some(&v), Some(&v)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_mixed_types_agree() {
        let from_ints = normalize_vector(&[1i32, 2, 3]);
        let from_doubles = normalize_vector(&[1.0f64, 2.0, 3.0]);
        assert!((cosine_similarity(&from_ints, &from_doubles) - 1.0).abs() < 1e-6);
    }
}

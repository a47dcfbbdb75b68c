//! Content identity hashing.
//!
//! The SHA-256 digest of a document's raw bytes is its deduplication key:
//! equal content always produces an equal hash, so re-ingesting identical
//! content can be short-circuited before any chunking or embedding runs.

use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as 64 lowercase hex characters.
///
/// ```rust
/// use simcheck_core::hash::content_hash;
///
/// assert_eq!(
///     content_hash(b"abc"),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash of a string's UTF-8 bytes.
pub fn content_hash_str(text: &str) -> String {
    content_hash(text.as_bytes())
}

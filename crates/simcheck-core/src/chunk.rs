//! Sliding-window text chunker.
//!
//! Splits document text into fixed-size, overlapping [`Passage`]s. Sizes
//! and offsets are measured in characters (Unicode scalar values), never
//! bytes, so multi-byte UTF-8 text is only ever split on char boundaries.
//!
//! # Algorithm
//!
//! 1. Validate `overlap < chunk_size` and `chunk_size > 0`.
//! 2. Emit `text[start .. min(start + chunk_size, len)]`.
//! 3. If that passage reaches the end of the text, stop.
//! 4. Otherwise advance `start` by `chunk_size - overlap` and repeat.
//!
//! Empty text yields no passages. For `len > overlap` the passage count is
//! `ceil((len - overlap) / (chunk_size - overlap))`.
//!
//! # Example
//!
//! ```rust
//! use simcheck_core::chunk::{chunk_text, ChunkParams};
//!
//! let params = ChunkParams::new(500, 50).unwrap();
//! let passages: Vec<_> = chunk_text("The cat sat on the mat.", &params).unwrap().collect();
//! assert_eq!(passages.len(), 1);
//! assert_eq!(passages[0].index, 0);
//! ```

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::Passage;

/// Default passage length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default number of characters shared by consecutive passages.
pub const DEFAULT_OVERLAP: usize = 50;

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkParams {
    /// Validate and build chunking parameters.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfiguration`] if `chunk_size` is zero or
    /// `overlap >= chunk_size` (the window would never advance).
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, CoreError> {
        let params = Self {
            chunk_size,
            overlap,
        };
        params.validate()?;
        Ok(params)
    }

    /// Re-check parameters that may have been built with a struct literal.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.chunk_size == 0 {
            return Err(CoreError::InvalidConfiguration(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(CoreError::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance in characters between consecutive passage starts.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Split `text` into overlapping passages.
///
/// The returned iterator yields passages with contiguous indices starting
/// at 0 and `vector: None`.
///
/// # Errors
///
/// [`CoreError::InvalidConfiguration`] for parameters that would not let
/// the window advance.
pub fn chunk_text<'a>(text: &'a str, params: &ChunkParams) -> Result<Passages<'a>, CoreError> {
    params.validate()?;
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    Ok(Passages {
        text,
        boundaries,
        params: *params,
        next_start: 0,
        next_index: 0,
        done: text.is_empty(),
    })
}

/// Number of passages [`chunk_text`] yields for a text of `char_len`
/// characters.
pub fn count_passages(char_len: usize, params: &ChunkParams) -> usize {
    if char_len == 0 {
        return 0;
    }
    if char_len <= params.chunk_size {
        return 1;
    }
    1 + (char_len - params.chunk_size).div_ceil(params.step())
}

/// Iterator over the passages of one text. Not restartable: call
/// [`chunk_text`] again to re-chunk.
#[derive(Debug, Clone)]
pub struct Passages<'a> {
    text: &'a str,
    /// Byte offset of every char start, followed by `text.len()`.
    boundaries: Vec<usize>,
    params: ChunkParams,
    next_start: usize,
    next_index: usize,
    done: bool,
}

impl Passages<'_> {
    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }
}

impl Iterator for Passages<'_> {
    type Item = Passage;

    fn next(&mut self) -> Option<Passage> {
        if self.done {
            return None;
        }

        let len = self.char_len();
        let start = self.next_start;
        let end = (start + self.params.chunk_size).min(len);

        let passage = Passage {
            index: self.next_index,
            start,
            end,
            text: self.text[self.boundaries[start]..self.boundaries[end]].to_string(),
            vector: None,
        };

        if end >= len {
            self.done = true;
        } else {
            self.next_start = start + self.params.step();
            self.next_index += 1;
        }

        Some(passage)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let remaining = self.char_len() - self.next_start;
        let n = count_passages(remaining, &self.params);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Passages<'_> {}

impl FusedIterator for Passages<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(size: usize, overlap: usize) -> ChunkParams {
        ChunkParams::new(size, overlap).unwrap()
    }

    fn reconstruct(passages: &[Passage], overlap: usize) -> String {
        let mut out = String::new();
        for (i, p) in passages.iter().enumerate() {
            if i == 0 {
                out.push_str(&p.text);
            } else {
                out.extend(p.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_short_text_single_passage() {
        let passages: Vec<_> = chunk_text("The cat sat on the mat.", &params(500, 50))
            .unwrap()
            .collect();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "The cat sat on the mat.");
        assert_eq!(passages[0].start, 0);
        assert_eq!(passages[0].end, 23);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let mut it = chunk_text("", &params(500, 50)).unwrap();
        assert_eq!(it.len(), 0);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_overlap_not_smaller_than_size_fails() {
        assert!(matches!(
            ChunkParams::new(50, 50),
            Err(CoreError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ChunkParams::new(10, 20),
            Err(CoreError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ChunkParams::new(0, 0),
            Err(CoreError::InvalidConfiguration(_))
        ));

        let literal = ChunkParams {
            chunk_size: 4,
            overlap: 4,
        };
        assert!(chunk_text("abcdefgh", &literal).is_err());
    }

    #[test]
    fn test_window_advances_by_step() {
        let passages: Vec<_> = chunk_text("abcdefghij", &params(4, 1)).unwrap().collect();
        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        let starts: Vec<usize> = passages.iter().map(|p| p.start).collect();
        assert_eq!(starts, vec![0, 3, 6]);
        for (i, p) in passages.iter().enumerate() {
            assert_eq!(p.index, i);
            assert!(p.vector.is_none());
        }
    }

    #[test]
    fn test_final_passage_may_be_short() {
        let passages: Vec<_> = chunk_text("abcdefghijk", &params(4, 1)).unwrap().collect();
        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij", "jk"]);
    }

    #[test]
    fn test_count_matches_formula_and_reconstructs() {
        let text: String = (0..1234).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        for (size, overlap) in [(500, 50), (100, 0), (7, 3), (2, 1), (1234, 10), (1300, 5)] {
            let p = params(size, overlap);
            let passages: Vec<_> = chunk_text(&text, &p).unwrap().collect();
            let len = text.chars().count();
            let expected = (len - overlap).div_ceil(size - overlap);
            assert_eq!(passages.len(), expected, "size={} overlap={}", size, overlap);
            assert_eq!(passages.len(), count_passages(len, &p));
            assert_eq!(reconstruct(&passages, overlap), text);
        }
    }

    #[test]
    fn test_multibyte_utf8_splits_on_chars() {
        let text = "┌──────┐ héllo wörld ✓ 日本語テキスト";
        let p = params(5, 2);
        let passages: Vec<_> = chunk_text(text, &p).unwrap().collect();
        for passage in &passages {
            assert!(passage.text.chars().count() <= 5);
        }
        assert_eq!(reconstruct(&passages, 2), text);
    }

    #[test]
    fn test_size_hint_is_exact() {
        let mut it = chunk_text("abcdefghijk", &params(4, 1)).unwrap();
        assert_eq!(it.len(), 4);
        it.next();
        assert_eq!(it.len(), 3);
        it.by_ref().for_each(drop);
        assert_eq!(it.len(), 0);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma delta epsilon zeta eta theta";
        let a: Vec<_> = chunk_text(text, &params(10, 3)).unwrap().collect();
        let b: Vec<_> = chunk_text(text, &params(10, 3)).unwrap().collect();
        assert_eq!(a, b);
    }
}

//! Overlapping sentence-aware text chunker.
//!
//! Splits extracted text into windows of at most `chunk_size` characters.
//! Consecutive windows share `overlap` characters so that context spanning a
//! cut is visible from both sides.
//!
//! # Algorithm
//!
//! 1. Text of at most `chunk_size` characters is returned unchanged as a
//!    single chunk.
//! 2. Otherwise a window of `chunk_size` characters slides from position 0.
//! 3. For every window that does not reach the end of the text, the last
//!    `'.'` or `'\n'` in the window is located. If it lies past the window
//!    midpoint, the window is cut just after it instead of at the hard
//!    boundary.
//! 4. The next window starts `overlap` characters before the previous cut
//!    (always at least one character further than the previous start).
//! 5. Each chunk is trimmed; empty or whitespace-only chunks are dropped.
//!
//! All lengths and positions count Unicode scalar values, not bytes.
//!
//! # Example
//!
//! ```rust
//! use docsift_core::chunk::Chunker;
//!
//! let chunker = Chunker::new(500, 50).unwrap();
//! let chunks = chunker.chunk("Short enough to stay whole.");
//! assert_eq!(chunks, vec!["Short enough to stay whole.".to_string()]);
//! ```

use crate::{Error, Result};

/// Default window width in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default number of characters shared by consecutive windows.
pub const DEFAULT_OVERLAP: usize = 50;

/// Chunking parameters, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Chunker {
    /// Create a chunker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `chunk_size` is zero or
    /// `overlap >= chunk_size` (the window would never advance).
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput("chunk_size must be > 0".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidInput(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into overlapping chunks.
    ///
    /// The result is fully materialized; callers consume it before
    /// embedding.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let total = text.chars().count();
        if total <= self.chunk_size {
            return vec![text.to_string()];
        }

        // Byte offset of every char, plus one past the end.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < total {
            // `end` is deliberately not clamped to `total`: the advance below
            // must overshoot the text once the final window has been taken.
            let mut end = start + self.chunk_size;

            if end < total {
                let window = &text[offsets[start]..offsets[end]];
                if let Some(pos) = last_break(window) {
                    if pos > self.chunk_size / 2 {
                        end = start + pos + 1;
                    }
                }
            }

            let piece = text[offsets[start]..offsets[end.min(total)]].trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }

            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        chunks
    }
}

/// Split `text` with the given parameters.
///
/// Convenience wrapper around [`Chunker::new`] + [`Chunker::chunk`].
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(text))
}

/// Char position of the last sentence or line break in `window`.
fn last_break(window: &str) -> Option<usize> {
    let len = window.chars().count();
    window
        .chars()
        .rev()
        .position(|c| c == '.' || c == '\n')
        .map(|from_end| len - 1 - from_end)
}

//! Fixed-size chunking with overlap.
//!
//! The simplest chunking strategy: split every N characters with M characters
//! of overlap.
//!
//! ## How It Works
//!
//! ```text
//! size = 4, overlap = 1
//!
//! Document: "abcdefghij"
//!
//! Chunk 0: "abcd"   [0..4]
//! Chunk 1: "defg"   [3..7]    <- starts at 4 - 1 = 3
//! Chunk 2: "ghij"   [6..10]   <- ends at the text length, so we stop
//! ```
//!
//! The cursor moves to `end - overlap` after every chunk, except after the
//! chunk that reaches the end of the text. That rule is what keeps a short
//! trailing chunk made only of overlap from being emitted.
//!
//! ## Why Overlap?
//!
//! Without overlap, information at chunk boundaries is lost. If a key sentence
//! spans two chunks, neither chunk captures it fully:
//!
//! ```text
//! "The answer is 42"
//!         ↓
//! No overlap:  ["The answer i", "s 42"]  <- broken!
//! With overlap: ["The answer is", "answer is 42"] <- both have context
//! ```
//!
//! A common heuristic: 10-20% overlap (e.g., size=500, overlap=50-100).

use crate::slab::CharIndex;
use crate::{ChunkParams, Chunker, Result, Slab};

/// Fixed-size chunker with configurable overlap.
///
/// ## Example
///
/// ```rust
/// use ragslab::{Chunker, FixedChunker};
///
/// let chunker = FixedChunker::new(4, 1).unwrap();
/// let slabs = chunker.chunk("abcdefghij");
///
/// let texts: Vec<&str> = slabs.iter().map(|s| s.text.as_str()).collect();
/// assert_eq!(texts, ["abcd", "defg", "ghij"]);
/// assert_eq!(slabs[1].span(), 3..7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChunker {
    params: ChunkParams,
}

impl FixedChunker {
    /// Create a new fixed-size chunker.
    ///
    /// # Arguments
    ///
    /// * `size` - Maximum chunk size in characters
    /// * `overlap` - Characters shared between adjacent chunks
    ///
    /// # Errors
    ///
    /// Fails with an `InvalidArgument` kind if `size == 0` or `overlap >= size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        ChunkParams::new(size, overlap).map(Self::from_params)
    }

    /// Create a chunker with no overlap.
    pub fn no_overlap(size: usize) -> Result<Self> {
        Self::new(size, 0)
    }

    /// Create a chunker from already validated parameters.
    #[must_use]
    pub const fn from_params(params: ChunkParams) -> Self {
        Self { params }
    }

    /// The parameters this chunker was built with.
    #[must_use]
    pub const fn params(&self) -> ChunkParams {
        self.params
    }

    /// Windows over the character range `from..to` of an indexed text,
    /// numbered from `first`.
    pub(crate) fn chunk_range(
        &self,
        index: &CharIndex<'_>,
        from: usize,
        to: usize,
        first: usize,
    ) -> Vec<Slab> {
        let len = to - from;
        let mut slabs = Vec::with_capacity(self.params.chunk_count(len));
        let mut start = from;

        while start < to {
            let end = (start + self.params.size()).min(to);
            slabs.push(Slab::new(index.slice(start, end), start, end, first + slabs.len()));

            if end == to {
                break;
            }
            start = end - self.params.overlap();
        }

        slabs
    }
}

impl Chunker for FixedChunker {
    fn chunk(&self, text: &str) -> Vec<Slab> {
        if text.is_empty() {
            return vec![];
        }

        let index = CharIndex::new(text);
        self.chunk_range(&index, 0, index.char_len(), 0)
    }

    fn estimate_chunks(&self, text_len: usize) -> usize {
        self.params.chunk_count(text_len)
    }
}

/// Split `text` into fixed-size windows of `chunk_size` characters, each
/// sharing `chunk_overlap` characters with its successor.
///
/// ```rust
/// let slabs = ragslab::chunk("abcdef", 10, 2).unwrap();
/// assert_eq!(slabs.len(), 1);
/// assert_eq!(slabs[0].text, "abcdef");
///
/// assert!(ragslab::chunk("abcdef", 4, 4).is_err());
/// ```
///
/// # Errors
///
/// Fails with an `InvalidArgument` kind if `chunk_size == 0` or
/// `chunk_overlap >= chunk_size`.
pub fn chunk(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Slab>> {
    FixedChunker::new(chunk_size, chunk_overlap).map(|chunker| chunker.chunk(text))
}

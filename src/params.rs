//! Chunk size and overlap configuration.
//!
//! ## The Problem
//!
//! Overlap only makes sense when it is strictly smaller than the window:
//!
//! ```text
//! size = 4, overlap = 1  -> step 3: [0..4] [3..7] [6..10]
//! size = 4, overlap = 4  -> step 0: [0..4] [0..4] [0..4] ... forever
//! size = 4, overlap = 5  -> step -1: the cursor walks backwards
//! ```
//!
//! `ChunkParams` is the only way to obtain a `(size, overlap)` pair, so every
//! chunker built from one is guaranteed to terminate.

/// A validated `(chunk_size, chunk_overlap)` pair.
///
/// # Examples
///
/// ```rust
/// use ragslab::ChunkParams;
///
/// let params = ChunkParams::new(1000, 20).unwrap();
/// assert_eq!(params.size(), 1000);
/// assert_eq!(params.overlap(), 20);
/// assert_eq!(params.step(), 980);
///
/// assert!(ChunkParams::new(0, 0).is_err());
/// assert!(ChunkParams::new(10, 10).is_err());
/// assert!(ChunkParams::from_signed(10, -1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkParams {
    size: usize,
    overlap: usize,
}

impl ChunkParams {
    /// Validate a chunk size and overlap.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChunkSize`](crate::Error::InvalidChunkSize) if `size == 0`,
    /// [`Error::OverlapExceedsSize`](crate::Error::OverlapExceedsSize) if `overlap >= size`.
    pub fn new(size: usize, overlap: usize) -> crate::Result<Self> {
        if size == 0 {
            return Err(crate::Error::InvalidChunkSize(0));
        }
        if overlap >= size {
            return Err(crate::Error::OverlapExceedsSize { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Validate values that arrive signed (config files, command lines).
    ///
    /// Negative values are rejected instead of wrapping.
    pub fn from_signed(size: i64, overlap: i64) -> crate::Result<Self> {
        if size <= 0 {
            return Err(crate::Error::InvalidChunkSize(size));
        }
        if overlap < 0 {
            return Err(crate::Error::NegativeOverlap(overlap));
        }
        let size = usize::try_from(size).map_err(|_| crate::Error::InvalidChunkSize(size))?;
        let overlap =
            usize::try_from(overlap).map_err(|_| crate::Error::NegativeOverlap(overlap))?;
        Self::new(size, overlap)
    }

    /// Maximum chunk length in characters.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Characters shared by a chunk and its successor.
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Cursor advance between chunk starts. Always > 0.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.size - self.overlap
    }

    /// Number of chunks a text of `text_len` characters produces.
    #[must_use]
    pub fn chunk_count(&self, text_len: usize) -> usize {
        if text_len == 0 {
            0
        } else if text_len <= self.size {
            1
        } else {
            1 + (text_len - self.size).div_ceil(self.step())
        }
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        // The hand-rolled splitter's defaults: 1000 characters, 20 overlap.
        Self {
            size: 1000,
            overlap: 20,
        }
    }
}

impl TryFrom<(usize, usize)> for ChunkParams {
    type Error = crate::Error;

    fn try_from((size, overlap): (usize, usize)) -> crate::Result<Self> {
        Self::new(size, overlap)
    }
}

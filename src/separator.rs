//! Separator-based splitting with greedy merging.
//!
//! Cuts the text on a separator (paragraph breaks by default), then packs
//! consecutive pieces into windows of at most `size` characters. When a
//! window is full, the pieces at its tail that fit inside `overlap` are
//! carried into the next window.
//!
//! ## The Algorithm
//!
//! ```text
//! separator = "\n\n", size = 20, overlap = 10
//!
//! Text:    "para one\n\npara two\n\npara three"
//! Pieces:  [para one] [para two] [para three]
//!            0..8       10..18     20..30
//!
//! Window 0: [para one][para two]          0..18   (adding para three -> 30 > 20)
//!           carry [para two]              8 <= overlap
//! Window 1: [para two][para three]        10..30
//! ```
//!
//! Windows are measured over the original text, separators included, and a
//! slab's `text` is the exact original substring, so offsets stay honest.
//! A single piece longer than `size` falls back to fixed-size windows.

use std::collections::VecDeque;

use crate::slab::CharIndex;
use crate::{ChunkParams, Chunker, Error, FixedChunker, Result, Slab};

/// Paragraph breaks.
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Character span of one trimmed, non-blank piece.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
}

/// Splits on a separator and merges pieces up to a size limit.
///
/// ## Example
///
/// ```rust
/// use ragslab::{Chunker, SeparatorChunker};
///
/// let chunker = SeparatorChunker::paragraphs(20, 10).unwrap();
/// let slabs = chunker.chunk("para one\n\npara two\n\npara three");
///
/// assert_eq!(slabs.len(), 2);
/// assert_eq!(slabs[0].text, "para one\n\npara two");
/// assert_eq!(slabs[1].text, "para two\n\npara three");
/// ```
#[derive(Debug, Clone)]
pub struct SeparatorChunker {
    fixed: FixedChunker,
    separator: String,
}

impl SeparatorChunker {
    /// Create a splitter for `separator`.
    ///
    /// # Errors
    ///
    /// Fails with an `InvalidArgument` kind on bad size/overlap or an empty
    /// separator.
    pub fn new(size: usize, overlap: usize, separator: impl Into<String>) -> Result<Self> {
        Self::with_params(ChunkParams::new(size, overlap)?, separator)
    }

    /// Create a splitter from validated parameters.
    pub fn with_params(params: ChunkParams, separator: impl Into<String>) -> Result<Self> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(Error::EmptySeparator);
        }
        Ok(Self {
            fixed: FixedChunker::from_params(params),
            separator,
        })
    }

    /// Split on paragraph breaks.
    pub fn paragraphs(size: usize, overlap: usize) -> Result<Self> {
        Self::new(size, overlap, DEFAULT_SEPARATOR)
    }

    /// The separator pieces are cut on.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The size/overlap limits.
    #[must_use]
    pub fn params(&self) -> ChunkParams {
        self.fixed.params()
    }

    fn pieces(&self, text: &str, index: &CharIndex<'_>) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut from = 0;
        let cuts = text
            .match_indices(self.separator.as_str())
            .map(|(at, sep)| (at, at + sep.len()))
            .chain(std::iter::once((text.len(), text.len())));

        for (seg_end, next) in cuts {
            let segment = &text[from..seg_end];
            let trimmed = segment.trim();
            if !trimmed.is_empty() {
                let lead = segment.len() - segment.trim_start().len();
                let start = from + lead;
                pieces.push(Piece {
                    start: index.char_offset(start),
                    end: index.char_offset(start + trimmed.len()),
                });
            }
            from = next;
        }

        pieces
    }
}

fn push_window(slabs: &mut Vec<Slab>, index: &CharIndex<'_>, window: &VecDeque<Piece>) {
    if let (Some(first), Some(last)) = (window.front(), window.back()) {
        let position = slabs.len();
        slabs.push(Slab::new(
            index.slice(first.start, last.end),
            first.start,
            last.end,
            position,
        ));
    }
}

impl Chunker for SeparatorChunker {
    fn chunk(&self, text: &str) -> Vec<Slab> {
        if text.is_empty() {
            return vec![];
        }

        let index = CharIndex::new(text);
        let size = self.params().size();
        let overlap = self.params().overlap();

        let mut slabs = Vec::new();
        let mut window: VecDeque<Piece> = VecDeque::new();

        for piece in self.pieces(text, &index) {
            if piece.end - piece.start > size {
                push_window(&mut slabs, &index, &window);
                window.clear();
                let first = slabs.len();
                slabs.extend(self.fixed.chunk_range(&index, piece.start, piece.end, first));
                continue;
            }

            let overflows = window
                .front()
                .is_some_and(|front| piece.end - front.start > size);
            if overflows {
                push_window(&mut slabs, &index, &window);
                let tail_end = window.back().map_or(piece.start, |back| back.end);
                while let Some(front) = window.front() {
                    if tail_end - front.start > overlap || piece.end - front.start > size {
                        window.pop_front();
                    } else {
                        break;
                    }
                }
            }

            window.push_back(piece);
        }

        push_window(&mut slabs, &index, &window);
        slabs
    }

    fn estimate_chunks(&self, text_len: usize) -> usize {
        (text_len / self.params().step()).max(1)
    }
}

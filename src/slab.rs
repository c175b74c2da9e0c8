//! The Slab type: a window of text with position metadata.

use std::ops::Range;

/// A window of text with its position in the original string.
///
/// Each slab is a self-contained piece that can be embedded, indexed, and
/// retrieved independently.
///
/// ## Character Offsets
///
/// `start` and `end` count Unicode scalar values (`char`s), not bytes, so a
/// chunk size of 100 means 100 characters regardless of script. Use
/// [`Slab::byte_span`] to slice the source:
///
/// ```rust
/// use ragslab::Slab;
///
/// let text = "naïve café";
/// let slab = Slab::new("café", 6, 10, 0);
///
/// assert_eq!(&text[slab.byte_span(text)], "café");
/// assert_eq!(slab.char_len(), 4);
/// ```
///
/// ## Overlap Handling
///
/// When chunks overlap, adjacent slabs share some text:
///
/// ```text
/// Original: "abcdefghij"
/// Slab 0:   "abcd"     [0..4]
/// Slab 1:   "defg"     [3..7]  <- shares "d" with slab 0
///              ^
///          overlap region [3..4]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slab {
    /// The chunk text.
    pub text: String,
    /// Character offset where this chunk starts in the original text.
    pub start: usize,
    /// Character offset where this chunk ends (exclusive).
    pub end: usize,
    /// Zero-based index of this chunk in the sequence.
    pub index: usize,
}

impl Slab {
    /// Create a new slab.
    #[must_use]
    pub fn new(text: impl Into<String>, start: usize, end: usize, index: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            index,
        }
    }

    /// The length of this chunk in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// Whether this chunk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The character span of this chunk in the original text.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The byte span of this chunk in `source`, the text it was cut from.
    ///
    /// Offsets past the end of `source` are clamped to its length. Walks
    /// `source` up to `end` without allocating; use [`byte_spans`] to map
    /// every slab of a document in one pass.
    #[must_use]
    pub fn byte_span(&self, source: &str) -> Range<usize> {
        let mut boundaries = source
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(source.len()));
        let start = boundaries.nth(self.start).unwrap_or(source.len());
        let end = match self.end.checked_sub(self.start + 1) {
            Some(n) => boundaries.nth(n).unwrap_or(source.len()),
            None => start,
        };
        start..end
    }
}

/// Byte spans of `slabs` in `source`, building the character table once.
#[must_use]
pub fn byte_spans(slabs: &[Slab], source: &str) -> Vec<Range<usize>> {
    let index = CharIndex::new(source);
    slabs
        .iter()
        .map(|slab| index.byte_range(slab.start, slab.end))
        .collect()
}

impl std::fmt::Display for Slab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Slab {{ index: {}, span: {}..{}, len: {} }}",
            self.index,
            self.start,
            self.end,
            self.char_len()
        )
    }
}

/// Byte offset of every character boundary in a string.
///
/// `boundaries[i]` is the byte offset of character `i`; the final entry is
/// `text.len()`, so the table has `char_count + 1` entries.
pub(crate) struct CharIndex<'a> {
    text: &'a str,
    boundaries: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut boundaries = Vec::with_capacity(text.len() + 1);
        boundaries.extend(text.char_indices().map(|(i, _)| i));
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    /// Number of characters in the text.
    pub(crate) fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub(crate) fn byte_range(&self, start: usize, end: usize) -> Range<usize> {
        let last = self.char_len();
        self.boundaries[start.min(last)]..self.boundaries[end.min(last)]
    }

    /// Substring between two character offsets.
    pub(crate) fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.byte_range(start, end)]
    }

    /// Character offset of a byte offset that lies on a char boundary.
    pub(crate) fn char_offset(&self, byte: usize) -> usize {
        match self.boundaries.binary_search(&byte) {
            Ok(i) | Err(i) => i,
        }
    }
}

//! Concrete chunking scenarios and the documents fed through them.
//!
//! These tests pin exact outputs for small inputs, including the boundary
//! cases where the overlap cursor could produce a trailing duplicate.

use ragslab::{
    chunk, chunk_corpus, ChunkParams, Chunker, Document, Error, ErrorKind, FixedChunker,
    RagConfig, SeparatorChunker, Slab,
};

fn spans(slabs: &[Slab]) -> Vec<(&str, usize, usize)> {
    slabs
        .iter()
        .map(|s| (s.text.as_str(), s.start, s.end))
        .collect()
}

/// Every character position is covered by at least one chunk.
fn covers(slabs: &[Slab], len: usize) -> bool {
    let mut covered = vec![false; len];
    for slab in slabs {
        for c in &mut covered[slab.start..slab.end] {
            *c = true;
        }
    }
    covered.iter().all(|&c| c)
}

// =============================================================================
// Fixed windows
// =============================================================================

#[test]
fn overlap_cursor_scenario() {
    let slabs = chunk("abcdefghij", 4, 1).unwrap();
    assert_eq!(
        spans(&slabs),
        [("abcd", 0, 4), ("defg", 3, 7), ("ghij", 6, 10)]
    );
}

#[test]
fn empty_text_has_no_chunks() {
    assert!(chunk("", 100, 10).unwrap().is_empty());
}

#[test]
fn short_text_is_one_chunk() {
    let slabs = chunk("abcdef", 10, 2).unwrap();
    assert_eq!(spans(&slabs), [("abcdef", 0, 6)]);
}

#[test]
fn text_equal_to_size_is_one_chunk() {
    let slabs = chunk("abcd", 4, 3).unwrap();
    assert_eq!(spans(&slabs), [("abcd", 0, 4)]);
}

#[test]
fn no_trailing_duplicate_when_end_lands_exactly() {
    // 0..5, 3..8: the second chunk reaches the end, no third window starting at 6.
    let slabs = chunk("abcdefgh", 5, 2).unwrap();
    assert_eq!(spans(&slabs), [("abcde", 0, 5), ("defgh", 3, 8)]);
}

#[test]
fn short_last_chunk() {
    let slabs = chunk("abcdefghijk", 4, 1).unwrap();
    assert_eq!(slabs.last().map(|s| s.text.as_str()), Some("jk"));
    assert_eq!(slabs.len(), 4);
}

#[test]
fn maximal_overlap_advances_one_char() {
    let slabs = chunk("abcde", 3, 2).unwrap();
    assert_eq!(
        spans(&slabs),
        [("abc", 0, 3), ("bcd", 1, 4), ("cde", 2, 5)]
    );
}

#[test]
fn fixed_full_coverage() {
    let long = "A".repeat(1000);
    let texts = [
        "Hello, world!",
        "The quick brown fox jumps over the lazy dog.",
        long.as_str(),
        "Short",
        " Leading and trailing spaces ",
        "Multiple\n\nParagraphs\n\nHere",
        "naïve café – 日本語のテキスト",
    ];
    let chunker = FixedChunker::new(7, 2).unwrap();
    for text in texts {
        let slabs = chunker.chunk(text);
        assert!(covers(&slabs, text.chars().count()), "{text:?}");
    }
}

#[test]
fn multibyte_offsets_are_characters() {
    let text = "héllo wörld";
    let slabs = chunk(text, 5, 0).unwrap();
    assert_eq!(
        spans(&slabs),
        [("héllo", 0, 5), (" wörl", 5, 10), ("d", 10, 11)]
    );
    assert_eq!(&text[slabs[1].byte_span(text)], " wörl");
}

// =============================================================================
// Rejected parameters
// =============================================================================

#[test]
fn invalid_parameters_are_invalid_argument() {
    let cases = [(0, 0), (4, 4), (4, 9), (-3, 1), (10, -1)];
    for (size, overlap) in cases {
        let err = ChunkParams::from_signed(size, overlap).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "({size}, {overlap})");
    }
    assert!(matches!(chunk("abc", 4, 4), Err(Error::OverlapExceedsSize { .. })));
    assert!(matches!(chunk("abc", 0, 0), Err(Error::InvalidChunkSize(0))));
}

#[test]
fn config_chunk_settings_validated() {
    let err = RagConfig::from_toml_str("chunk_size = 100\nchunk_overlap = -5\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let config = RagConfig::from_toml_str("chunk_size = 200\nchunk_overlap = 50\n").unwrap();
    assert_eq!(config.chunk_params().unwrap(), ChunkParams::new(200, 50).unwrap());
}

// =============================================================================
// Separator merging
// =============================================================================

#[test]
fn paragraphs_merge_until_full() {
    let text = "one two\n\nthree four\n\nfive six\n\nseven";
    let chunker = SeparatorChunker::paragraphs(20, 0).unwrap();
    let slabs = chunker.chunk(text);

    assert_eq!(
        spans(&slabs),
        [
            ("one two\n\nthree four", 0, 19),
            ("five six\n\nseven", 21, 36)
        ]
    );
}

#[test]
fn separator_overlap_carries_whole_pieces() {
    let text = "aa\n\nbb\n\ncc\n\ndd";
    let chunker = SeparatorChunker::paragraphs(6, 2).unwrap();
    let slabs = chunker.chunk(text);

    let texts: Vec<&str> = slabs.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, ["aa\n\nbb", "bb\n\ncc", "cc\n\ndd"]);
}

// =============================================================================
// Documents
// =============================================================================

#[test]
fn corpus_chunk_ids_are_unique_and_ordered() {
    let docs = [
        Document::new("data.txt", "abcdefghij"),
        Document::new("other.txt", "xyz"),
    ];
    let chunker = FixedChunker::new(4, 1).unwrap();
    let chunks = chunk_corpus(&docs, &chunker).unwrap();

    let ids: Vec<String> = chunks.iter().map(|c| c.id()).collect();
    assert_eq!(
        ids,
        [
            "data.txt_chunk1",
            "data.txt_chunk2",
            "data.txt_chunk3",
            "other.txt_chunk1"
        ]
    );
    assert!(chunks.iter().all(|c| c.char_len() <= 4));
}

#[test]
fn document_chunks_only_read_their_own_text() {
    let doc = Document::new("a", "hello world");
    let chunker = FixedChunker::new(5, 0).unwrap();
    let chunks = doc.chunks(&chunker);
    assert!(chunks.iter().all(|c| c.document_id == "a"));
    assert_eq!(chunks[2].text, "d");
}

//! # ragslab
//!
//! Retrieval-augmented question answering, built around a deterministic
//! text chunker.
//!
//! ## The Pipeline
//!
//! ```text
//! Documents ──chunk──▶ Chunks ──embed──▶ Vectors ──upsert──▶ VectorIndex
//!                                                                 │
//! Question ──embed──▶ Vector ──query (k nearest, ascending distance)┘
//!                                     │
//!                     Context + Question ──▶ ChatService ──▶ Answer
//! ```
//!
//! Every stage except chunking is a trait ([`EmbeddingService`],
//! [`VectorIndex`], [`ChatService`]) with a hosted or local backend behind it.
//! Chunking is the only authored algorithm, and it is pure: no I/O, no
//! logging, no hidden state.
//!
//! ## Fixed-Size Chunking
//!
//! Split every N characters with M overlap. The cursor advances by `N - M`.
//!
//! ```text
//! Document: "abcdefghij"
//! Size: 4, Overlap: 1
//!
//! Chunk 0: "abcd"  [0..4]
//! Chunk 1: "defg"  [3..7]   <- shares "d"
//! Chunk 2: "ghij"  [6..10]  <- reaches the end, stop
//! ```
//!
//! Offsets count characters, not bytes. Every chunk except the last of a
//! document is exactly N characters long.
//!
//! ## Separator Merging
//!
//! [`SeparatorChunker`] cuts on a separator (paragraph breaks by default)
//! and packs whole pieces into windows of at most N characters, carrying
//! up to M characters of trailing pieces forward.
//!
//! ## Quick Start
//!
//! ```rust
//! use ragslab::{Chunker, Document, FixedChunker};
//!
//! let slabs = ragslab::chunk("abcdefghij", 4, 1).unwrap();
//! assert_eq!(slabs.len(), 3);
//!
//! let chunker = FixedChunker::new(1000, 20).unwrap();
//! let doc = Document::new("notes.txt", "Short note.");
//! let chunks = doc.chunks(&chunker);
//! assert_eq!(chunks[0].id(), "notes.txt_chunk1");
//! ```
//!
//! ## Asking Questions
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragslab::{LocalIndex, OpenAiChat, OpenAiEmbeddings, Pipeline, RagConfig};
//!
//! let config = RagConfig::load("ragslab.toml")?.with_env_overrides();
//! let pipeline = Pipeline::from_config(
//!     &config,
//!     Arc::new(OpenAiEmbeddings::from_config(&config)?),
//!     Arc::new(LocalIndex::from_config(&config).await?),
//! )?
//! .with_chat(Arc::new(OpenAiChat::from_config(&config)?));
//!
//! pipeline.ingest(&ragslab::load_directory("./data/new_articles").await?).await?;
//! let answer = pipeline.answer("tell me about space x ships.").await?;
//! println!("{}", answer.text);
//! ```

mod chat;
mod config;
mod document;
mod embedding;
mod error;
mod fixed;
mod index;
mod openai;
mod params;
mod pipeline;
mod retry;
mod separator;
mod session;
mod slab;

pub use chat::{ChatService, Message, Role};
pub use config::{RagConfig, DEFAULT_PERSIST_PATH};
pub use document::{chunk_corpus, load_directory, load_file, Chunk, Document};
pub use embedding::{Embedding, EmbeddingService};
pub use error::{Error, ErrorKind, Result};
pub use fixed::{chunk, FixedChunker};
pub use index::{DistanceMetric, Hit, LocalIndex, Metadata, Record, VectorIndex};
pub use openai::{OpenAiChat, OpenAiEmbeddings};
pub use params::ChunkParams;
pub use pipeline::{
    Answer, IngestReport, Pipeline, PipelineOptions, META_CHUNK_INDEX, META_DOCUMENT_ID,
};
pub use retry::RetryPolicy;
pub use separator::{SeparatorChunker, DEFAULT_SEPARATOR};
pub use session::{Session, Turn};
pub use slab::{byte_spans, Slab};

#[cfg(feature = "local-embeddings")]
pub use embedding::local::LocalEmbeddings;

/// A text chunking strategy.
///
/// All chunkers implement this trait, enabling polymorphic usage:
///
/// ```rust
/// use ragslab::{Chunker, FixedChunker, SeparatorChunker};
///
/// fn chunk_document(chunker: &dyn Chunker, text: &str) -> Vec<ragslab::Slab> {
///     chunker.chunk(text)
/// }
///
/// let fixed = FixedChunker::new(100, 20).unwrap();
/// let paragraphs = SeparatorChunker::paragraphs(200, 50).unwrap();
///
/// let text = "Hello world.\n\nThis is a test.";
/// let slabs1 = chunk_document(&fixed, text);
/// let slabs2 = chunk_document(&paragraphs, text);
/// ```
///
/// Construction validates parameters, so `chunk` itself cannot fail.
pub trait Chunker: Send + Sync {
    /// Split text into chunks.
    ///
    /// Each chunk is a [`Slab`] containing the text and its character offsets
    /// in the original document.
    fn chunk(&self, text: &str) -> Vec<Slab>;

    /// Estimate the number of chunks for a text of `text_len` characters.
    ///
    /// Useful for pre-allocation. May be approximate.
    fn estimate_chunks(&self, text_len: usize) -> usize {
        // Conservative default
        (text_len / 500).max(1)
    }
}

//! Ingest and question answering.
//!
//! ```text
//! ingest:  documents -> chunks -> embed -> drop old chunks -> upsert -> persist
//! answer:  question -> embed -> query top_k -> prompt(context, question) -> chat
//! ```
//!
//! Re-ingesting a document replaces all of its chunks. Answering refuses to
//! run against an empty index.

use std::sync::Arc;

use tracing::{debug, info};

use crate::document::chunk_corpus;
use crate::{
    ChatService, Chunker, Document, EmbeddingService, Error, FixedChunker, Hit, Message,
    RagConfig, Record, Result, VectorIndex,
};

/// Metadata key holding the parent document id.
pub const META_DOCUMENT_ID: &str = "document_id";
/// Metadata key holding the chunk's position in its document.
pub const META_CHUNK_INDEX: &str = "chunk_index";

const SYSTEM_PROMPT: &str = "You are an assistant for question-answering tasks. Use the following \
pieces of retrieved context to answer the question. If you don't know the answer, say that you \
don't know. Use three sentences maximum and keep the answer concise.";

/// Retrieval and generation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Sampling temperature for answers.
    pub temperature: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            top_k: 2,
            temperature: 0.1,
        }
    }
}

impl PipelineOptions {
    /// Take `top_k` and `temperature` from a config.
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            top_k: config.top_k,
            temperature: config.temperature,
        }
    }
}

/// Counts from one [`Pipeline::ingest`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    /// Documents processed.
    pub documents: usize,
    /// Chunks embedded and stored.
    pub chunks: usize,
}

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Model output.
    pub text: String,
    /// Retrieved chunks, ascending by distance.
    pub sources: Vec<Hit>,
}

/// Chunker, embedder, index and (for answering) chat service wired together.
#[derive(Clone)]
pub struct Pipeline {
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
    chat: Option<Arc<dyn ChatService>>,
    options: PipelineOptions,
}

impl Pipeline {
    /// A pipeline that can ingest and retrieve. Add a chat service with
    /// [`with_chat`](Self::with_chat) to answer questions.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            chat: None,
            options: PipelineOptions::default(),
        }
    }

    /// A fixed-size chunker and options taken from `config`.
    pub fn from_config(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = FixedChunker::from_params(config.chunk_params()?);
        Self::new(Arc::new(chunker), embedder, index)
            .with_options(PipelineOptions::from_config(config))
    }

    /// Use `chat` to generate answers.
    #[must_use]
    pub fn with_chat(mut self, chat: Arc<dyn ChatService>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Replace retrieval and generation settings.
    pub fn with_options(mut self, options: PipelineOptions) -> Result<Self> {
        if options.top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&options.temperature) {
            return Err(Error::InvalidArgument(format!(
                "temperature {} outside 0..=2",
                options.temperature
            )));
        }
        self.options = options;
        Ok(self)
    }

    /// The settings in use.
    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// The vector index.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// The chat service, required for answering.
    pub(crate) fn chat(&self) -> Result<&Arc<dyn ChatService>> {
        self.chat
            .as_ref()
            .ok_or_else(|| Error::Config("no chat service configured".into()))
    }

    /// Fails with [`Error::EmptyIndex`] when nothing has been ingested.
    pub async fn ensure_indexed(&self) -> Result<()> {
        if self.index.is_empty().await? {
            return Err(Error::EmptyIndex);
        }
        Ok(())
    }

    /// Chunk, embed and store `documents`, then persist the index.
    ///
    /// Chunks left over from an earlier ingest of the same document id are
    /// removed, so a shorter revision leaves no stale tail behind.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport> {
        let chunks = chunk_corpus(documents, self.chunker.as_ref())?;
        let mut report = IngestReport {
            documents: documents.len(),
            chunks: 0,
        };
        if chunks.is_empty() {
            if self.remove_previous(documents).await? > 0 {
                self.index.persist().await?;
            }
            return Ok(report);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::MalformedResponse(format!(
                "embedded {} chunks, got {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let records: Vec<Record> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                Record::new(chunk.id(), chunk.text, vector)
                    .with_metadata(META_DOCUMENT_ID, chunk.document_id)
                    .with_metadata(META_CHUNK_INDEX, chunk.index.to_string())
            })
            .collect();
        report.chunks = records.len();

        self.remove_previous(documents).await?;
        self.index.upsert(records).await?;
        self.index.persist().await?;

        info!(
            documents = report.documents,
            chunks = report.chunks,
            model = self.embedder.model_name(),
            "Ingested documents"
        );
        Ok(report)
    }

    async fn remove_previous(&self, documents: &[Document]) -> Result<usize> {
        let mut removed = 0;
        for document in documents {
            removed += self.index.delete_where(META_DOCUMENT_ID, &document.id).await?;
        }
        if removed > 0 {
            debug!(removed, "Removed previous chunks");
        }
        Ok(removed)
    }

    /// The `k` chunks nearest to `question`, ascending by distance.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Hit>> {
        if question.trim().is_empty() {
            return Err(Error::InvalidArgument("question must not be empty".into()));
        }
        let vector = self.embedder.embed_one(question).await?;
        let hits = self.index.query(&vector, k).await?;
        debug!(k, found = hits.len(), "Retrieved chunks");
        Ok(hits)
    }

    /// Answer `question` from the `top_k` nearest chunks.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        self.answer_in_context(question, question, &[], self.options.top_k)
            .await
    }

    /// Retrieve `k` chunks with `search_query`, then answer `question` after `history`.
    pub(crate) async fn answer_in_context(
        &self,
        search_query: &str,
        question: &str,
        history: &[Message],
        k: usize,
    ) -> Result<Answer> {
        let chat = self.chat()?;
        self.ensure_indexed().await?;
        let sources = self.retrieve(search_query, k).await?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(grounded_prompt(question, &sources)));
        messages.extend_from_slice(history);
        messages.push(Message::user(question));

        let text = chat.complete(&messages, self.options.temperature).await?;
        Ok(Answer { text, sources })
    }
}

/// System prompt carrying the retrieved context.
pub(crate) fn grounded_prompt(question: &str, sources: &[Hit]) -> String {
    let context = sources
        .iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{SYSTEM_PROMPT}\n\nContext:\n{context}\n\nQuestion:\n{question}")
}

//! Fake collaborators shared by the integration tests.
//!
//! None of these touch the network. `KeywordEmbedder` maps text to a
//! bag-of-keywords vector so retrieval results are predictable;
//! `ScriptedChat` replays canned replies and records every request.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use ragslab::{
    ChatService, DistanceMetric, Embedding, EmbeddingService, Error, FixedChunker, LocalIndex,
    Message, Pipeline, Result,
};

/// One dimension per keyword, plus a catch-all.
pub const KEYWORDS: [&str; 4] = ["rocket", "phone", "bank", "river"];

/// Deterministic embedder: counts keyword occurrences.
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `embed` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Embedding {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        vector.push(0.1);
        vector
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(KEYWORDS.len() + 1)
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Embedder that always fails with a retryable error.
pub struct UnavailableEmbedder;

#[async_trait]
impl EmbeddingService for UnavailableEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Embedding>> {
        Err(Error::ServiceUnavailable("embedding backend down".into()))
    }

    fn model_name(&self) -> &str {
        "unavailable"
    }
}

/// Chat service replaying `replies` in order and recording each request.
#[derive(Default)]
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChat {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failure as the next reply.
    pub fn push_error(&self, error: Error) {
        self.replies.lock().push_back(Err(error));
    }

    /// Every message list sent so far.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<Vec<Message>> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ChatService for ScriptedChat {
    async fn complete(&self, messages: &[Message], _temperature: f32) -> Result<String> {
        self.requests.lock().push(messages.to_vec());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("no scripted reply".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A pipeline over an ephemeral cosine index with small fixed chunks.
pub fn pipeline(chat: Arc<ScriptedChat>) -> Pipeline {
    Pipeline::new(
        Arc::new(FixedChunker::new(64, 8).unwrap()),
        Arc::new(KeywordEmbedder::new()),
        Arc::new(LocalIndex::ephemeral(DistanceMetric::Cosine)),
    )
    .with_chat(chat)
}

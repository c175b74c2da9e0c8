//! Embedding service contract.
//!
//! Backends:
//!
//! - [`OpenAiEmbeddings`](crate::OpenAiEmbeddings): hosted, needs an API key.
//! - `LocalEmbeddings` (feature `local-embeddings`): all-MiniLM-L6-v2 via
//!   fastembed, runs on the CPU with no credential.

use async_trait::async_trait;

use crate::Result;

#[cfg(feature = "local-embeddings")]
pub(crate) mod local;

/// A fixed-length vector representation of a text.
pub type Embedding = Vec<f32>;

/// Turns texts into vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed `texts`, returning exactly one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            crate::Error::MalformedResponse("embedding service returned no vector".into())
        })
    }

    /// Vector length, when known ahead of the first call.
    fn dimensions(&self) -> Option<usize> {
        None
    }

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

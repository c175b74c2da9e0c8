//! Local embeddings with fastembed.
//!
//! The model is CPU-bound and synchronous, so every call runs on tokio's
//! blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use tracing::debug;

use super::{Embedding, EmbeddingService};
use crate::{Error, Result};

const MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// all-MiniLM-L6-v2: 384-dimensional sentence embeddings.
pub struct LocalEmbeddings {
    model: Arc<Mutex<TextEmbedding>>,
}

impl LocalEmbeddings {
    /// Load (downloading on first use) the default model.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding model fails to load.
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| Error::Embedding(e.to_string()))?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let batch = texts.to_vec();
        let count = batch.len();

        let vectors = tokio::task::spawn_blocking(move || model.lock().embed(batch, None))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))?
            .map_err(|e| Error::Embedding(e.to_string()))?;

        if vectors.len() != count {
            return Err(Error::Embedding(format!(
                "expected {count} vectors, model returned {}",
                vectors.len()
            )));
        }
        debug!(count, "Embedded locally");
        Ok(vectors)
    }

    fn dimensions(&self) -> Option<usize> {
        Some(384)
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

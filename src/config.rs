//! Configuration for ragslab.
//!
//! One explicit [`RagConfig`] is handed to every collaborator constructor.
//! It can be built in code, parsed from TOML, and then, at the binary's
//! discretion, overlaid with environment variables:
//!
//! ```toml
//! api_key = "sk-..."
//! persist_path = "./db/chroma_persistent_storage"
//! collection_name = "document_qa_collection"
//! chunk_size = 1000
//! chunk_overlap = 20
//! top_k = 2
//! ```
//!
//! Library code never reads the environment itself.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ChunkParams, Error, Result};

/// Environment variable holding the API credential.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the API base URL.
pub const ENV_API_BASE: &str = "OPENAI_API_BASE";
/// Environment variable overriding the persistence directory.
pub const ENV_PERSIST_PATH: &str = "RAGSLAB_PERSIST_PATH";
/// Environment variable overriding the collection name.
pub const ENV_COLLECTION: &str = "RAGSLAB_COLLECTION";

/// Where the command line keeps its index when no `persist_path` is given.
pub const DEFAULT_PERSIST_PATH: &str = "./db/chroma_persistent_storage";

/// Settings shared by the embedding service, chat service, vector index and
/// chunker.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Credential for the embedding and chat services.
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API.
    pub api_base: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Inputs per embedding request.
    pub embedding_batch_size: usize,
    /// Chat model name.
    pub chat_model: String,
    /// Sampling temperature for answers.
    pub temperature: f32,
    /// On-disk location of the vector index. `None` keeps it in memory.
    pub persist_path: Option<PathBuf>,
    /// Logical namespace inside `persist_path`.
    pub collection_name: String,
    /// Chunk size in characters. Signed so negative input is reported, not wrapped.
    pub chunk_size: i64,
    /// Chunk overlap in characters.
    pub chunk_overlap: i64,
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Chunks retrieved per question in a conversation.
    pub chat_top_k: usize,
    /// Messages a conversational session keeps.
    pub max_history: usize,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_batch_size: 64,
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            persist_path: None,
            collection_name: "document_qa_collection".to_string(),
            chunk_size: 1000,
            chunk_overlap: 20,
            top_k: 2,
            chat_top_k: 5,
            max_history: 20,
            request_timeout_secs: 60,
        }
    }
}

impl RagConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Overlay recognised environment variables.
    ///
    /// Meant for program entry points; nothing inside the library calls it.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup. Empty values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key| lookup(key).filter(|value: &String| !value.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(base) = get(ENV_API_BASE) {
            self.api_base = base;
        }
        if let Some(path) = get(ENV_PERSIST_PATH) {
            self.persist_path = Some(PathBuf::from(path));
        }
        if let Some(name) = get(ENV_COLLECTION) {
            self.collection_name = name;
        }
        self
    }

    /// Persist under [`DEFAULT_PERSIST_PATH`] unless a location is already set.
    #[must_use]
    pub fn with_default_persist_path(mut self) -> Self {
        if self.persist_path.is_none() {
            self.persist_path = Some(PathBuf::from(DEFAULT_PERSIST_PATH));
        }
        self
    }

    /// Check every value that can be checked without the network.
    pub fn validate(&self) -> Result<()> {
        self.chunk_params()?;
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::InvalidArgument(format!(
                "temperature {} outside 0..=2",
                self.temperature
            )));
        }
        if self.top_k == 0 || self.chat_top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be > 0".into()));
        }
        if self.embedding_batch_size == 0 {
            return Err(Error::InvalidArgument(
                "embedding_batch_size must be > 0".into(),
            ));
        }
        if self.collection_name.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "collection_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The chunking parameters, validated.
    pub fn chunk_params(&self) -> Result<ChunkParams> {
        ChunkParams::from_signed(self.chunk_size, self.chunk_overlap)
    }

    /// The API key, or a configuration error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config(format!("no API key configured (set {ENV_API_KEY})")))
    }

    /// HTTP timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for RagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_batch_size", &self.embedding_batch_size)
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("persist_path", &self.persist_path)
            .field("collection_name", &self.collection_name)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("top_k", &self.top_k)
            .field("chat_top_k", &self.chat_top_k)
            .field("max_history", &self.max_history)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

//! Vector index contract.
//!
//! An index stores `(id, text, vector, metadata)` records and answers
//! k-nearest-neighbour queries. Results are ranked by **ascending distance**
//! (see [`DistanceMetric`]); equal distances are ordered by id so repeated
//! queries return identical sequences.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Embedding, Result};

mod distance;
mod local;

pub use distance::DistanceMetric;
pub use local::LocalIndex;

/// String metadata attached to a record. Ordered for stable snapshots.
pub type Metadata = BTreeMap<String, String>;

/// An entry to store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique id; upserting an existing id replaces the record.
    pub id: String,
    /// The text the vector was computed from.
    pub text: String,
    /// The embedding.
    pub vector: Embedding,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Record {
    /// A record without metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>, vector: Embedding) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            vector,
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Record id.
    pub id: String,
    /// Record text.
    pub text: String,
    /// Distance to the query vector; lower is closer.
    pub distance: f32,
    /// Record metadata.
    pub metadata: Metadata,
}

/// Similarity search over embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records.
    async fn upsert(&self, records: Vec<Record>) -> Result<()>;

    /// The `k` records nearest to `vector`, ascending by distance.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Hit>>;

    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<Option<Record>>;

    /// Remove records; unknown ids are ignored. Returns how many were removed.
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Remove every record whose metadata maps `key` to `value`.
    async fn delete_where(&self, key: &str, value: &str) -> Result<usize>;

    /// Number of stored records.
    async fn len(&self) -> Result<usize>;

    /// Whether the index is empty.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every record.
    async fn clear(&self) -> Result<()>;

    /// Flush to durable storage, if the index has any. No-op by default.
    async fn persist(&self) -> Result<()> {
        Ok(())
    }
}

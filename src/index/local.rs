//! In-process vector index with optional JSON persistence.
//!
//! Search is exact (brute force over every record). A persisted collection
//! lives in a single file:
//!
//! - `{persist_path}/{collection_name}.json`
//!
//! written atomically (temp file + rename) by [`LocalIndex::persist`].
//! Concurrent persists are serialized, and each one snapshots the records
//! only once it holds the write guard, so the file on disk never moves
//! backwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{DistanceMetric, Hit, Record, VectorIndex};
use crate::{Error, RagConfig, Result};

const EPHEMERAL_NAME: &str = "ephemeral";

/// On-disk form of a collection.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    name: String,
    metric: DistanceMetric,
    dimensions: Option<usize>,
    records: Vec<Record>,
}

#[derive(Debug, Default)]
struct Collection {
    dimensions: Option<usize>,
    records: BTreeMap<String, Record>,
}

/// A vector index held in memory, optionally backed by a snapshot file.
///
/// ```rust
/// use ragslab::{DistanceMetric, LocalIndex};
///
/// let index = LocalIndex::ephemeral(DistanceMetric::Cosine);
/// assert_eq!(index.name(), "ephemeral");
/// assert!(index.location().is_none());
/// ```
#[derive(Debug)]
pub struct LocalIndex {
    name: String,
    metric: DistanceMetric,
    location: Option<PathBuf>,
    inner: RwLock<Collection>,
    // Held across the whole snapshot, write and rename.
    disk: Mutex<()>,
}

impl LocalIndex {
    /// A memory-only index; contents are lost when it is dropped.
    #[must_use]
    pub fn ephemeral(metric: DistanceMetric) -> Self {
        Self {
            name: EPHEMERAL_NAME.to_string(),
            metric,
            location: None,
            inner: RwLock::new(Collection::default()),
            disk: Mutex::new(()),
        }
    }

    /// Get or create the collection `name` under `persist_path`.
    ///
    /// # Errors
    ///
    /// Invalid collection names, unreadable snapshots, or a snapshot written
    /// with a different metric.
    pub async fn open(
        persist_path: impl AsRef<Path>,
        name: &str,
        metric: DistanceMetric,
    ) -> Result<Self> {
        validate_name(name)?;
        let location = snapshot_path(persist_path.as_ref(), name);

        let collection = if tokio::fs::try_exists(&location).await? {
            let json = tokio::fs::read_to_string(&location).await?;
            let snapshot: Snapshot = serde_json::from_str(&json)
                .map_err(|e| Error::Storage(format!("failed to parse {}: {e}", location.display())))?;
            if snapshot.metric != metric {
                return Err(Error::Storage(format!(
                    "collection '{name}' was created with metric {}, not {metric}",
                    snapshot.metric
                )));
            }

            let count = snapshot.records.len();
            let records = snapshot
                .records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect();
            info!(name, count, path = %location.display(), "Opened collection");
            Collection {
                dimensions: snapshot.dimensions,
                records,
            }
        } else {
            info!(name, path = %location.display(), "Created collection");
            Collection::default()
        };

        Ok(Self {
            name: name.to_string(),
            metric,
            location: Some(location),
            inner: RwLock::new(collection),
            disk: Mutex::new(()),
        })
    }

    /// Persisted when `persist_path` is set, ephemeral otherwise. Cosine distance.
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        match &config.persist_path {
            Some(path) => Self::open(path, &config.collection_name, DistanceMetric::Cosine).await,
            None => Ok(Self::ephemeral(DistanceMetric::Cosine)),
        }
    }

    /// Remove the collection, in memory and on disk.
    pub async fn delete_collection(&self) -> Result<()> {
        let _disk = self.disk.lock().await;
        {
            let mut inner = self.inner.write();
            *inner = Collection::default();
        }
        if let Some(location) = &self.location {
            match tokio::fs::remove_file(location).await {
                Ok(()) => info!(name = %self.name, "Deleted collection"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Distance metric used by queries.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Snapshot file, for persisted collections.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Vector length fixed by the first upsert.
    pub fn dimensions(&self) -> Option<usize> {
        self.inner.read().dimensions
    }
}

fn snapshot_path(persist_path: &Path, name: &str) -> PathBuf {
    persist_path.join(format!("{name}.json"))
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "invalid collection name '{name}'"
        )))
    }
}

fn validate_vector(vector: &[f32], expected: Option<usize>) -> Result<()> {
    if vector.is_empty() {
        return Err(Error::InvalidArgument("empty vector".into()));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidArgument("vector contains NaN or infinity".into()));
    }
    match expected {
        Some(expected) if expected != vector.len() => Err(Error::DimensionMismatch {
            expected,
            actual: vector.len(),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn upsert(&self, records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write();
        let mut dimensions = inner.dimensions;
        for record in &records {
            if record.id.is_empty() {
                return Err(Error::InvalidArgument("record id must not be empty".into()));
            }
            validate_vector(&record.vector, dimensions)?;
            dimensions = Some(record.vector.len());
        }

        let count = records.len();
        inner.dimensions = dimensions;
        for record in records {
            inner.records.insert(record.id.clone(), record);
        }
        debug!(name = %self.name, count, total = inner.records.len(), "Upserted records");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Hit>> {
        let inner = self.inner.read();
        if k == 0 || inner.records.is_empty() {
            return Ok(Vec::new());
        }
        validate_vector(vector, inner.dimensions)?;

        let mut scored: Vec<(f32, &Record)> = inner
            .records
            .values()
            .map(|record| (self.metric.distance(vector, &record.vector), record))
            .collect();
        scored.sort_by(|(da, ra), (db, rb)| da.total_cmp(db).then_with(|| ra.id.cmp(&rb.id)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, record)| Hit {
                id: record.id.clone(),
                text: record.text.clone(),
                distance,
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.inner.read().records.get(id).cloned())
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut inner = self.inner.write();
        let removed = ids
            .iter()
            .filter(|id| inner.records.remove(id.as_str()).is_some())
            .count();
        if inner.records.is_empty() {
            inner.dimensions = None;
        }
        Ok(removed)
    }

    async fn delete_where(&self, key: &str, value: &str) -> Result<usize> {
        let mut inner = self.inner.write();
        let before = inner.records.len();
        inner
            .records
            .retain(|_, record| record.metadata.get(key).map(String::as_str) != Some(value));
        if inner.records.is_empty() {
            inner.dimensions = None;
        }
        let removed = before - inner.records.len();
        if removed > 0 {
            debug!(name = %self.name, key, value, removed, "Deleted records by metadata");
        }
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().records.len())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write() = Collection::default();
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let Some(location) = &self.location else {
            return Ok(());
        };

        let _disk = self.disk.lock().await;
        let json = {
            let inner = self.inner.read();
            let snapshot = Snapshot {
                name: self.name.clone(),
                metric: self.metric,
                dimensions: inner.dimensions,
                records: inner.records.values().cloned().collect(),
            };
            serde_json::to_string_pretty(&snapshot)
                .map_err(|e| Error::Storage(format!("failed to serialize collection: {e}")))?
        };

        if let Some(parent) = location.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = location.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, location).await?;

        info!(name = %self.name, path = %location.display(), "Saved collection");
        Ok(())
    }
}

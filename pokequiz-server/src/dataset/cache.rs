//! Dataset cache
//!
//! The cache is the flat JSON form of the id -> record mapping (`pokemon.json`
//! in the root folder). Category indices are never written; they are rebuilt
//! from records after every load.

use super::{Classifier, Dataset, DatasetBuilder, Record, RecordId};
use async_trait::async_trait;
use pokequiz_common::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Record used for the completeness check when present
const SAMPLE_RECORD_ID: RecordId = 1;

/// Durable byte store holding one dataset blob
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet
    async fn read_blob(&self) -> Result<Option<Vec<u8>>>;

    async fn write_blob(&self, bytes: &[u8]) -> Result<()>;
}

/// Blob stored in a single file, replaced atomically via rename
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn read_blob(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_blob(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

/// In-memory blob, for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryBlobStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn with_blob(bytes: Vec<u8>) -> Self {
        Self {
            blob: Mutex::new(Some(bytes)),
        }
    }

    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.blob.lock().await.clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read_blob(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.blob.lock().await.clone())
    }

    async fn write_blob(&self, bytes: &[u8]) -> Result<()> {
        *self.blob.lock().await = Some(bytes.to_vec());
        Ok(())
    }
}

/// Outcome of reading the cache
#[derive(Debug)]
pub enum CacheState {
    /// Nothing stored yet
    Missing,
    /// Stored but unusable; the reason is for logging
    Incomplete(String),
    Complete(BTreeMap<RecordId, Record>),
}

pub struct DatasetCache {
    store: Arc<dyn BlobStore>,
}

impl DatasetCache {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Read and validate the stored dataset
    ///
    /// Read failures and undecodable blobs are reported as incomplete so the
    /// caller rebuilds instead of failing startup.
    pub async fn load(&self) -> CacheState {
        let bytes = match self.store.read_blob().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return CacheState::Missing,
            Err(e) => return CacheState::Incomplete(format!("read failed: {}", e)),
        };

        let records: BTreeMap<RecordId, Record> = match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(e) => return CacheState::Incomplete(format!("decode failed: {}", e)),
        };

        if !Self::is_complete(&records) {
            return CacheState::Incomplete("sample record is missing required fields".to_string());
        }

        CacheState::Complete(records)
    }

    /// Completeness heuristic on one sample record (id 1, else the lowest id):
    /// non-empty types and non-zero height and weight
    pub fn is_complete(records: &BTreeMap<RecordId, Record>) -> bool {
        let sample = records
            .get(&SAMPLE_RECORD_ID)
            .or_else(|| records.values().next());

        match sample {
            Some(record) => !record.types.is_empty() && record.height > 0.0 && record.weight > 0.0,
            None => false,
        }
    }

    pub async fn save(&self, dataset: &Dataset) -> Result<()> {
        let records: BTreeMap<RecordId, &Record> = dataset
            .records()
            .map(|record| (record.id, record.as_ref()))
            .collect();

        let bytes = serde_json::to_vec(&records)?;
        self.store.write_blob(&bytes).await?;

        debug!(records = records.len(), bytes = bytes.len(), "Dataset cache written");
        Ok(())
    }
}

/// Startup path: cache first, full rebuild when the cache is unusable
pub struct DatasetLoader {
    cache: DatasetCache,
    builder: DatasetBuilder,
    classifier: Classifier,
}

impl DatasetLoader {
    pub fn new(cache: DatasetCache, builder: DatasetBuilder, classifier: Classifier) -> Self {
        Self {
            cache,
            builder,
            classifier,
        }
    }

    pub async fn load_or_build(&self) -> Dataset {
        match self.cache.load().await {
            CacheState::Complete(records) => {
                info!(records = records.len(), "Loaded dataset from cache");
                Dataset::new(records.into_values())
            }
            CacheState::Incomplete(reason) => {
                warn!(reason = %reason, "Dataset cache incomplete, rebuilding");
                self.rebuild().await
            }
            CacheState::Missing => {
                info!("No dataset cache found, building");
                self.rebuild().await
            }
        }
    }

    /// Fetch, classify and persist a fresh dataset
    ///
    /// Classification starts only after every fetch has finished. A failed
    /// cache write is logged and the dataset is still returned; an empty
    /// build is never written over the cache.
    pub async fn rebuild(&self) -> Dataset {
        let report = self.builder.build().await;
        let mut records = report.records;
        self.classifier.classify(&mut records).await;

        let dataset = Dataset::new(records.into_values());

        if dataset.is_empty() {
            warn!(
                skipped = report.skipped.len(),
                "Rebuild produced no records; cache left untouched"
            );
            return dataset;
        }

        if let Err(e) = self.cache.save(&dataset).await {
            error!(error = %e, "Failed to write dataset cache");
        }

        dataset
    }
}

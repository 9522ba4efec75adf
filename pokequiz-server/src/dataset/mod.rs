//! Species dataset
//!
//! A [`Dataset`] is an immutable snapshot: records keyed by id plus the
//! [`CategoryIndex`] derived from them. Request handlers share it through a
//! [`DatasetHandle`]; a rebuild constructs a new snapshot and swaps the
//! reference instead of mutating records in place.

pub mod builder;
pub mod cache;
pub mod category;
pub mod index;

pub use builder::{BuildReport, DatasetBuilder, FETCH_CONCURRENCY, VARIANT_ID_OFFSET};
pub use cache::{BlobStore, CacheState, DatasetCache, DatasetLoader, FileBlobStore, MemoryBlobStore};
pub use category::Classifier;
pub use index::{CategoryIndex, ALL_CATEGORY};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Record identifier (base species use the provider id; variants are offset)
pub type RecordId = u32;

/// Base stat vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatVector {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
}

/// One catalogued species or special form
///
/// Serialized field names match the on-disk cache format
/// (`englishName`, `imageUrl`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    /// Localized display name; ground truth for answer matching
    pub name: String,
    /// Provider source name; used for variant lookups and deduplication
    #[serde(default)]
    pub english_name: String,
    /// Category tag; empty until classified
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stats: StatVector,
    #[serde(default)]
    pub image_url: String,
    /// Metres
    #[serde(default)]
    pub height: f32,
    /// Kilograms
    #[serde(default)]
    pub weight: f32,
    /// Localized type names
    #[serde(default)]
    pub types: Vec<String>,
}

impl Record {
    /// Category tag, or `None` when unclassified
    pub fn category(&self) -> Option<&str> {
        if self.category.is_empty() {
            None
        } else {
            Some(&self.category)
        }
    }
}

/// Immutable dataset snapshot
#[derive(Debug, Default)]
pub struct Dataset {
    records: BTreeMap<RecordId, Arc<Record>>,
    index: CategoryIndex,
}

impl Dataset {
    /// Build a snapshot; the category index is derived here and nowhere else
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        let records: BTreeMap<RecordId, Arc<Record>> = records
            .into_iter()
            .map(|record| (record.id, Arc::new(record)))
            .collect();
        let index = CategoryIndex::build(records.values());

        Self { records, index }
    }

    pub fn get(&self, id: RecordId) -> Option<&Arc<Record>> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in id order
    pub fn records(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.values()
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    /// Pool for a category tag (`"all"` included); `None` if unknown
    pub fn pool(&self, category: &str) -> Option<&[Arc<Record>]> {
        self.index.pool(category)
    }

    /// Every record
    pub fn all(&self) -> &[Arc<Record>] {
        self.index.pool(ALL_CATEGORY).unwrap_or(&[])
    }
}

/// Shared read-only reference to the current dataset snapshot
#[derive(Clone, Default)]
pub struct DatasetHandle {
    current: Arc<RwLock<Arc<Dataset>>>,
}

impl DatasetHandle {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(dataset))),
        }
    }

    /// Current snapshot; stays valid even if a replacement is swapped in
    pub async fn snapshot(&self) -> Arc<Dataset> {
        self.current.read().await.clone()
    }

    /// Atomically swap in a new snapshot
    pub async fn replace(&self, dataset: Dataset) {
        *self.current.write().await = Arc::new(dataset);
    }
}

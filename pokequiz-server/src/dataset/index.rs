//! Category index: category tag -> records in that category
//!
//! Pure derived structure. Rebuilt from records whenever a snapshot is made
//! and never persisted.

use super::Record;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Synthetic category containing every record
pub const ALL_CATEGORY: &str = "all";

#[derive(Debug, Default)]
pub struct CategoryIndex {
    pools: HashMap<String, Vec<Arc<Record>>>,
}

impl CategoryIndex {
    /// Group records by category; unclassified records only join `"all"`
    pub fn build<'a>(records: impl IntoIterator<Item = &'a Arc<Record>>) -> Self {
        let mut pools: HashMap<String, Vec<Arc<Record>>> = HashMap::new();

        for record in records {
            if let Some(category) = record.category() {
                pools
                    .entry(category.to_string())
                    .or_default()
                    .push(Arc::clone(record));
            }
            pools
                .entry(ALL_CATEGORY.to_string())
                .or_default()
                .push(Arc::clone(record));
        }

        let index = Self { pools };
        index.log_summary();
        index
    }

    pub fn pool(&self, category: &str) -> Option<&[Arc<Record>]> {
        self.pools.get(category).map(Vec::as_slice)
    }

    /// Category tags with their pool sizes, sorted by tag
    pub fn sizes(&self) -> Vec<(&str, usize)> {
        let mut sizes: Vec<(&str, usize)> = self
            .pools
            .iter()
            .map(|(category, pool)| (category.as_str(), pool.len()))
            .collect();
        sizes.sort_unstable();
        sizes
    }

    fn log_summary(&self) {
        for (category, size) in self.sizes() {
            info!(category = %category, records = size, "Category pool built");

            if category == ALL_CATEGORY {
                continue;
            }
            let duplicates = self.duplicate_names(category);
            if duplicates > 0 {
                warn!(
                    category = %category,
                    duplicates,
                    "Category contains records sharing a display name"
                );
            }
        }
    }

    fn duplicate_names(&self, category: &str) -> usize {
        let mut seen = HashSet::new();
        self.pool(category)
            .unwrap_or(&[])
            .iter()
            .filter(|record| !seen.insert(record.name.as_str()))
            .count()
    }
}

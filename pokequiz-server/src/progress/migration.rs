//! Legacy category stats reconstruction
//!
//! Progress rows written before per-category counters existed carry only
//! totals and the missed set. The counters rebuilt here are the miss side
//! alone: each missed record adds one to its category's total. Historical
//! correct answers cannot be recovered, and a user whose mistakes were all
//! corrected gets nothing back. The result is returned to the caller and
//! never written to storage, so repeated calls recompute from the current
//! missed set.

use super::{CategoryTally, ProgressRecord};
use crate::dataset::Dataset;
use std::collections::BTreeMap;

/// Category counters are empty although answers were recorded
pub fn needs_migration(progress: &ProgressRecord) -> bool {
    progress.category_stats.is_empty() && progress.total_questions > 0
}

pub fn migrate(progress: &ProgressRecord, dataset: &Dataset) -> BTreeMap<String, CategoryTally> {
    let mut stats: BTreeMap<String, CategoryTally> = BTreeMap::new();

    for id in &progress.missed {
        let Some(category) = dataset.get(*id).and_then(|record| record.category()) else {
            continue;
        };
        stats.entry(category.to_string()).or_default().total += 1;
    }

    stats
}

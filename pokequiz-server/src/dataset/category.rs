//! Category classification
//!
//! Two passes, each touching only records whose category is still unset:
//! 1. Source-name patterns assign the special categories (mega, gmax, regional).
//! 2. Generation member lists assign the region categories.
//!
//! Name-pattern evidence always outranks generation membership.

use super::{Record, RecordId};
use crate::provider::SpeciesProvider;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const MEGA: &str = "mega";
pub const GMAX: &str = "gmax";
pub const REGIONAL: &str = "regional";

/// Region categories and the provider generation id backing each
pub const REGIONS: [(&str, u32); 9] = [
    ("kanto", 1),
    ("johto", 2),
    ("hoenn", 3),
    ("sinnoh", 4),
    ("unova", 5),
    ("kalos", 6),
    ("alola", 7),
    ("galar", 8),
    ("paldea", 9),
];

const MEGA_PATTERNS: [&str; 1] = ["-mega"];
const GMAX_PATTERNS: [&str; 1] = ["-gmax"];
const REGIONAL_PATTERNS: [&str; 4] = ["-alola", "-galar", "-hisui", "-paldea"];

/// Special category implied by a source name, checked mega > gmax > regional
pub fn special_category(source_name: &str) -> Option<&'static str> {
    let matches = |patterns: &[&str]| patterns.iter().any(|p| source_name.contains(p));

    if matches(&MEGA_PATTERNS) {
        Some(MEGA)
    } else if matches(&GMAX_PATTERNS) {
        Some(GMAX)
    } else if matches(&REGIONAL_PATTERNS) {
        Some(REGIONAL)
    } else {
        None
    }
}

/// Counts from one classification run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    pub by_name: usize,
    pub by_generation: usize,
    pub unclassified: usize,
}

pub struct Classifier {
    provider: Arc<dyn SpeciesProvider>,
}

impl Classifier {
    pub fn new(provider: Arc<dyn SpeciesProvider>) -> Self {
        Self { provider }
    }

    /// Assign every record at most one category, in place
    pub async fn classify(&self, records: &mut BTreeMap<RecordId, Record>) -> ClassifySummary {
        let mut summary = ClassifySummary {
            by_name: classify_by_name(records.values_mut()),
            ..ClassifySummary::default()
        };

        for (region, generation_id) in REGIONS {
            let members = match self.provider.fetch_generation_members(generation_id).await {
                Ok(members) => members,
                Err(e) => {
                    warn!(region, generation_id, error = %e, "Failed to fetch generation members");
                    continue;
                }
            };

            for id in members {
                if let Some(record) = records.get_mut(&id) {
                    if record.category.is_empty() {
                        record.category = region.to_string();
                        summary.by_generation += 1;
                    }
                }
            }
        }

        summary.unclassified = records.values().filter(|r| r.category.is_empty()).count();

        info!(
            by_name = summary.by_name,
            by_generation = summary.by_generation,
            unclassified = summary.unclassified,
            "Classification complete"
        );

        summary
    }
}

/// Pass 1: special categories from source names; returns how many were assigned
pub fn classify_by_name<'a>(records: impl IntoIterator<Item = &'a mut Record>) -> usize {
    let mut assigned = 0;
    for record in records {
        if !record.category.is_empty() {
            continue;
        }
        if let Some(category) = special_category(&record.english_name) {
            record.category = category.to_string();
            assigned += 1;
        }
    }
    assigned
}

//! Dataset builder
//!
//! Fetches every candidate id through a bounded worker pool, assembles
//! normalized records into a mutex-guarded registry, then materializes the
//! special-form variants discovered along the way. `build()` returns only
//! after every worker of both phases has finished; classification runs on
//! the returned records, never on a partially built registry.
//!
//! Per-item failures (network, decode, not found) are logged and skipped.

use super::category::special_category;
use super::{Record, RecordId, StatVector};
use crate::provider::{
    pick_localized, ItemAttrs, ItemRef, ProviderError, SpeciesNaming, SpeciesProvider,
};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Maximum in-flight provider fetches
pub const FETCH_CONCURRENCY: usize = 10;

/// Added to a variant's provider id so it never collides with a base id
pub const VARIANT_ID_OFFSET: RecordId = 10_000;

/// Result of one build
#[derive(Debug, Default)]
pub struct BuildReport {
    pub records: BTreeMap<RecordId, Record>,
    /// Base ids that produced no record (not found or failed), ascending
    pub skipped: Vec<RecordId>,
    /// Variant source names whose fetch failed
    pub failed_variants: Vec<String>,
    /// Variant source names the provider does not serve
    pub missing_variants: Vec<String>,
}

/// Shared write target for all workers
#[derive(Default)]
struct Registry {
    records: BTreeMap<RecordId, Record>,
    source_names: HashSet<String>,
}

impl Registry {
    /// Insert unless a record with the same source name exists
    fn insert(&mut self, record: Record) -> bool {
        if !self.source_names.insert(record.english_name.clone()) {
            return false;
        }
        self.records.insert(record.id, record);
        true
    }
}

/// Variant discovered on a base species, waiting to be fetched
#[derive(Debug, Clone)]
struct PendingVariant {
    source_name: String,
    category: &'static str,
    species_slug: String,
    species_display_name: String,
}

enum BaseOutcome {
    Added(Vec<PendingVariant>),
    Skipped(RecordId),
}

enum VariantOutcome {
    Added,
    Duplicate,
    Missing(String),
    Failed(String),
}

pub struct DatasetBuilder {
    provider: Arc<dyn SpeciesProvider>,
    languages: Vec<String>,
    max_item_id: u32,
    type_count: u32,
}

impl DatasetBuilder {
    pub fn new(provider: Arc<dyn SpeciesProvider>, languages: Vec<String>) -> Self {
        Self {
            provider,
            languages,
            max_item_id: 1025,
            type_count: 18,
        }
    }

    pub fn with_max_item_id(mut self, max_item_id: u32) -> Self {
        self.max_item_id = max_item_id;
        self
    }

    pub fn with_type_count(mut self, type_count: u32) -> Self {
        self.type_count = type_count;
        self
    }

    /// Fetch and assemble every record
    pub async fn build(&self) -> BuildReport {
        info!(
            max_item_id = self.max_item_id,
            concurrency = FETCH_CONCURRENCY,
            "Building dataset from provider"
        );

        let type_names = self.fetch_type_names().await;
        let registry = Mutex::new(Registry::default());

        // Phase 1: base species
        let outcomes: Vec<BaseOutcome> = stream::iter(1..=self.max_item_id)
            .map(|id| self.fetch_base(id, &type_names, &registry))
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut skipped = Vec::new();
        let mut seen_variants = HashSet::new();
        let mut pending = Vec::new();
        for outcome in outcomes {
            match outcome {
                BaseOutcome::Added(variants) => {
                    for variant in variants {
                        if seen_variants.insert(variant.source_name.clone()) {
                            pending.push(variant);
                        }
                    }
                }
                BaseOutcome::Skipped(id) => skipped.push(id),
            }
        }
        skipped.sort_unstable();

        // Phase 2: special-form variants
        let variant_outcomes: Vec<VariantOutcome> = stream::iter(pending)
            .map(|variant| self.fetch_variant(variant, &type_names, &registry))
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut variants_added = 0;
        let mut failed_variants = Vec::new();
        let mut missing_variants = Vec::new();
        for outcome in variant_outcomes {
            match outcome {
                VariantOutcome::Added => variants_added += 1,
                VariantOutcome::Duplicate => {}
                VariantOutcome::Missing(name) => missing_variants.push(name),
                VariantOutcome::Failed(name) => failed_variants.push(name),
            }
        }
        failed_variants.sort();
        missing_variants.sort();

        let records = registry.into_inner().records;

        info!(
            records = records.len(),
            variants = variants_added,
            skipped = skipped.len(),
            failed_variants = failed_variants.len(),
            missing_variants = missing_variants.len(),
            "Dataset build complete"
        );

        BuildReport {
            records,
            skipped,
            failed_variants,
            missing_variants,
        }
    }

    /// Provider type slug -> localized type name
    async fn fetch_type_names(&self) -> HashMap<String, String> {
        let results: Vec<_> = stream::iter(1..=self.type_count)
            .map(|type_id| async move { (type_id, self.provider.fetch_type_naming(type_id).await) })
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut type_names = HashMap::new();
        for (type_id, result) in results {
            match result {
                Ok(naming) => {
                    if let Some(localized) = pick_localized(&naming.names, &self.languages) {
                        type_names.insert(naming.name.clone(), localized.to_string());
                    }
                }
                Err(e) => warn!(type_id, error = %e, "Failed to fetch type naming"),
            }
        }

        debug!(types = type_names.len(), "Type names loaded");
        type_names
    }

    async fn fetch_base(
        &self,
        id: RecordId,
        type_names: &HashMap<String, String>,
        registry: &Mutex<Registry>,
    ) -> BaseOutcome {
        let item = match self.provider.fetch_item(&ItemRef::Id(id)).await {
            Ok(item) => item,
            Err(e) => {
                log_fetch_failure(&ItemRef::Id(id), &e);
                return BaseOutcome::Skipped(id);
            }
        };

        let naming = match self.provider.fetch_naming(id).await {
            Ok(naming) => naming,
            Err(e) => {
                warn!(id, error = %e, "Failed to fetch species naming");
                return BaseOutcome::Skipped(id);
            }
        };

        let display_name = pick_localized(&naming.names, &self.languages)
            .unwrap_or(&item.name)
            .to_string();
        let variants = discover_variants(&naming, &item, &display_name);
        let record = assemble_record(&item, item.id, display_name, type_names);

        let mut registry = registry.lock().await;
        if !registry.insert(record) {
            debug!(id, "Duplicate source name, keeping first record");
        }

        BaseOutcome::Added(variants)
    }

    async fn fetch_variant(
        &self,
        variant: PendingVariant,
        type_names: &HashMap<String, String>,
        registry: &Mutex<Registry>,
    ) -> VariantOutcome {
        if registry.lock().await.source_names.contains(&variant.source_name) {
            debug!(variant = %variant.source_name, "Variant already present");
            return VariantOutcome::Duplicate;
        }

        let item_ref = ItemRef::Name(variant.source_name.clone());
        let item = match self.provider.fetch_item(&item_ref).await {
            Ok(item) => item,
            Err(e) => {
                log_fetch_failure(&item_ref, &e);
                return match e {
                    ProviderError::NotFound(_) => VariantOutcome::Missing(variant.source_name),
                    _ => VariantOutcome::Failed(variant.source_name),
                };
            }
        };

        let display_name = format!(
            "{} ({})",
            variant.species_display_name,
            form_label(&variant.source_name, &variant.species_slug)
        );
        let mut record = assemble_record(
            &item,
            item.id + VARIANT_ID_OFFSET,
            display_name,
            type_names,
        );
        record.category = variant.category.to_string();

        let mut registry = registry.lock().await;
        if registry.insert(record) {
            VariantOutcome::Added
        } else {
            VariantOutcome::Duplicate
        }
    }
}

fn log_fetch_failure(item: &ItemRef, error: &ProviderError) {
    match error {
        ProviderError::NotFound(_) => debug!(item = %item, "Item not found, skipping"),
        _ => warn!(item = %item, error = %error, "Failed to fetch item, skipping"),
    }
}

/// Non-default varieties whose source name marks a special form
fn discover_variants(
    naming: &SpeciesNaming,
    item: &ItemAttrs,
    species_display_name: &str,
) -> Vec<PendingVariant> {
    let species_slug = if naming.name.is_empty() {
        item.name.clone()
    } else {
        naming.name.clone()
    };

    naming
        .varieties
        .iter()
        .filter(|variety| !variety.is_default)
        .filter_map(|variety| {
            special_category(&variety.pokemon.name).map(|category| PendingVariant {
                source_name: variety.pokemon.name.clone(),
                category,
                species_slug: species_slug.clone(),
                species_display_name: species_display_name.to_string(),
            })
        })
        .collect()
}

/// Form part of a variant source name (`charizard-mega-x` -> `mega-x`)
fn form_label<'a>(source_name: &'a str, species_slug: &str) -> &'a str {
    source_name
        .strip_prefix(species_slug)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(source_name)
}

/// Normalize provider attributes; unit conversion happens here and only here
fn assemble_record(
    item: &ItemAttrs,
    id: RecordId,
    display_name: String,
    type_names: &HashMap<String, String>,
) -> Record {
    let mut stats = StatVector::default();
    for entry in &item.stats {
        match entry.stat.name.as_str() {
            "hp" => stats.hp = entry.base_stat,
            "attack" => stats.attack = entry.base_stat,
            "defense" => stats.defense = entry.base_stat,
            "special-attack" => stats.sp_attack = entry.base_stat,
            "special-defense" => stats.sp_defense = entry.base_stat,
            "speed" => stats.speed = entry.base_stat,
            _ => {}
        }
    }

    let types = item
        .types
        .iter()
        .map(|slot| {
            type_names
                .get(&slot.type_ref.name)
                .cloned()
                .unwrap_or_else(|| slot.type_ref.name.clone())
        })
        .collect();

    Record {
        id,
        name: display_name,
        english_name: item.name.clone(),
        category: String::new(),
        stats,
        image_url: item.artwork_url(),
        // decimetres -> metres, hectograms -> kilograms
        height: item.height / 10.0,
        weight: item.weight / 10.0,
        types,
    }
}

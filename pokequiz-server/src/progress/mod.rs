//! Progress tracker
//!
//! Grades answers and applies them to the user's durable progress record.
//! Every answer is one read-modify-write inside [`ProgressStore::update`],
//! which serializes concurrent answers from the same user.

pub mod migration;

use crate::dataset::{Dataset, Record, RecordId};
use crate::db::progress::ProgressStore;
use pokequiz_common::auth::UserId;
use pokequiz_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Per-category answer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub correct: u32,
}

/// Durable per-user progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub total_questions: u32,
    pub total_correct: u32,
    /// Ids whose latest answer was wrong; set semantics, insertion order kept
    pub missed: Vec<RecordId>,
    pub category_stats: BTreeMap<String, CategoryTally>,
}

impl ProgressRecord {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Apply one graded answer
    ///
    /// Totals always move by one. Category counters are skipped for
    /// unclassified records.
    pub fn apply_answer(&mut self, record_id: RecordId, category: Option<&str>, correct: bool) {
        self.total_questions = self.total_questions.saturating_add(1);

        if let Some(category) = category {
            let tally = self.category_stats.entry(category.to_string()).or_default();
            tally.total = tally.total.saturating_add(1);
            if correct {
                tally.correct = tally.correct.saturating_add(1);
            }
        }

        if correct {
            self.total_correct = self.total_correct.saturating_add(1);
            self.missed.retain(|id| *id != record_id);
        } else if !self.missed.contains(&record_id) {
            self.missed.push(record_id);
        }
    }
}

/// Result of grading one submission
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub truth: Arc<Record>,
}

/// Exact match of the submitted name against the record's display name
pub fn grade(dataset: &Dataset, record_id: RecordId, submitted_name: &str) -> Result<AnswerOutcome> {
    let truth = dataset
        .get(record_id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("record {}", record_id)))?;

    Ok(AnswerOutcome {
        correct: submitted_name == truth.name,
        truth,
    })
}

pub struct ProgressTracker {
    store: ProgressStore,
}

impl ProgressTracker {
    pub fn new(store: ProgressStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Grade and record an answer
    ///
    /// An unknown record id fails before any state is touched. A failed
    /// progress write is logged and the grading result is still returned.
    pub async fn record_answer(
        &self,
        dataset: &Dataset,
        user_id: UserId,
        record_id: RecordId,
        submitted_name: &str,
    ) -> Result<AnswerOutcome> {
        let outcome = grade(dataset, record_id, submitted_name)?;
        let category = outcome.truth.category();
        let correct = outcome.correct;

        let update = self
            .store
            .update(user_id, |progress| {
                progress.apply_answer(record_id, category, correct)
            })
            .await;

        if let Err(e) = update {
            error!(user_id, record_id, error = %e, "Failed to record answer");
        }

        Ok(outcome)
    }

    /// Stored progress with legacy category counters reconstructed when absent
    pub async fn get_progress(&self, dataset: &Dataset, user_id: UserId) -> Result<ProgressRecord> {
        let mut progress = self.store.get_or_create(user_id).await?;

        if migration::needs_migration(&progress) {
            info!(user_id, "Reconstructing category stats from missed answers");
            progress.category_stats = migration::migrate(&progress, dataset);
        }

        Ok(progress)
    }
}

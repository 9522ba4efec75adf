//! Quiz service
//!
//! The upward interface of the core: question generation, answer recording,
//! progress reads and the startup dataset load. HTTP handlers only talk to
//! this type.

use crate::dataset::{Dataset, DatasetHandle, DatasetLoader, RecordId};
use crate::progress::{grade, AnswerOutcome, ProgressRecord, ProgressTracker};
use crate::quiz::{self, QuizMode, QuizQuestion};
use pokequiz_common::auth::UserId;
use pokequiz_common::Result;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::info;

pub struct QuizService {
    dataset: DatasetHandle,
    tracker: ProgressTracker,
    loader: DatasetLoader,
}

impl QuizService {
    pub fn new(dataset: DatasetHandle, tracker: ProgressTracker, loader: DatasetLoader) -> Self {
        Self {
            dataset,
            tracker,
            loader,
        }
    }

    /// Current dataset snapshot
    pub async fn dataset(&self) -> Arc<Dataset> {
        self.dataset.snapshot().await
    }

    /// Startup load: cached dataset when complete, otherwise a full rebuild
    pub async fn load_dataset(&self) -> usize {
        let dataset = self.loader.load_or_build().await;
        self.install(dataset).await
    }

    /// Full rebuild from the provider, ignoring the cache
    pub async fn rebuild_dataset(&self) -> usize {
        let dataset = self.loader.rebuild().await;
        self.install(dataset).await
    }

    async fn install(&self, dataset: Dataset) -> usize {
        let records = dataset.len();
        self.dataset.replace(dataset).await;
        info!(records, "Dataset snapshot installed");
        records
    }

    /// Question drawn from one category pool
    pub async fn next_question(&self, category: &str) -> Result<QuizQuestion> {
        let dataset = self.dataset.snapshot().await;
        quiz::next_question(&dataset, QuizMode::Category(category), &mut OsRng)
    }

    /// Question drawn from the user's missed set
    pub async fn next_review_question(&self, user_id: UserId) -> Result<QuizQuestion> {
        let progress = self.tracker.store().get_or_create(user_id).await?;
        let dataset = self.dataset.snapshot().await;
        quiz::next_question(&dataset, QuizMode::Review(&progress.missed), &mut OsRng)
    }

    /// Grade an answer; progress is recorded only for an identified user
    pub async fn record_answer(
        &self,
        user_id: Option<UserId>,
        record_id: RecordId,
        submitted_name: &str,
    ) -> Result<AnswerOutcome> {
        let dataset = self.dataset.snapshot().await;

        match user_id {
            Some(user_id) => {
                self.tracker
                    .record_answer(&dataset, user_id, record_id, submitted_name)
                    .await
            }
            None => grade(&dataset, record_id, submitted_name),
        }
    }

    pub async fn get_progress(&self, user_id: UserId) -> Result<ProgressRecord> {
        let dataset = self.dataset.snapshot().await;
        self.tracker.get_progress(&dataset, user_id).await
    }
}

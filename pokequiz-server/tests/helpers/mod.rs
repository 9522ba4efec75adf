//! Test Helper Utilities
//!
//! Shared utilities for testing pokequiz-server

#![allow(dead_code)]

pub mod log_capture;
pub mod provider;

pub use log_capture::LogCapture;
pub use provider::FakeProvider;

use pokequiz_common::auth::{now_ms, TokenSigner, UserId};
use pokequiz_server::dataset::{
    BlobStore, Classifier, DatasetBuilder, DatasetCache, DatasetHandle, DatasetLoader,
    MemoryBlobStore,
};
use pokequiz_server::db::init_memory_pool;
use pokequiz_server::db::progress::ProgressStore;
use pokequiz_server::progress::ProgressTracker;
use pokequiz_server::provider::SpeciesProvider;
use pokequiz_server::QuizService;
use sqlx::SqlitePool;
use std::sync::Arc;

pub const TEST_SECRET: &str = "test-secret";

/// Two kanto species {A, B}, one johto species and a mega variant
pub fn standard_provider() -> FakeProvider {
    FakeProvider::new()
        .type_name(12, "grass", "くさ")
        .type_name(10, "fire", "ほのお")
        .species(1, "alpha", "A", 1, &["grass"])
        .species(2, "beta", "B", 1, &["fire"])
        .species(152, "gamma", "C", 2, &["grass"])
        .variant(2, "beta-mega", 10050, &["fire"])
}

pub fn loader(provider: Arc<dyn SpeciesProvider>, store: Arc<dyn BlobStore>, max_item_id: u32) -> DatasetLoader {
    DatasetLoader::new(
        DatasetCache::new(store),
        DatasetBuilder::new(provider.clone(), vec!["ja".to_string(), "ja-Hrkt".to_string()])
            .with_max_item_id(max_item_id)
            .with_type_count(18),
        Classifier::new(provider),
    )
}

/// Service over `provider` with an in-memory cache and database; dataset loaded
pub async fn test_service(provider: FakeProvider) -> (Arc<QuizService>, SqlitePool) {
    let pool = init_memory_pool().await.unwrap();
    let service = service_with(
        Arc::new(provider),
        Arc::new(MemoryBlobStore::default()),
        pool.clone(),
    )
    .await;
    (service, pool)
}

pub async fn service_with(
    provider: Arc<dyn SpeciesProvider>,
    store: Arc<dyn BlobStore>,
    pool: SqlitePool,
) -> Arc<QuizService> {
    let service = Arc::new(QuizService::new(
        DatasetHandle::default(),
        ProgressTracker::new(ProgressStore::new(pool)),
        loader(provider, store, 1000),
    ));
    service.load_dataset().await;
    service
}

pub fn signer() -> TokenSigner {
    TokenSigner::new(TEST_SECRET)
}

pub fn bearer(user_id: UserId) -> String {
    format!("Bearer {}", signer().issue(user_id, now_ms()))
}

//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dataset::ALL_CATEGORY;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" while the dataset is empty
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// Records in the current dataset snapshot
    pub records: usize,
    /// Pool size per category, excluding the synthetic "all" pool
    pub categories: BTreeMap<String, usize>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let dataset = state.service.dataset().await;
    let categories = dataset
        .index()
        .sizes()
        .into_iter()
        .filter(|(category, _)| *category != ALL_CATEGORY)
        .map(|(category, size)| (category.to_string(), size))
        .collect();

    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    Json(HealthResponse {
        status: if dataset.is_empty() { "degraded" } else { "ok" },
        module: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        records: dataset.len(),
        categories,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

//! Progress endpoint

use super::auth::RequireUser;
use crate::dataset::RecordId;
use crate::error::ApiResult;
use crate::progress::{CategoryTally, ProgressRecord};
use crate::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use pokequiz_common::auth::UserId;
use serde::Serialize;
use std::collections::BTreeMap;

/// GET /stats response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub user_id: UserId,
    pub total_questions: u32,
    pub total_correct: u32,
    pub wrong_answers: Vec<RecordId>,
    pub regional_stats: BTreeMap<String, CategoryTally>,
}

impl From<ProgressRecord> for StatsResponse {
    fn from(progress: ProgressRecord) -> Self {
        Self {
            user_id: progress.user_id,
            total_questions: progress.total_questions,
            total_correct: progress.total_correct,
            wrong_answers: progress.missed,
            regional_stats: progress.category_stats,
        }
    }
}

/// GET /stats
///
/// Legacy rows get their category counters reconstructed on the fly.
pub async fn get_stats(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> ApiResult<Json<StatsResponse>> {
    let progress = state.service.get_progress(user_id).await?;
    Ok(Json(progress.into()))
}

/// Build stats routes
pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

//! Quiz endpoints
//!
//! GET /quiz    - next question (normal or review mode)
//! POST /answer - grade an answer, recording progress for identified callers

use super::auth::MaybeUser;
use crate::dataset::{Record, RecordId};
use crate::error::{ApiError, ApiResult};
use crate::quiz::QuizQuestion;
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

const DEFAULT_REGION: &str = "kanto";

#[derive(Debug, Deserialize)]
pub struct QuizParams {
    #[serde(default)]
    pub region: Option<String>,
    /// Review mode only for the exact value "true"
    #[serde(default)]
    pub retry: Option<String>,
}

impl QuizParams {
    fn review_mode(&self) -> bool {
        self.retry.as_deref() == Some("true")
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub is_correct: bool,
    pub correct_pokemon: Record,
}

/// GET /quiz?region=<category>&retry=<bool>
pub async fn get_quiz(
    State(state): State<AppState>,
    MaybeUser(user_id): MaybeUser,
    params: Result<Query<QuizParams>, QueryRejection>,
) -> ApiResult<Json<QuizQuestion>> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let question = if params.review_mode() {
        let user_id = user_id.ok_or_else(|| {
            ApiError::Unauthorized("Review mode requires a valid token".to_string())
        })?;
        state.service.next_review_question(user_id).await?
    } else {
        let region = params.region.as_deref().unwrap_or(DEFAULT_REGION);
        state.service.next_question(region).await?
    };

    Ok(Json(question))
}

/// POST /answer
pub async fn post_answer(
    State(state): State<AppState>,
    MaybeUser(user_id): MaybeUser,
    body: Result<Json<AnswerRequest>, JsonRejection>,
) -> ApiResult<Json<AnswerResponse>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if request.id <= 0 {
        return Err(ApiError::BadRequest(format!("Invalid id: {}", request.id)));
    }
    let record_id = RecordId::try_from(request.id)
        .map_err(|_| ApiError::NotFound(format!("record {}", request.id)))?;

    let outcome = state
        .service
        .record_answer(user_id, record_id, &request.name)
        .await?;

    Ok(Json(AnswerResponse {
        is_correct: outcome.correct,
        correct_pokemon: Record::clone(&outcome.truth),
    }))
}

/// Build quiz routes
pub fn quiz_routes() -> Router<AppState> {
    Router::new()
        .route("/quiz", get(get_quiz))
        .route("/answer", post(post_answer))
}

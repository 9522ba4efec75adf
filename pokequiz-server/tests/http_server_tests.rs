//! HTTP Server & Routing Integration Tests

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use helpers::{bearer, signer, standard_provider, test_service};
use http_body_util::BodyExt;
use pokequiz_common::auth::{now_ms, TokenSigner};
use pokequiz_server::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app() -> Router {
    let (service, _pool) = test_service(standard_provider()).await;
    build_router(AppState::new(service, signer()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_reports_records() {
    let app = test_app().await;

    let (status, body) = send(&app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "pokequiz-server");
    assert_eq!(body["records"], 4);
    assert_eq!(body["categories"], json!({"johto": 1, "kanto": 2, "mega": 1}));
}

#[tokio::test]
async fn test_quiz_question_payload() {
    let app = test_app().await;

    let (status, body) = send(&app, get("/quiz?region=kanto", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("name").is_none());
    let options = body["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert!(options.contains(&json!("A")));
    assert!(options.contains(&json!("B")));
    assert!(body["id"] == 1 || body["id"] == 2);
    assert_eq!(body["stats"]["hp"], 45);
    assert!(body["types"].is_array());
}

#[tokio::test]
async fn test_quiz_defaults_to_kanto() {
    let app = test_app().await;

    let (status, body) = send(&app, get("/quiz", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["options"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_region_is_404() {
    let app = test_app().await;

    let (status, body) = send(&app, get("/quiz?region=paldea", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_true_retry_values_serve_normal_questions() {
    let app = test_app().await;

    for uri in ["/quiz?retry=maybe", "/quiz?retry=1", "/quiz?retry=TRUE", "/quiz?retry="] {
        let (status, body) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["options"].as_array().unwrap().len(), 2, "{}", uri);
    }
}

#[tokio::test]
async fn test_retry_requires_token() {
    let app = test_app().await;

    let (status, body) = send(&app, get("/quiz?retry=true", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, get("/quiz?retry=true", Some("Bearer 1.2.bogus"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_retry_with_empty_missed_set_is_404() {
    let app = test_app().await;
    let auth = bearer(5);

    let (status, _) = send(&app, get("/quiz?retry=true", Some(&auth))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_answer_validation() {
    let app = test_app().await;

    let (status, _) = send(&app, post_json("/answer", "{not json", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/answer", r#"{"id": 1}"#, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/answer", r#"{"id": 0, "name": "A"}"#, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, post_json("/answer", r#"{"id": 4040, "name": "A"}"#, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_anonymous_answer_is_graded() {
    let app = test_app().await;

    let (status, body) = send(&app, post_json("/answer", r#"{"id": 1, "name": "A"}"#, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isCorrect"], true);
    assert_eq!(body["correctPokemon"]["id"], 1);
    assert_eq!(body["correctPokemon"]["name"], "A");
    assert_eq!(body["correctPokemon"]["englishName"], "alpha");
    assert_eq!(body["correctPokemon"]["category"], "kanto");
}

#[tokio::test]
async fn test_answer_returns_200_when_progress_store_fails() {
    let (service, pool) = test_service(standard_provider()).await;
    let app = build_router(AppState::new(service, signer()));

    sqlx::query("DROP TABLE user_progress")
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(&app, post_json("/answer", r#"{"id": 2, "name": "B"}"#, Some(&bearer(4)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isCorrect"], true);
    assert_eq!(body["correctPokemon"]["id"], 2);
}

#[tokio::test]
async fn test_invalid_token_on_answer_is_anonymous() {
    let app = test_app().await;
    let forged = format!(
        "Bearer {}",
        TokenSigner::new("other-secret").issue(6, now_ms())
    );

    let (status, body) = send(&app, post_json("/answer", r#"{"id": 1, "name": "B"}"#, Some(&forged))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isCorrect"], false);

    // Nothing was recorded for user 6
    let (_, stats) = send(&app, get("/stats", Some(&bearer(6)))).await;
    assert_eq!(stats["totalQuestions"], 0);
}

#[tokio::test]
async fn test_stats_requires_token() {
    let app = test_app().await;

    let (status, _) = send(&app, get("/stats", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = format!("Bearer {}", signer().with_ttl_ms(-1).issue(3, now_ms()));
    let (status, body) = send(&app, get("/stats", Some(&expired))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Token has expired");
}

#[tokio::test]
async fn test_answer_stats_retry_flow() {
    let app = test_app().await;
    let auth = bearer(9);

    let (status, body) = send(&app, post_json("/answer", r#"{"id": 1, "name": "B"}"#, Some(&auth))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isCorrect"], false);

    let (status, stats) = send(&app, get("/stats", Some(&auth))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["userId"], 9);
    assert_eq!(stats["totalQuestions"], 1);
    assert_eq!(stats["totalCorrect"], 0);
    assert_eq!(stats["wrongAnswers"], json!([1]));
    assert_eq!(stats["regionalStats"]["kanto"], json!({"total": 1, "correct": 0}));

    let (status, question) = send(&app, get("/quiz?retry=true", Some(&auth))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(question["id"], 1);

    let (_, body) = send(&app, post_json("/answer", r#"{"id": 1, "name": "A"}"#, Some(&auth))).await;
    assert_eq!(body["isCorrect"], true);

    let (_, stats) = send(&app, get("/stats", Some(&auth))).await;
    assert_eq!(stats["totalQuestions"], 2);
    assert_eq!(stats["totalCorrect"], 1);
    assert_eq!(stats["wrongAnswers"], json!([]));
    assert_eq!(stats["regionalStats"]["kanto"], json!({"total": 2, "correct": 1}));
}

//! pokequiz-server library interface
//!
//! Exposes the quiz core and the HTTP router for the binary and for
//! integration testing.

pub mod api;
pub mod dataset;
pub mod db;
pub mod error;
pub mod progress;
pub mod provider;
pub mod quiz;
pub mod service;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};
pub use crate::service::QuizService;

use axum::Router;
use chrono::{DateTime, Utc};
use pokequiz_common::auth::TokenSigner;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Quiz core
    pub service: Arc<QuizService>,
    /// Bearer token verifier
    pub signer: Arc<TokenSigner>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: Arc<QuizService>, signer: TokenSigner) -> Self {
        Self {
            service,
            signer: Arc::new(signer),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::quiz_routes())
        .merge(api::stats_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

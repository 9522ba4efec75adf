//! HTTP API handlers for pokequiz-server

pub mod auth;
pub mod health;
pub mod quiz;
pub mod stats;

pub use auth::{MaybeUser, RequireUser};
pub use health::health_routes;
pub use quiz::quiz_routes;
pub use stats::stats_routes;

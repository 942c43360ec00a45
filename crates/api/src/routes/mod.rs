//! Route composition.
//!
//! `api_routes()` assembles everything mounted under `/api/v1`; the
//! health router is mounted at root level by the entrypoint.

use axum::Router;

use crate::state::AppState;

pub mod downloads;
pub mod health;
pub mod maintenance;
pub mod models;
pub mod training;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/training", training::router())
        .nest("/models", models::router())
        .nest("/downloads", downloads::router())
        .nest("/maintenance", maintenance::router())
}

//! Route definitions for model listing and inference.
//!
//! ```text
//! GET  /                             -> list_models
//! POST /{key}/predict                -> predict
//! POST /{key}/explain/{algorithm}    -> explain
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{inference, models};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(models::list_models))
        .route("/{key}/predict", post(inference::predict))
        .route("/{key}/explain/{algorithm}", post(inference::explain))
}

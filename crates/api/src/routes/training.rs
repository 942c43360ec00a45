//! Route definitions for dataset validation and training jobs.
//!
//! ```text
//! GET  /models                       -> base_models
//! POST /dataset                      -> validate_dataset
//! POST /jobs                         -> submit_job
//! GET  /jobs/{code}                  -> job_status
//! POST /jobs/{code}/download         -> init_download
//! GET  /jobs/{code}/download/{id}    -> fetch_download
//! ```

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{downloads, models, training};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/models", get(models::base_models))
        .route("/dataset", post(training::validate_dataset))
        .route("/jobs", post(training::submit_job))
        .route("/jobs/{code}", get(training::job_status))
        .route("/jobs/{code}/download", post(downloads::init_download))
        .route("/jobs/{code}/download/{id}", get(downloads::fetch_download))
        // Dataset uploads are far larger than the axum default body cap.
        .layer(DefaultBodyLimit::max(training::MAX_UPLOAD_BYTES))
}

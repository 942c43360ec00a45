//! Route definitions for manual cleanup triggers.
//!
//! ```text
//! POST /jobs        -> sweep_jobs_now
//! POST /archives    -> sweep_archives_now
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::maintenance;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(maintenance::sweep_jobs_now))
        .route("/archives", post(maintenance::sweep_archives_now))
}

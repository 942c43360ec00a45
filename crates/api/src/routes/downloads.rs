//! Route definitions for download progress polling.
//!
//! ```text
//! GET /{id}    -> poll_download
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::downloads;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(downloads::poll_download))
}

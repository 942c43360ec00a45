//! Handlers for manually triggered cleanup passes.
//!
//! The background loops run the same sweeps on their own schedule;
//! these endpoints exist for operators who want cleanup now.

use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use veridex_core::error::CoreError;
use veridex_core::job::ARCHIVE_TTL_HOURS;

use crate::background::{archive_sweep, job_sweep};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /maintenance/jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct JobSweepResult {
    pub removed_jobs: usize,
}

/// Remove expired jobs immediately.
pub async fn sweep_jobs_now(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let store = state.store.clone();
    let removed = tokio::task::spawn_blocking(move || job_sweep::sweep_jobs(&store, Utc::now()))
        .await
        .map_err(|err| AppError::InternalError(format!("sweep task failed: {err}")))?
        .map_err(CoreError::Io)?;
    Ok(Json(DataResponse {
        data: JobSweepResult { removed_jobs: removed },
    }))
}

// ---------------------------------------------------------------------------
// POST /maintenance/archives
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ArchiveSweepResult {
    pub removed_archives: usize,
    pub reaped_progress_records: usize,
}

/// Remove old export archives and stale progress records immediately.
pub async fn sweep_archives_now(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let layout = state.store.layout().clone();
    let ttl = Duration::from_secs(ARCHIVE_TTL_HOURS as u64 * 3600);
    let removed = tokio::task::spawn_blocking(move || archive_sweep::sweep_archives(&layout, ttl))
        .await
        .map_err(|err| AppError::InternalError(format!("sweep task failed: {err}")))?
        .map_err(CoreError::Io)?;
    let reaped = state.progress.reap_stale(Utc::now());
    Ok(Json(DataResponse {
        data: ArchiveSweepResult {
            removed_archives: removed,
            reaped_progress_records: reaped,
        },
    }))
}

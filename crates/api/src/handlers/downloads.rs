//! Handlers for model download initiation, delivery, and polling.
//!
//! A download is a two-step flow: `POST .../download` creates a
//! progress record and returns its id, then `GET .../download/{id}`
//! builds (or reuses) the archive and streams it. A separate endpoint
//! polls progress by id. Delivery failures use an ad-hoc error body
//! carrying the download id so clients can correlate with their poll.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use veridex_core::codes;
use veridex_core::error::CoreError;
use veridex_core::job::JobStatus;
use veridex_core::progress::DownloadStatus;

use crate::archive;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /training/jobs/{code}/download
// ---------------------------------------------------------------------------

/// Start a download of a completed job's model. Returns the progress
/// record, including the id used for delivery and polling.
pub async fn init_download(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let code = codes::validate_code(&code)?;
    let job = state.store.read(&code)?;

    if job.is_expired(Utc::now()) {
        return Err(CoreError::Expired { entity: "job", code }.into());
    }
    if job.status != JobStatus::Completed || !state.store.is_completed(&code) {
        return Err(CoreError::NotFound {
            entity: "model",
            code,
        }
        .into());
    }

    let record = state.progress.init(&code);
    Ok(Json(DataResponse { data: record }))
}

// ---------------------------------------------------------------------------
// GET /training/jobs/{code}/download/{id}
// ---------------------------------------------------------------------------

/// Build the archive if needed and stream it.
pub async fn fetch_download(
    State(state): State<AppState>,
    Path((code, id)): Path<(String, Uuid)>,
) -> Response {
    match serve_download(&state, &code, id).await {
        Ok(response) => response,
        Err((status, message)) => {
            state.progress.fail(id, &message);
            let body = json!({ "error": message, "download_id": id });
            (status, Json(body)).into_response()
        }
    }
}

async fn serve_download(
    state: &AppState,
    raw_code: &str,
    id: Uuid,
) -> Result<Response, (StatusCode, String)> {
    let code = codes::validate_code(raw_code)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;

    let record = state.progress.get(id);
    if record.map(|r| r.job_code != code).unwrap_or(true) {
        return Err((
            StatusCode::NOT_FOUND,
            format!("download not found: {id}"),
        ));
    }

    state
        .progress
        .update(id, DownloadStatus::Validating, 5, "Validating job");
    let job = state
        .store
        .read(&code)
        .map_err(|_| (StatusCode::NOT_FOUND, format!("job not found: {code}")))?;
    if job.is_expired(Utc::now()) {
        return Err((StatusCode::GONE, format!("job {code} has expired")));
    }

    state
        .progress
        .update(id, DownloadStatus::Checking, 10, "Checking model files");
    if !state.store.is_completed(&code) {
        return Err((
            StatusCode::NOT_FOUND,
            format!("job {code} has no trained model"),
        ));
    }

    state
        .progress
        .update(id, DownloadStatus::Creating, 15, "Creating archive");
    let archive_path = {
        let layout = state.store.layout().clone();
        let progress = state.progress.clone();
        let build_code = code.clone();
        tokio::task::spawn_blocking(move || {
            archive::build_archive(&layout, &build_code, &|pct| {
                progress.update(
                    id,
                    DownloadStatus::Creating,
                    pct,
                    "Compressing model files",
                );
            })
        })
        .await
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("archive task failed: {err}"),
            )
        })?
        .map_err(|err| {
            tracing::error!(code, error = %err, "Archive build failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("could not build archive: {err}"),
            )
        })?
    };

    let size = tokio::fs::metadata(&archive_path)
        .await
        .map(|m| m.len())
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("could not stat archive: {err}"),
            )
        })?;

    state
        .progress
        .update(id, DownloadStatus::Sending, 99, "Sending archive");
    let file = tokio::fs::File::open(&archive_path).await.map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("could not open archive: {err}"),
        )
    })?;
    let body = Body::from_stream(ReaderStream::new(file));

    // The record tracks archive readiness; the byte transfer itself is
    // the client's to observe.
    state
        .progress
        .update(id, DownloadStatus::Completed, 100, "Download complete");

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    let disposition = format!("attachment; filename=\"custom_model_{code}.zip\"");
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&size.to_string()) {
        headers.insert("x-archive-size", value);
    }
    if let Ok(value) = HeaderValue::from_str(&code) {
        headers.insert("x-model-code", value);
    }
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        headers.insert("x-download-id", value);
    }
    Ok(response)
}

// ---------------------------------------------------------------------------
// GET /downloads/{id}
// ---------------------------------------------------------------------------

/// Poll a download's progress. Terminal records past their grace
/// period answer `404` as if they never existed.
pub async fn poll_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    match state.progress.poll(id, Utc::now()) {
        Some(record) => Ok(Json(DataResponse { data: record })),
        None => Err(CoreError::NotFound {
            entity: "download",
            code: id.to_string(),
        }
        .into()),
    }
}

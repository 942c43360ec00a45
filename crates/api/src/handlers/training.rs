//! Handlers for dataset validation and training jobs.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use veridex_core::dataset;
use veridex_core::error::CoreError;
use veridex_core::job::{Job, JobStatus, TrainingConfig};
use veridex_core::codes;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::trainer;

/// Largest accepted dataset upload.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Parts extracted from a training upload.
struct Upload {
    file: Vec<u8>,
    config: Option<String>,
}

/// Pull the `file` and optional `config` parts out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> AppResult<Upload> {
    let mut file = None;
    let mut config = None;
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let name_ok = field
                    .file_name()
                    .map(|n| n.to_ascii_lowercase().ends_with(".csv"))
                    .unwrap_or(true);
                if !name_ok {
                    return Err(CoreError::Validation(
                        "File must be a CSV (.csv)".to_string(),
                    )
                    .into());
                }
                file = Some(field.bytes().await?.to_vec());
            }
            Some("config") => {
                config = Some(field.text().await?);
            }
            _ => {}
        }
    }
    let file = file.ok_or_else(|| AppError::BadRequest("Missing file part".to_string()))?;
    Ok(Upload { file, config })
}

// ---------------------------------------------------------------------------
// POST /training/dataset
// ---------------------------------------------------------------------------

/// Validate an uploaded CSV against the training contract without
/// creating a job. Returns a dataset summary on success.
pub async fn validate_dataset(multipart: Multipart) -> AppResult<impl IntoResponse> {
    let upload = read_upload(multipart).await?;
    let parsed = dataset::parse_csv(&upload.file)?;
    let summary = dataset::validate(&parsed)?;
    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// POST /training/jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_code: String,
    pub status: JobStatus,
}

/// Create a training job from an uploaded dataset and configuration,
/// then run it detached. Responds `202 Accepted` with the job code.
pub async fn submit_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let upload = read_upload(multipart).await?;
    let config_json = upload
        .config
        .ok_or_else(|| AppError::BadRequest("Missing config part".to_string()))?;
    let config: TrainingConfig = serde_json::from_str(&config_json)
        .map_err(|err| AppError::BadRequest(format!("Invalid config: {err}")))?;
    config.validate()?;

    let parsed = dataset::parse_csv(&upload.file)?;
    dataset::validate(&parsed)?;
    let examples = dataset::clean(&parsed);

    let code = codes::generate_code(|candidate| state.store.exists(candidate))?;
    let job = Job::new(code.clone(), &config, Utc::now());
    state.store.create(&job)?;

    trainer::spawn_training(
        state.store.clone(),
        state.backend.clone(),
        state.resolver.clone(),
        job,
        examples,
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitResponse {
                job_code: code,
                status: JobStatus::Training,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /training/jobs/{code}
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    /// Whether the completion marker is present (the model is servable).
    pub completed: bool,
    pub remaining_time: String,
}

/// Current state of a training job. Expired jobs answer `410 Gone`.
pub async fn job_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let code = codes::validate_code(&code)?;
    let job = state.store.read(&code)?;

    let now = Utc::now();
    if job.is_expired(now) {
        return Err(CoreError::Expired { entity: "job", code }.into());
    }

    let completed = state.store.is_completed(&code);
    let remaining_time = job.remaining_time(now);
    Ok(Json(DataResponse {
        data: JobView {
            job,
            completed,
            remaining_time,
        },
    }))
}

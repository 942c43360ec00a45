//! Handlers for model catalogs.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use veridex_core::catalog;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /training/models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct BaseModelInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// Base models available for fine-tuning.
pub async fn base_models() -> Json<DataResponse<Vec<BaseModelInfo>>> {
    let models = catalog::BASE_MODELS
        .iter()
        .map(|(id, name)| BaseModelInfo { id, name })
        .collect();
    Json(DataResponse { data: models })
}

// ---------------------------------------------------------------------------
// GET /models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    /// Key to use in predict/explain URLs.
    pub key: String,
    pub name: String,
    /// `pretrained` or `custom`.
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<String>,
}

/// Every model the service can currently serve: pretrained models from
/// the registry plus completed, unexpired fine-tuning jobs.
pub async fn list_models(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut models = Vec::new();

    let pretrained_dir = state.store.layout().pretrained_dir();
    if let Ok(entries) = std::fs::read_dir(&pretrained_dir) {
        for entry in entries.flatten() {
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                models.push(ModelInfo {
                    key: name.to_string(),
                    name: name.to_string(),
                    kind: "pretrained",
                    base_model: None,
                    accuracy: None,
                    created_at: None,
                    expires_in: None,
                });
            }
        }
    }

    let now = Utc::now();
    for code in state.store.list_codes()? {
        if !state.store.is_completed(&code) {
            continue;
        }
        let Some(job) = state.store.try_read(&code) else {
            continue;
        };
        if job.is_expired(now) {
            continue;
        }
        let expires_in = job.remaining_time(now);
        models.push(ModelInfo {
            key: code,
            name: job.name,
            kind: "custom",
            base_model: Some(job.base_model),
            accuracy: job.accuracy,
            created_at: Some(job.created_at),
            expires_in: Some(expires_in),
        });
    }

    models.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(Json(DataResponse { data: models }))
}

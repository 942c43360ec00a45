//! Handlers for prediction and explanation.
//!
//! A model key is either a six-character job code (a fine-tuned model,
//! which must be completed and unexpired) or the name of a pretrained
//! model under the registry directory. Built models and explainers are
//! cached; concurrent first requests share one build.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use veridex_core::error::CoreError;
use veridex_core::{codes, input, labels};
use veridex_engine::cache;
use veridex_engine::device::DEFAULT_MODEL_MEMORY_MB;
use veridex_engine::explain::{
    ExplainAlgorithm, LimeExplainer, PredictFn, ShapExplainer, TokenImportance,
};
use veridex_engine::resolver::sanitize_id;
use veridex_engine::{Device, InferenceObject};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

// ---------------------------------------------------------------------------
// Model resolution
// ---------------------------------------------------------------------------

/// Resolve a model key to `(cache key, model directory)`.
fn resolve_model(state: &AppState, key: &str) -> AppResult<(String, PathBuf)> {
    if let Ok(code) = codes::validate_code(key) {
        if state.store.exists(&code) {
            let job = state.store.read(&code)?;
            if job.is_expired(Utc::now()) {
                return Err(CoreError::Expired { entity: "job", code }.into());
            }
            if !state.store.is_completed(&code) {
                return Err(CoreError::Validation(format!(
                    "Model {code} is not ready: training has not completed"
                ))
                .into());
            }
            let dir = state.store.layout().model_dir(&code);
            return Ok((format!("custom_{code}"), dir));
        }
    }

    let dir = state.store.layout().pretrained_dir().join(sanitize_id(key));
    if dir.is_dir() {
        return Ok((sanitize_id(key), dir));
    }
    Err(CoreError::NotFound {
        entity: "model",
        code: key.to_string(),
    }
    .into())
}

/// Load (or fetch from cache) the classifier for a resolved model.
async fn load_classifier(
    state: &AppState,
    cache_key: &str,
    dir: &FsPath,
) -> AppResult<Arc<InferenceObject>> {
    let backend = state.backend.clone();
    let dir = dir.to_path_buf();
    let object = state
        .cache
        .get_or_create(&cache::classifier_key(cache_key), || async move {
            tokio::task::spawn_blocking(move || {
                let device = Device::for_build(DEFAULT_MODEL_MEMORY_MB);
                let model = backend.load(&dir, device)?;
                Ok(InferenceObject::Classifier(model))
            })
            .await
            .map_err(|err| CoreError::Internal(format!("model load task failed: {err}")))?
        })
        .await?;
    Ok(object)
}

// ---------------------------------------------------------------------------
// POST /models/{key}/predict
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Probabilities {
    pub deceptive: f64,
    pub truthful: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: u8,
    pub label_name: &'static str,
    /// Probability of the predicted label.
    pub score: f64,
    pub probabilities: Probabilities,
}

/// Classify a text with the named model.
pub async fn predict(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<TextRequest>,
) -> AppResult<impl IntoResponse> {
    let text = input::validate_text(&request.text)?;
    let (cache_key, dir) = resolve_model(&state, &key)?;
    let object = load_classifier(&state, &cache_key, &dir).await?;

    let InferenceObject::Classifier(model) = object.as_ref() else {
        return Err(AppError::InternalError(
            "cache entry is not a classifier".to_string(),
        ));
    };
    let probs = model.probabilities(&text)?;
    let prediction = model.classify(&text)?;

    Ok(Json(DataResponse {
        data: PredictResponse {
            label: prediction.label,
            label_name: labels::label_name(prediction.label),
            score: prediction.score,
            probabilities: Probabilities {
                deceptive: probs[0],
                truthful: probs[1],
            },
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /models/{key}/explain/{algorithm}
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub algorithm: String,
    /// Most influential tokens, strongest first.
    pub tokens: Vec<TokenImportance>,
}

/// Explain a prediction with LIME or the SHAP-style explainer.
pub async fn explain(
    State(state): State<AppState>,
    Path((key, algorithm)): Path<(String, String)>,
    Json(request): Json<TextRequest>,
) -> AppResult<impl IntoResponse> {
    let algorithm: ExplainAlgorithm = algorithm.parse()?;
    let text = input::validate_text(&request.text)?;
    let (cache_key, dir) = resolve_model(&state, &key)?;
    let classifier = load_classifier(&state, &cache_key, &dir).await?;

    let predict: PredictFn = {
        let classifier = classifier.clone();
        Arc::new(move |text: &str| match classifier.as_ref() {
            InferenceObject::Classifier(model) => model.probabilities(text),
            _ => Err(CoreError::Internal(
                "cache entry is not a classifier".to_string(),
            )),
        })
    };

    let explainer_key = match algorithm {
        ExplainAlgorithm::Lime => cache::lime_key(&cache_key),
        ExplainAlgorithm::Shap => cache::shap_key(&cache_key),
    };
    let explainer = state
        .cache
        .get_or_create(&explainer_key, || async move {
            Ok(match algorithm {
                ExplainAlgorithm::Lime => InferenceObject::Lime(LimeExplainer::new(predict)),
                ExplainAlgorithm::Shap => InferenceObject::Shap(ShapExplainer::new(predict)),
            })
        })
        .await?;

    // LIME in particular runs hundreds of predictions; keep it off the
    // async workers.
    let tokens = {
        let explainer = explainer.clone();
        let text = text.clone();
        tokio::task::spawn_blocking(move || match explainer.as_ref() {
            InferenceObject::Lime(lime) => lime.explain(&text),
            InferenceObject::Shap(shap) => shap.explain(&text),
            _ => Err(CoreError::Internal(
                "cache entry is not an explainer".to_string(),
            )),
        })
        .await
        .map_err(|err| AppError::InternalError(format!("explain task failed: {err}")))??
    };

    Ok(Json(DataResponse {
        data: ExplainResponse {
            algorithm: algorithm.to_string(),
            tokens,
        },
    }))
}

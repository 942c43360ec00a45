use std::sync::Arc;

use veridex_engine::{BaseModelResolver, ClassifierBackend, InferenceCache};
use veridex_store::JobStore;

use crate::config::ServerConfig;
use crate::progress::ProgressStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job record store over the data directory.
    pub store: JobStore,
    /// Exactly-once cache of built models and explainers.
    pub cache: Arc<InferenceCache>,
    /// Model family used for training and inference.
    pub backend: Arc<dyn ClassifierBackend>,
    /// Base-model resolver.
    pub resolver: Arc<dyn BaseModelResolver>,
    /// In-memory download progress records.
    pub progress: Arc<ProgressStore>,
}

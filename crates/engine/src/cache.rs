//! In-memory cache of built inference objects.
//!
//! Models and explainers are expensive to build, so each cache key is
//! built at most once no matter how many requests race on it. A failed
//! build is not cached; the next request retries it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::debug;
use veridex_core::error::CoreResult;

use crate::backend::Model;
use crate::explain::{LimeExplainer, ShapExplainer};

/// A cached, ready-to-serve inference object.
pub enum InferenceObject {
    Classifier(Box<dyn Model>),
    Lime(LimeExplainer),
    Shap(ShapExplainer),
}

impl InferenceObject {
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceObject::Classifier(_) => "classifier",
            InferenceObject::Lime(_) => "lime",
            InferenceObject::Shap(_) => "shap",
        }
    }
}

// ---------------------------------------------------------------------
// Cache keys
// ---------------------------------------------------------------------

pub fn classifier_key(model: &str) -> String {
    model.to_string()
}

pub fn lime_key(model: &str) -> String {
    format!("{model}_lime")
}

pub fn shap_key(model: &str) -> String {
    format!("{model}_shap")
}

// ---------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------

/// Keyed cache with exactly-once builds.
///
/// Each key owns a `OnceCell`; concurrent callers for the same key all
/// await the one in-flight build instead of racing their own.
#[derive(Default)]
pub struct InferenceCache {
    cells: RwLock<HashMap<String, Arc<OnceCell<Arc<InferenceObject>>>>>,
}

impl InferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object for `key`, if it has already been built.
    pub async fn lookup(&self, key: &str) -> Option<Arc<InferenceObject>> {
        let cells = self.cells.read().await;
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// The object for `key`, building it with `build` if needed.
    pub async fn get_or_create<F, Fut>(&self, key: &str, build: F) -> CoreResult<Arc<InferenceObject>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<InferenceObject>>,
    {
        let cell = {
            let cells = self.cells.read().await;
            cells.get(key).cloned()
        };
        let cell = match cell {
            Some(cell) => cell,
            None => {
                let mut cells = self.cells.write().await;
                cells.entry(key.to_string()).or_default().clone()
            }
        };

        let object = cell
            .get_or_try_init(|| async {
                debug!(key, "building inference object");
                build().await.map(Arc::new)
            })
            .await?;
        Ok(object.clone())
    }

    /// Keys with a completed build, for diagnostics.
    pub async fn keys(&self) -> Vec<String> {
        let cells = self.cells.read().await;
        let mut keys: Vec<String> = cells
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

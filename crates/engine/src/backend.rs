//! Backend seam between the service and concrete model families.

use std::path::Path;

use veridex_core::dataset::Example;
use veridex_core::error::CoreResult;

use crate::device::Device;

/// Hyperparameters passed through to a backend's fit loop.
#[derive(Debug, Clone, Copy)]
pub struct FitParams {
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
}

/// What a completed fit reports back.
#[derive(Debug, Clone, Copy)]
pub struct FitMetrics {
    /// Validation accuracy; absent when no validation set was provided.
    pub accuracy: Option<f64>,
}

/// A single classification outcome.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: u8,
    /// Probability of the predicted label, in `[0.5, 1.0]`.
    pub score: f64,
}

/// A trained (or trainable) binary text classifier.
///
/// Methods are synchronous; callers run long operations such as [`fit`]
/// under `spawn_blocking`.
///
/// [`fit`]: Model::fit
pub trait Model: Send + Sync {
    /// Train on `train`, evaluating on `val` if non-empty.
    fn fit(&mut self, train: &[Example], val: &[Example], params: &FitParams)
        -> CoreResult<FitMetrics>;

    /// Class probabilities `[p(deceptive), p(truthful)]`, summing to 1.
    fn probabilities(&self, text: &str) -> CoreResult<[f64; 2]>;

    /// Predicted label with its probability.
    fn classify(&self, text: &str) -> CoreResult<Prediction> {
        let probs = self.probabilities(text)?;
        let (label, score) = if probs[1] >= probs[0] {
            (veridex_core::labels::LABEL_TRUTHFUL, probs[1])
        } else {
            (veridex_core::labels::LABEL_DECEPTIVE, probs[0])
        };
        Ok(Prediction { label, score })
    }

    /// Persist the model into `dir` so [`ClassifierBackend::load`] can
    /// restore it.
    fn save(&self, dir: &Path) -> CoreResult<()>;
}

/// Factory for models of one family.
pub trait ClassifierBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fresh, untrained model, optionally warm-started from a base
    /// model directory.
    fn create(&self, base: Option<&Path>, device: Device) -> CoreResult<Box<dyn Model>>;

    /// Restore a model previously written by [`Model::save`].
    fn load(&self, dir: &Path, device: Device) -> CoreResult<Box<dyn Model>>;
}

impl FitParams {
    pub fn from_job(job: &veridex_core::job::Job) -> Self {
        Self {
            epochs: job.epochs,
            batch_size: job.batch_size,
            learning_rate: job.learning_rate,
        }
    }
}

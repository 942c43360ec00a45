//! Hashed bag-of-words linear classifier, the default backend.
//!
//! Texts are tokenized on non-alphanumeric boundaries, each token is
//! hashed into a fixed feature space, and a logistic-regression head is
//! trained with mini-batch gradient descent. Deterministic end to end:
//! the feature hash is fixed and the shuffle is seeded.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use veridex_core::dataset::Example;
use veridex_core::error::{CoreError, CoreResult};

use crate::backend::{ClassifierBackend, FitMetrics, FitParams, Model};
use crate::device::Device;

/// Size of the hashed feature space.
pub const FEATURE_DIM: usize = 1 << 15;
/// File the model persists itself to inside its directory.
pub const MODEL_FILE: &str = "model.json";
/// Seed for the per-epoch shuffle.
const TRAIN_SEED: u64 = 7;
/// Configured learning rates follow transformer conventions (around
/// 2e-5), orders of magnitude below what plain logistic regression
/// needs. Scale them up rather than surprising callers with a second
/// set of ranges.
const LR_SCALE: f64 = 1e4;

#[derive(Serialize, Deserialize)]
struct SavedModel {
    dim: usize,
    weights: Vec<f64>,
    bias: f64,
}

/// Binary logistic regression over hashed token counts. The positive
/// class is `truthful`.
pub struct LinearModel {
    weights: Vec<f64>,
    bias: f64,
}

impl LinearModel {
    /// An untrained model with zeroed weights.
    pub fn fresh() -> Self {
        Self {
            weights: vec![0.0; FEATURE_DIM],
            bias: 0.0,
        }
    }

    fn from_file(path: &Path) -> CoreResult<Self> {
        let bytes = fs::read(path)?;
        let saved: SavedModel = serde_json::from_slice(&bytes)
            .map_err(|err| CoreError::Internal(format!("corrupt model file: {err}")))?;
        if saved.dim != FEATURE_DIM || saved.weights.len() != FEATURE_DIM {
            return Err(CoreError::Internal(format!(
                "model dimension mismatch: expected {FEATURE_DIM}, found {}",
                saved.dim
            )));
        }
        Ok(Self {
            weights: saved.weights,
            bias: saved.bias,
        })
    }

    fn score(&self, features: &[(usize, f64)]) -> f64 {
        let z: f64 = self.bias
            + features
                .iter()
                .map(|(idx, count)| self.weights[*idx] * count)
                .sum::<f64>();
        sigmoid(z)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// FNV-1a, folded into the feature space.
fn feature_index(token: &str) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash as usize) % FEATURE_DIM
}

/// Sparse hashed token counts for one text.
fn featurize(text: &str) -> Vec<(usize, f64)> {
    let mut features: Vec<(usize, f64)> = Vec::new();
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let idx = feature_index(token);
        match features.iter_mut().find(|(i, _)| *i == idx) {
            Some((_, count)) => *count += 1.0,
            None => features.push((idx, 1.0)),
        }
    }
    features
}

impl Model for LinearModel {
    fn fit(
        &mut self,
        train: &[Example],
        val: &[Example],
        params: &FitParams,
    ) -> CoreResult<FitMetrics> {
        if train.is_empty() {
            return Err(CoreError::Validation(
                "Cannot train on an empty dataset".to_string(),
            ));
        }

        let featurized: Vec<(Vec<(usize, f64)>, f64)> = train
            .iter()
            .map(|ex| (featurize(&ex.text), ex.label as f64))
            .collect();

        let lr = params.learning_rate * LR_SCALE;
        let batch = params.batch_size.max(1) as usize;
        let mut rng = StdRng::seed_from_u64(TRAIN_SEED);
        let mut order: Vec<usize> = (0..featurized.len()).collect();

        for epoch in 0..params.epochs {
            order.shuffle(&mut rng);
            let mut loss = 0.0;
            for chunk in order.chunks(batch) {
                let scale = lr / chunk.len() as f64;
                for &i in chunk {
                    let (features, y) = &featurized[i];
                    let p = self.score(features);
                    let err = p - y;
                    for (idx, count) in features {
                        self.weights[*idx] -= scale * err * count;
                    }
                    self.bias -= scale * err;
                    loss -= y * p.max(1e-12).ln() + (1.0 - y) * (1.0 - p).max(1e-12).ln();
                }
            }
            debug!(epoch, loss = loss / featurized.len() as f64, "epoch finished");
        }

        let accuracy = if val.is_empty() {
            None
        } else {
            let correct = val
                .iter()
                .filter(|ex| {
                    let p = self.score(&featurize(&ex.text));
                    let predicted = if p >= 0.5 { 1 } else { 0 };
                    predicted == ex.label
                })
                .count();
            Some(correct as f64 / val.len() as f64)
        };

        Ok(FitMetrics { accuracy })
    }

    fn probabilities(&self, text: &str) -> CoreResult<[f64; 2]> {
        let p_truthful = self.score(&featurize(text));
        Ok([1.0 - p_truthful, p_truthful])
    }

    fn save(&self, dir: &Path) -> CoreResult<()> {
        fs::create_dir_all(dir)?;
        let saved = SavedModel {
            dim: FEATURE_DIM,
            weights: self.weights.clone(),
            bias: self.bias,
        };
        let json = serde_json::to_vec(&saved)
            .map_err(|err| CoreError::Internal(format!("serialize model: {err}")))?;
        fs::write(dir.join(MODEL_FILE), json)?;
        Ok(())
    }
}

/// Backend producing [`LinearModel`]s.
#[derive(Debug, Default, Clone)]
pub struct LinearBackend;

impl ClassifierBackend for LinearBackend {
    fn name(&self) -> &'static str {
        "linear-bow"
    }

    fn create(&self, base: Option<&Path>, device: Device) -> CoreResult<Box<dyn Model>> {
        debug!(?device, ?base, "creating linear model");
        match base {
            // Warm-start from a base model that carries linear weights;
            // anything else starts from zero.
            Some(dir) if dir.join(MODEL_FILE).is_file() => {
                Ok(Box::new(LinearModel::from_file(&dir.join(MODEL_FILE))?))
            }
            _ => Ok(Box::new(LinearModel::fresh())),
        }
    }

    fn load(&self, dir: &Path, device: Device) -> CoreResult<Box<dyn Model>> {
        debug!(?device, ?dir, "loading linear model");
        let path = dir.join(MODEL_FILE);
        if !path.is_file() {
            return Err(CoreError::NotFound {
                entity: "model",
                code: dir.display().to_string(),
            });
        }
        Ok(Box::new(LinearModel::from_file(&path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (Vec<Example>, Vec<Example>) {
        let truthful = [
            "a genuine honest account of the stay",
            "the review is sincere and honest",
            "an accurate genuine description",
            "honest feedback from a real guest",
            "sincere and accurate trip report",
            "a real honest experience",
            "genuine praise from an actual visitor",
            "accurate honest summary of the room",
        ];
        let deceptive = [
            "a fraudulent fake review planted on purpose",
            "completely fabricated fake praise",
            "a fake misleading account",
            "fraudulent exaggerated fabricated claims",
            "fake review written by the owner",
            "misleading fabricated description",
            "a fraudulent planted endorsement",
            "fake misleading planted feedback",
        ];
        let mut train = Vec::new();
        for t in &truthful[..6] {
            train.push(Example { text: t.to_string(), label: 1 });
        }
        for d in &deceptive[..6] {
            train.push(Example { text: d.to_string(), label: 0 });
        }
        let mut val = Vec::new();
        for t in &truthful[6..] {
            val.push(Example { text: t.to_string(), label: 1 });
        }
        for d in &deceptive[6..] {
            val.push(Example { text: d.to_string(), label: 0 });
        }
        (train, val)
    }

    fn params() -> FitParams {
        FitParams {
            epochs: 5,
            batch_size: 4,
            learning_rate: 2e-5,
        }
    }

    #[test]
    fn fit_separates_distinct_vocabularies() {
        let (train, val) = dataset();
        let mut model = LinearModel::fresh();
        let metrics = model.fit(&train, &val, &params()).unwrap();
        assert!(metrics.accuracy.unwrap() >= 0.9);

        let prediction = model.classify("an honest genuine sincere review").unwrap();
        assert_eq!(prediction.label, 1);
        let prediction = model.classify("a fake fraudulent fabricated review").unwrap();
        assert_eq!(prediction.label, 0);
    }

    #[test]
    fn fit_without_validation_reports_no_accuracy() {
        let (train, _) = dataset();
        let mut model = LinearModel::fresh();
        let metrics = model.fit(&train, &[], &params()).unwrap();
        assert!(metrics.accuracy.is_none());
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (train, _) = dataset();
        let mut model = LinearModel::fresh();
        model.fit(&train, &[], &params()).unwrap();
        let probs = model.probabilities("some arbitrary text").unwrap();
        assert!((probs[0] + probs[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (train, _) = dataset();
        let mut model = LinearModel::fresh();
        model.fit(&train, &[], &params()).unwrap();
        model.save(dir.path()).unwrap();

        let backend = LinearBackend;
        let loaded = backend.load(dir.path(), Device::Cpu).unwrap();
        let text = "an honest genuine review";
        assert_eq!(
            model.probabilities(text).unwrap(),
            loaded.probabilities(text).unwrap()
        );
    }

    #[test]
    fn load_of_missing_model_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LinearBackend;
        assert!(matches!(
            backend.load(dir.path(), Device::Cpu),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn fit_is_deterministic() {
        let (train, val) = dataset();
        let mut a = LinearModel::fresh();
        let mut b = LinearModel::fresh();
        let ma = a.fit(&train, &val, &params()).unwrap();
        let mb = b.fit(&train, &val, &params()).unwrap();
        assert_eq!(ma.accuracy, mb.accuracy);
        assert_eq!(
            a.probabilities("honest text").unwrap(),
            b.probabilities("honest text").unwrap()
        );
    }
}

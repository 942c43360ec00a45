//! Token-level prediction explanations.
//!
//! Both explainers work against an opaque prediction function, so they
//! serve any backend. LIME perturbs the text by masking random token
//! subsets and measures how the predicted-class probability moves with
//! each token's presence; the SHAP-style explainer uses leave-one-out
//! deltas. Both are seeded and deterministic for a given text.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use veridex_core::error::{CoreError, CoreResult};

/// How many tokens an explanation reports, ranked by influence.
pub const TOP_FEATURES: usize = 10;
/// Number of masked perturbations LIME evaluates.
pub const LIME_SAMPLES: usize = 500;
/// Seed for LIME's mask sampling.
const LIME_SEED: u64 = 1337;

/// Class probabilities for one text, `[p(deceptive), p(truthful)]`.
pub type PredictFn = Arc<dyn Fn(&str) -> CoreResult<[f64; 2]> + Send + Sync>;

/// One token's contribution to the predicted class.
#[derive(Debug, Clone, Serialize)]
pub struct TokenImportance {
    pub token: String,
    /// Positive pushes toward the predicted class, negative away.
    pub weight: f64,
}

/// Explanation algorithm requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainAlgorithm {
    Lime,
    Shap,
}

impl FromStr for ExplainAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lime" => Ok(ExplainAlgorithm::Lime),
            "shap" => Ok(ExplainAlgorithm::Shap),
            other => Err(CoreError::Validation(format!(
                "Unknown explanation algorithm: {other}. Supported: lime, shap"
            ))),
        }
    }
}

impl fmt::Display for ExplainAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplainAlgorithm::Lime => write!(f, "lime"),
            ExplainAlgorithm::Shap => write!(f, "shap"),
        }
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

fn predicted_class(probs: [f64; 2]) -> usize {
    if probs[1] >= probs[0] {
        1
    } else {
        0
    }
}

/// Rank token weights and keep the `TOP_FEATURES` most influential.
fn top_features(tokens: &[&str], weights: Vec<f64>) -> Vec<TokenImportance> {
    let mut ranked: Vec<TokenImportance> = tokens
        .iter()
        .zip(weights)
        .map(|(token, weight)| TokenImportance {
            token: token.to_string(),
            weight,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.weight
            .abs()
            .partial_cmp(&a.weight.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(TOP_FEATURES);
    ranked
}

// ---------------------------------------------------------------------
// LIME
// ---------------------------------------------------------------------

/// Perturbation-based explainer.
pub struct LimeExplainer {
    predict: PredictFn,
    samples: usize,
}

impl LimeExplainer {
    pub fn new(predict: PredictFn) -> Self {
        Self {
            predict,
            samples: LIME_SAMPLES,
        }
    }

    pub fn explain(&self, text: &str) -> CoreResult<Vec<TokenImportance>> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let class = predicted_class((self.predict)(text)?);
        let mut rng = StdRng::seed_from_u64(LIME_SEED);

        // Per-token sums of the predicted-class probability, split by
        // whether the token was kept in the perturbed sample.
        let mut present_sum = vec![0.0f64; tokens.len()];
        let mut present_n = vec![0usize; tokens.len()];
        let mut absent_sum = vec![0.0f64; tokens.len()];
        let mut absent_n = vec![0usize; tokens.len()];

        let mut mask = vec![true; tokens.len()];
        for _ in 0..self.samples {
            for kept in mask.iter_mut() {
                *kept = rng.random_bool(0.5);
            }
            // An all-masked sample says nothing about any token.
            if mask.iter().all(|kept| !kept) {
                continue;
            }
            let perturbed: String = tokens
                .iter()
                .zip(&mask)
                .filter(|(_, kept)| **kept)
                .map(|(token, _)| *token)
                .collect::<Vec<_>>()
                .join(" ");
            let p = (self.predict)(&perturbed)?[class];
            for (i, kept) in mask.iter().enumerate() {
                if *kept {
                    present_sum[i] += p;
                    present_n[i] += 1;
                } else {
                    absent_sum[i] += p;
                    absent_n[i] += 1;
                }
            }
        }

        let weights: Vec<f64> = (0..tokens.len())
            .map(|i| {
                if present_n[i] == 0 || absent_n[i] == 0 {
                    return 0.0;
                }
                present_sum[i] / present_n[i] as f64 - absent_sum[i] / absent_n[i] as f64
            })
            .collect();

        Ok(top_features(&tokens, weights))
    }
}

// ---------------------------------------------------------------------
// SHAP-style leave-one-out
// ---------------------------------------------------------------------

/// Leave-one-out attribution: each token's weight is the drop in the
/// predicted-class probability when that token is removed.
pub struct ShapExplainer {
    predict: PredictFn,
}

impl ShapExplainer {
    pub fn new(predict: PredictFn) -> Self {
        Self { predict }
    }

    pub fn explain(&self, text: &str) -> CoreResult<Vec<TokenImportance>> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let full = (self.predict)(text)?;
        let class = predicted_class(full);
        let baseline = full[class];

        let mut weights = Vec::with_capacity(tokens.len());
        for i in 0..tokens.len() {
            let without: String = tokens
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, token)| *token)
                .collect::<Vec<_>>()
                .join(" ");
            let p = (self.predict)(&without)?[class];
            weights.push(baseline - p);
        }

        Ok(top_features(&tokens, weights))
    }
}

//! Exported scoring model.
//!
//! The training pipeline distills its classifier into a sparse linear model
//! over token ids: a bias, a weight per informative token, and the
//! temperature and decision threshold fitted during calibration. Scoring
//! averages the weights of the non-padding tokens, which keeps the score
//! independent of how much of the window is padding.

use super::Verdict;
use crate::error::{WatchError, WatchResult};
use serde::Deserialize;
use std::collections::BTreeMap;

fn default_temperature() -> f64 {
    1.0
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Deserialize)]
pub struct ScoringModel {
    pub vocab_size: u32,
    pub bias: f64,
    #[serde(default)]
    pub token_weights: BTreeMap<u32, f64>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl ScoringModel {
    pub fn from_json(raw: &str) -> WatchResult<Self> {
        let model: ScoringModel = serde_json::from_str(raw)
            .map_err(|e| WatchError::Artifact(format!("model is not valid JSON: {e}")))?;
        if model.vocab_size == 0 {
            return Err(WatchError::Artifact("model vocab_size is zero".into()));
        }
        if model.temperature <= 0.0 {
            return Err(WatchError::Artifact("model temperature must be positive".into()));
        }
        Ok(model)
    }

    /// Attack-class probability for a padded token sequence.
    pub fn probability(&self, tokens: &[u32]) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &token in tokens {
            if token == 0 {
                continue;
            }
            sum += self.token_weights.get(&token).copied().unwrap_or(0.0);
            count += 1;
        }
        let mean = if count == 0 { 0.0 } else { sum / count as f64 };
        sigmoid((self.bias + mean) / self.temperature)
    }

    pub fn verdict(&self, probability: f64) -> Verdict {
        if probability >= self.threshold {
            Verdict::Attack
        } else {
            Verdict::Normal
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

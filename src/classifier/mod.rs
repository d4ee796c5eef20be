//! Defacement text classifier.
//!
//! Wraps the exported tokenizer and scoring model behind the contract the
//! pipeline expects: text in, verdict and attack probability out, plus the
//! padded token sequence and inference duration for debugging.

pub mod artifacts;
pub mod model;
pub mod tokenizer;

use crate::config::Settings;
use crate::error::WatchResult;
use artifacts::ArtifactStore;
use serde::Serialize;
use std::time::Instant;

/// Classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Normal,
    Attack,
    /// Strict mode only: there was no text to classify.
    InsufficientData,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Normal => "normal",
            Verdict::Attack => "attack",
            Verdict::InsufficientData => "insufficient_data",
        }
    }
}

/// One classification result.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub verdict: Verdict,
    pub probability: f64,
    pub tokens: Vec<u32>,
    pub predict_time_ms: u64,
}

/// Classifier facade over lazily loaded artifacts.
pub struct DefacePredictor {
    artifacts: ArtifactStore,
    max_length: usize,
    strict_empty_text: bool,
}

impl DefacePredictor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            artifacts: ArtifactStore::new(settings),
            max_length: settings.max_length,
            strict_empty_text: settings.strict_empty_text,
        }
    }

    /// Force the artifact load, typically at startup.
    pub async fn warm(&self) -> WatchResult<()> {
        self.artifacts.get().await.map(|_| ())
    }

    pub fn ready(&self) -> bool {
        self.artifacts.is_loaded()
    }

    pub async fn predict(&self, text: &str) -> WatchResult<Prediction> {
        if self.strict_empty_text && text.trim().is_empty() {
            return Ok(Prediction {
                verdict: Verdict::InsufficientData,
                probability: 0.0,
                tokens: vec![0; self.max_length],
                predict_time_ms: 0,
            });
        }

        let artifacts = self.artifacts.get().await?;
        let start = Instant::now();
        let tokens = artifacts.tokenizer.pad(artifacts.tokenizer.tokenize(text), self.max_length);
        let probability = artifacts.model.probability(&tokens);
        let verdict = artifacts.model.verdict(probability);
        Ok(Prediction {
            verdict,
            probability,
            tokens,
            predict_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKENIZER_JSON: &str = r#"{
        "word_index": {"<OOV>": 1, "hacked": 2, "by": 3, "welcome": 4, "home": 5},
        "oov_token": "<OOV>",
        "num_words": 100
    }"#;
    const MODEL_JSON: &str = r#"{
        "vocab_size": 100,
        "bias": -2.0,
        "token_weights": {"2": 5.0, "3": 3.0, "4": -1.0, "5": -1.0}
    }"#;

    fn predictor(strict: bool) -> (tempfile::TempDir, DefacePredictor) {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer_path = dir.path().join("tokenizer.json");
        let model_path = dir.path().join("model.json");
        std::fs::write(&tokenizer_path, TOKENIZER_JSON).unwrap();
        std::fs::write(&model_path, MODEL_JSON).unwrap();
        let settings = Settings {
            tokenizer_path,
            model_path,
            max_length: 8,
            strict_empty_text: strict,
            ..Settings::default()
        };
        (dir, DefacePredictor::new(&settings))
    }

    #[tokio::test]
    async fn test_defacement_text_flags_attack() {
        let (_dir, p) = predictor(false);
        let got = p.predict("HACKED by team").await.unwrap();
        assert_eq!(got.verdict, Verdict::Attack);
        assert!(got.probability >= 0.5);
        assert_eq!(got.tokens.len(), 8);
        assert_eq!(&got.tokens[..3], &[2, 3, 1]);
    }

    #[tokio::test]
    async fn test_benign_text_is_normal() {
        let (_dir, p) = predictor(false);
        let got = p.predict("welcome home").await.unwrap();
        assert_eq!(got.verdict, Verdict::Normal);
        assert!(got.probability < 0.5);
    }

    #[tokio::test]
    async fn test_strict_mode_short_circuits_empty_text() {
        let (_dir, p) = predictor(true);
        let got = p.predict("   ").await.unwrap();
        assert_eq!(got.verdict, Verdict::InsufficientData);
        assert_eq!(got.probability, 0.0);
        assert_eq!(got.tokens, vec![0; 8]);
        assert_eq!(got.predict_time_ms, 0);
    }

    #[tokio::test]
    async fn test_lenient_mode_scores_empty_text() {
        let (_dir, p) = predictor(false);
        let got = p.predict("").await.unwrap();
        // Bias-only score, well on the normal side.
        assert_eq!(got.verdict, Verdict::Normal);
        assert!(got.probability < 0.2);
    }

    #[test]
    fn test_verdict_wire_names() {
        assert_eq!(serde_json::to_string(&Verdict::Attack).unwrap(), "\"attack\"");
        assert_eq!(
            serde_json::to_string(&Verdict::InsufficientData).unwrap(),
            "\"insufficient_data\""
        );
        assert_eq!(Verdict::Normal.as_str(), "normal");
    }
}

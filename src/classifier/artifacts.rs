//! Lazy, shared classifier artifacts.
//!
//! The tokenizer and model load once per process. Concurrent first
//! requests race to a single initialization: one caller loads while the
//! rest wait on the same cell, and everyone shares the cached pair
//! afterwards. A failed load leaves the cell empty so a later request can
//! retry once the artifact files appear.

use super::model::ScoringModel;
use super::tokenizer::TextTokenizer;
use crate::config::Settings;
use crate::error::{WatchError, WatchResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Debug)]
pub struct ClassifierArtifacts {
    pub tokenizer: TextTokenizer,
    pub model: ScoringModel,
}

pub struct ArtifactStore {
    tokenizer_path: PathBuf,
    model_path: PathBuf,
    cell: OnceCell<Arc<ClassifierArtifacts>>,
}

impl ArtifactStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            tokenizer_path: settings.tokenizer_path.clone(),
            model_path: settings.model_path.clone(),
            cell: OnceCell::new(),
        }
    }

    /// Cached artifacts, loading them on first use.
    pub async fn get(&self) -> WatchResult<Arc<ClassifierArtifacts>> {
        self.cell
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    async fn load(&self) -> WatchResult<Arc<ClassifierArtifacts>> {
        let tokenizer_raw = tokio::fs::read_to_string(&self.tokenizer_path)
            .await
            .map_err(|e| {
                WatchError::Artifact(format!(
                    "cannot read tokenizer {}: {e}",
                    self.tokenizer_path.display()
                ))
            })?;
        let model_raw = tokio::fs::read_to_string(&self.model_path).await.map_err(|e| {
            WatchError::Artifact(format!("cannot read model {}: {e}", self.model_path.display()))
        })?;

        let tokenizer = TextTokenizer::from_json(&tokenizer_raw)?;
        let model = ScoringModel::from_json(&model_raw)?;
        info!(
            "classifier artifacts loaded: vocab={} weights={} threshold={}",
            tokenizer.vocab_len(),
            model.token_weights.len(),
            model.threshold
        );
        Ok(Arc::new(ClassifierArtifacts { tokenizer, model }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKENIZER_JSON: &str =
        r#"{"word_index": {"<OOV>": 1, "hacked": 2}, "oov_token": "<OOV>", "num_words": 100}"#;
    const MODEL_JSON: &str = r#"{"vocab_size": 100, "bias": -1.0, "token_weights": {"2": 4.0}}"#;

    fn store_with(tokenizer: &str, model: &str) -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer_path = dir.path().join("tokenizer.json");
        let model_path = dir.path().join("model.json");
        std::fs::write(&tokenizer_path, tokenizer).unwrap();
        std::fs::write(&model_path, model).unwrap();
        let settings = Settings {
            tokenizer_path,
            model_path,
            ..Settings::default()
        };
        (dir, ArtifactStore::new(&settings))
    }

    #[tokio::test]
    async fn test_loads_and_caches() {
        let (_dir, store) = store_with(TOKENIZER_JSON, MODEL_JSON);
        assert!(!store.is_loaded());
        let first = store.get().await.unwrap();
        assert!(store.is_loaded());
        let second = store.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_concurrent_first_access_shares_one_load() {
        let (_dir, store) = store_with(TOKENIZER_JSON, MODEL_JSON);
        let (a, b) = tokio::join!(store.get(), store.get());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    }

    #[tokio::test]
    async fn test_missing_files_fail_without_poisoning() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            tokenizer_path: dir.path().join("tokenizer.json"),
            model_path: dir.path().join("model.json"),
            ..Settings::default()
        };
        let store = ArtifactStore::new(&settings);
        assert!(store.get().await.is_err());
        assert!(!store.is_loaded());

        // Files appearing later make a retry succeed.
        std::fs::write(dir.path().join("tokenizer.json"), TOKENIZER_JSON).unwrap();
        std::fs::write(dir.path().join("model.json"), MODEL_JSON).unwrap();
        assert!(store.get().await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_artifact_content_is_an_artifact_error() {
        let (_dir, store) = store_with("not json", MODEL_JSON);
        let err = store.get().await.unwrap_err();
        assert!(matches!(err, WatchError::Artifact(_)));
    }
}

//! Vocabulary tokenizer compatible with the training pipeline's export.
//!
//! The training side fits a Keras-convention tokenizer and saves it as
//! JSON. Two layouts are accepted: the full Keras export, where the word
//! index is a JSON string nested inside `config`, and a flat layout with
//! `word_index` as a plain object. Tokenization reproduces the training
//! conventions exactly: lowercase, punctuation filtered to spaces,
//! whitespace split, out-of-vocabulary words mapped to the OOV index, and
//! indices at or above `num_words` treated as out-of-vocabulary.

use crate::error::{WatchError, WatchResult};
use serde_json::Value;
use std::collections::HashMap;

/// Punctuation stripped before splitting, matching the training default.
const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

#[derive(Debug)]
pub struct TextTokenizer {
    word_index: HashMap<String, u32>,
    oov_index: Option<u32>,
    num_words: Option<u32>,
    lower: bool,
    filters: String,
}

impl TextTokenizer {
    pub fn from_json(raw: &str) -> WatchResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| WatchError::Artifact(format!("tokenizer is not valid JSON: {e}")))?;

        // Keras export nests everything under "config" and double-encodes
        // the word index.
        let config = value.get("config").unwrap_or(&value);

        let word_index_value = config
            .get("word_index")
            .ok_or_else(|| WatchError::Artifact("tokenizer has no word_index".into()))?;
        let word_index: HashMap<String, u32> = match word_index_value {
            Value::String(inner) => serde_json::from_str(inner)
                .map_err(|e| WatchError::Artifact(format!("word_index is not valid JSON: {e}")))?,
            other => serde_json::from_value(other.clone())
                .map_err(|e| WatchError::Artifact(format!("word_index has a bad shape: {e}")))?,
        };
        if word_index.is_empty() {
            return Err(WatchError::Artifact("tokenizer word_index is empty".into()));
        }

        let oov_token = config
            .get("oov_token")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let oov_index = oov_token.as_deref().and_then(|t| word_index.get(t)).copied();

        let num_words = config
            .get("num_words")
            .and_then(|v| v.as_u64())
            .map(|n| n as u32);
        let lower = config.get("lower").and_then(|v| v.as_bool()).unwrap_or(true);
        let filters = config
            .get("filters")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_FILTERS)
            .to_string();

        Ok(Self { word_index, oov_index, num_words, lower, filters })
    }

    pub fn vocab_len(&self) -> usize {
        self.word_index.len()
    }

    /// Convert text to token ids, training-convention order preserved.
    pub fn tokenize(&self, text: &str) -> Vec<u32> {
        let lowered = if self.lower { text.to_lowercase() } else { text.to_string() };
        let cleaned: String = lowered
            .chars()
            .map(|c| if self.filters.contains(c) { ' ' } else { c })
            .collect();

        let mut out = Vec::new();
        for word in cleaned.split_whitespace() {
            match self.word_index.get(word) {
                Some(&index) => {
                    if self.num_words.is_some_and(|n| index >= n) {
                        if let Some(oov) = self.oov_index {
                            out.push(oov);
                        }
                    } else {
                        out.push(index);
                    }
                }
                None => {
                    if let Some(oov) = self.oov_index {
                        out.push(oov);
                    }
                }
            }
        }
        out
    }

    /// Post-truncate and post-pad with zeros to exactly `max_len`.
    pub fn pad(&self, mut sequence: Vec<u32>, max_len: usize) -> Vec<u32> {
        sequence.truncate(max_len);
        sequence.resize(max_len, 0);
        sequence
    }
}

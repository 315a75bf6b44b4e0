//! Embedding input and result shapes.

use serde::{Deserialize, Serialize};

/// Text to embed: one string or an ordered batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for EmbeddingInput {
    fn from(value: &str) -> Self {
        EmbeddingInput::Single(value.to_string())
    }
}

impl From<String> for EmbeddingInput {
    fn from(value: String) -> Self {
        EmbeddingInput::Single(value)
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(value: Vec<String>) -> Self {
        EmbeddingInput::Batch(value)
    }
}

/// Token accounting reported with an embedding result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// OpenAI-shaped embedding response.
///
/// `data` holds the embedding records in input order; their inner structure
/// (`{"object": "embedding", "index", "embedding": [...]}` for OpenAI) is
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    #[serde(default = "default_object")]
    pub object: String,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    pub model: String,
    #[serde(default)]
    pub usage: EmbeddingUsage,
}

fn default_object() -> String {
    "list".to_string()
}

impl EmbeddingResult {
    pub fn new(model: impl Into<String>, data: Vec<serde_json::Value>) -> Self {
        Self {
            object: default_object(),
            data,
            model: model.into(),
            usage: EmbeddingUsage::default(),
        }
    }
}

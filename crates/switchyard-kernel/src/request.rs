//! Normalized requests accepted by the dispatch engine.

use super::embedding::EmbeddingInput;
use super::message::Message;
use serde::{Deserialize, Serialize};

/// A chat-completion request in its single normalized form.
///
/// Wire names follow the OpenAI request body (`model`, `stream`,
/// `max_tokens`) plus the gateway's own `is_diagnostic` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Adapter id to dispatch to.
    #[serde(rename = "model")]
    pub target_model: String,
    /// Conversation, oldest first.
    pub messages: Vec<Message>,
    #[serde(rename = "stream", default)]
    pub streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(rename = "max_tokens", default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Surface full failure detail as content instead of a terse message.
    #[serde(rename = "is_diagnostic", default)]
    pub diagnostic: bool,
}

impl ChatRequest {
    pub fn new(target_model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            target_model: target_model.into(),
            messages,
            streaming: false,
            temperature: None,
            max_output_tokens: None,
            diagnostic: false,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: bool) -> Self {
        self.diagnostic = diagnostic;
        self
    }
}

/// An embedding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    #[serde(rename = "model")]
    pub target_model: String,
    pub input: EmbeddingInput,
}

impl EmbeddingRequest {
    pub fn new(target_model: impl Into<String>, input: impl Into<EmbeddingInput>) -> Self {
        Self {
            target_model: target_model.into(),
            input: input.into(),
        }
    }
}

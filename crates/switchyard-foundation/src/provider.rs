//! Built-in OpenAI-compatible provider client.
//!
//! [`BuiltinProviderClient`] talks to any endpoint that speaks the OpenAI
//! chat-completions / embeddings protocol (OpenAI, DeepSeek, Ollama,
//! llama.cpp, vLLM, …). Endpoint and credentials come from the adapter's
//! settings:
//!
//! | Setting    | Meaning                                         |
//! |------------|-------------------------------------------------|
//! | `base_url` | e.g. `https://api.openai.com/v1` (`/` trimmed)  |
//! | `api_key`  | sent as `Authorization: Bearer …`               |
//! | `model`    | upstream model name; defaults to the adapter id |
//!
//! Failures never hang the caller: every request carries a connect timeout
//! and an overall timeout, and both surface as [`AdapterError::Connection`].

use crate::sse::{decode_lines, split_lines};
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use switchyard_kernel::{
    AdapterConfig, AdapterError, AdapterResult, ChatRequest, DeltaStream, EmbeddingInput,
    EmbeddingResult,
};
use tracing::{debug, instrument, warn};

/// Timeouts applied to provider requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub connect: Duration,
    pub chat: Duration,
    pub embedding: Duration,
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            chat: Duration::from_secs(60),
            embedding: Duration::from_secs(30),
        }
    }
}

/// Streaming chat and embedding client for OpenAI-compatible endpoints.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BuiltinProviderClient {
    http: Client,
    timeouts: ProviderTimeouts,
}

impl BuiltinProviderClient {
    /// Build a client with its own connection pool.
    pub fn new(timeouts: ProviderTimeouts) -> Result<Self, reqwest::Error> {
        let http = Client::builder().connect_timeout(timeouts.connect).build()?;
        Ok(Self { http, timeouts })
    }

    pub fn timeouts(&self) -> ProviderTimeouts {
        self.timeouts
    }

    /// Stream the assistant reply for `request` as content deltas.
    ///
    /// Nothing is sent until the returned stream is first polled. A non-2xx
    /// answer yields a single [`AdapterError::ProviderHttp`] and ends.
    pub fn stream_chat(&self, config: &AdapterConfig, request: &ChatRequest) -> DeltaStream {
        let http = self.http.clone();
        let timeout = self.timeouts.chat;
        let target = Endpoint::from_config(config, "chat/completions");
        let body = chat_body(&target.model, request);

        Box::pin(async_stream::stream! {
            debug!(url = %target.url, model = %target.model, "sending chat completion request");

            let response = match http
                .post(&target.url)
                .bearer_auth(&target.api_key)
                .timeout(timeout)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "provider request failed");
                    yield Err(connection_error(&err));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "provider returned an error status");
                yield Err(AdapterError::ProviderHttp { status: status.as_u16(), body });
                return;
            }

            let chunks = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|err| connection_error(&err)));
            let deltas = decode_lines(split_lines(chunks));
            futures::pin_mut!(deltas);
            while let Some(delta) = deltas.next().await {
                yield delta;
            }
        })
    }

    /// Fetch embeddings for `input`.
    #[instrument(skip(self, config, input), fields(adapter = %config.id, count = input.len()))]
    pub async fn get_embeddings(
        &self,
        config: &AdapterConfig,
        input: &EmbeddingInput,
    ) -> AdapterResult<EmbeddingResult> {
        let target = Endpoint::from_config(config, "embeddings");
        let body = json!({ "model": target.model, "input": input });

        let response = self
            .http
            .post(&target.url)
            .bearer_auth(&target.api_key)
            .timeout(self.timeouts.embedding)
            .json(&body)
            .send()
            .await
            .map_err(|err| connection_error(&err))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| connection_error(&err))?;
        if !status.is_success() {
            return Err(AdapterError::ProviderHttp {
                status: status.as_u16(),
                body: text,
            });
        }

        let mut value: Value =
            serde_json::from_str(&text).map_err(|err| AdapterError::InvalidResponse {
                adapter_id: config.id.clone(),
                message: err.to_string(),
            })?;
        if let Some(obj) = value.as_object_mut() {
            obj.entry("model").or_insert_with(|| Value::from(target.model.clone()));
        }
        serde_json::from_value(value).map_err(|err| AdapterError::InvalidResponse {
            adapter_id: config.id.clone(),
            message: err.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

struct Endpoint {
    url: String,
    api_key: String,
    model: String,
}

impl Endpoint {
    fn from_config(config: &AdapterConfig, path: &str) -> Self {
        let base = config.setting_str("base_url").unwrap_or_default();
        Self {
            url: format!("{}/{}", base.trim_end_matches('/'), path),
            api_key: config.setting_str("api_key").unwrap_or_default().to_string(),
            model: config
                .setting_str("model")
                .unwrap_or(config.id.as_str())
                .to_string(),
        }
    }
}

fn chat_body(model: &str, request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": model,
        "messages": request.messages,
        "stream": true,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = request.max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

fn connection_error(err: &reqwest::Error) -> AdapterError {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() || err.is_decode() {
        "body"
    } else {
        "request"
    };
    AdapterError::connection(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_kernel::Message;

    #[test]
    fn endpoint_trims_base_url_and_defaults_model() {
        let cfg = AdapterConfig::builtin("local", "Local")
            .with_setting("base_url", json!("http://localhost:11434/v1/"));
        let ep = Endpoint::from_config(&cfg, "chat/completions");
        assert_eq!(ep.url, "http://localhost:11434/v1/chat/completions");
        assert_eq!(ep.model, "local");
        assert_eq!(ep.api_key, "");
    }

    #[test]
    fn chat_body_forwards_optional_sampling_fields() {
        let req = ChatRequest::new("m", vec![Message::user("hi")]);
        let body = chat_body("gpt-4o", &req);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["stream"], true);

        let req = req.with_temperature(0.5).with_max_output_tokens(32);
        let body = chat_body("gpt-4o", &req);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 32);
        assert_eq!(body["messages"][0]["role"], "user");
    }
}

//! End-to-end behavior of `CapabilityLoader` for native and Rhai adapters.

use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use switchyard_kernel::{
    AdapterConfig, AdapterError, AdapterPurpose, ChatRequest, EmbeddingInput, Message, Settings,
};
use switchyard_plugins::{
    AdapterOutput, AdapterPlugin, CapabilityLoader, EntryError, ScriptSandbox,
};

fn request() -> ChatRequest {
    ChatRequest::new("adapter", vec![Message::user("ping")])
}

async fn collect(loader: &CapabilityLoader, config: &AdapterConfig) -> Vec<Result<String, AdapterError>> {
    loader.load_and_stream(config, &request()).collect().await
}

fn texts(items: Vec<Result<String, AdapterError>>) -> Vec<String> {
    items.into_iter().map(|item| item.unwrap()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Native plugins
// ─────────────────────────────────────────────────────────────────────────────

enum Convention {
    Plain,
    Deferred,
    SyncGen,
    AsyncGen,
}

struct Echo(Convention);

impl AdapterPlugin for Echo {
    fn generate_stream(&self, messages: &[Message], _: &Settings) -> Result<AdapterOutput, EntryError> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let parts = vec![json!("echo: "), Value::String(last)];
        Ok(match self.0 {
            Convention::Plain => AdapterOutput::Value(Value::Array(parts)),
            Convention::Deferred => AdapterOutput::deferred(async move { Ok(Value::Array(parts)) }),
            Convention::SyncGen => AdapterOutput::iter(parts.into_iter().map(Ok)),
            Convention::AsyncGen => AdapterOutput::stream(futures::stream::iter(parts.into_iter().map(Ok))),
        })
    }
}

#[tokio::test]
async fn all_calling_conventions_produce_identical_deltas() {
    let loader = CapabilityLoader::default();
    let config = AdapterConfig::custom("echo", "Echo", "fn unused() {}");

    for convention in [Convention::Plain, Convention::Deferred, Convention::SyncGen, Convention::AsyncGen] {
        loader.catalog().register("echo", Arc::new(Echo(convention)));
        assert_eq!(texts(collect(&loader, &config).await), vec!["echo: ", "ping"]);
    }
}

struct Faulty;

impl AdapterPlugin for Faulty {
    fn generate_stream(&self, _: &[Message], settings: &Settings) -> Result<AdapterOutput, EntryError> {
        match settings.get("mode").and_then(Value::as_str) {
            Some("error") => Err(anyhow::anyhow!("upstream refused").context("calling model").into()),
            Some("panic") => panic!("plugin exploded"),
            _ => Ok(AdapterOutput::stream(futures::stream::iter(vec![
                Ok(json!("partial")),
                Err(anyhow::anyhow!("stream broke")),
                Ok(json!("never")),
            ]))),
        }
    }
}

#[tokio::test]
async fn native_failures_become_one_terminal_error() {
    let loader = CapabilityLoader::default();
    loader.catalog().register("faulty", Arc::new(Faulty));
    let base = AdapterConfig::custom("faulty", "Faulty", "fn unused() {}");

    let items = collect(&loader, &base.clone().with_setting("mode", json!("error"))).await;
    match items.as_slice() {
        [Err(AdapterError::Execution { message, frames, .. })] => {
            assert_eq!(message, "calling model");
            assert_eq!(frames, &vec!["upstream refused".to_string()]);
        }
        other => panic!("unexpected {other:?}"),
    }

    let items = collect(&loader, &base.clone().with_setting("mode", json!("panic"))).await;
    assert!(matches!(items.as_slice(), [Err(AdapterError::Execution { .. })]));

    let items = collect(&loader, &base).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_deref(), Ok("partial"));
    assert!(items[1].is_err());
}

struct ChatOnly;
impl AdapterPlugin for ChatOnly {}

#[tokio::test]
async fn missing_native_entry_point_is_reported() {
    let loader = CapabilityLoader::default();
    loader.catalog().register("bare", Arc::new(ChatOnly));
    let config = AdapterConfig::custom("bare", "Bare", "fn unused() {}");

    let items = collect(&loader, &config).await;
    assert_eq!(items, vec![Err(AdapterError::missing_entry_point("bare", "generate_stream"))]);

    let err = loader
        .load_and_embed(&config, &EmbeddingInput::from("x"))
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::missing_entry_point("bare", "get_embeddings"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Rhai scripts
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn script_emits_then_returns() {
    let source = r#"
        fn generate_stream(messages, settings) {
            for word in ["Hel", "lo"] {
                emit(word);
            }
            settings.suffix
        }
    "#;
    let config = AdapterConfig::custom("words", "Words", source).with_setting("suffix", json!(" world"));
    let loader = CapabilityLoader::default();
    assert_eq!(texts(collect(&loader, &config).await).concat(), "Hello world");
}

#[tokio::test]
async fn script_receives_conversation() {
    let source = r#"
        fn generate_stream(messages, settings) {
            messages.map(|m| m.role + ":" + m.content)
        }
    "#;
    let config = AdapterConfig::custom("roles", "Roles", source);
    let loader = CapabilityLoader::default();
    assert_eq!(texts(collect(&loader, &config).await), vec!["user:ping"]);
}

#[tokio::test]
async fn script_without_entry_point() {
    let config = AdapterConfig::custom("empty", "Empty", "fn helper() { 1 }");
    let items = collect(&CapabilityLoader::default(), &config).await;
    assert_eq!(items, vec![Err(AdapterError::missing_entry_point("empty", "generate_stream"))]);
}

#[tokio::test]
async fn script_error_after_partial_output() {
    let source = r#"
        fn generate_stream(messages, settings) {
            emit("before");
            throw "model offline";
        }
    "#;
    let config = AdapterConfig::custom("flaky", "Flaky", source);
    let items = collect(&CapabilityLoader::default(), &config).await;

    assert_eq!(items[0].as_deref(), Ok("before"));
    match &items[1] {
        Err(err @ AdapterError::Execution { .. }) => {
            assert!(err.diagnostic_report().contains("model offline"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn dropping_the_stream_stops_a_runaway_script() {
    let source = r#"
        fn generate_stream(messages, settings) {
            loop { emit("tick"); }
        }
    "#;
    let config = AdapterConfig::custom("ticker", "Ticker", source);
    let loader = CapabilityLoader::new(ScriptSandbox {
        max_operations: u64::MAX,
        ..ScriptSandbox::default()
    });

    let mut stream = loader.load_and_stream(&config, &request());
    assert_eq!(stream.next().await, Some(Ok("tick".to_string())));
    drop(stream);

    // Runtime shutdown waits for blocking workers, so a script that ignored
    // the closed channel would hang this test.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn script_embeddings_are_normalized() {
    let source = r#"
        fn get_embeddings(input, settings) {
            let data = [];
            for (text, i) in input {
                data.push(#{ object: "embedding", index: i, embedding: [text.len().to_float()] });
            }
            #{ data: data }
        }
    "#;
    let config = AdapterConfig::custom("lens", "Lengths", source).with_purpose(AdapterPurpose::Embedding);
    let input = EmbeddingInput::from(vec!["ab".to_string(), "abcd".to_string()]);

    let result = CapabilityLoader::default().load_and_embed(&config, &input).await.unwrap();
    assert_eq!(result.model, "lens");
    assert_eq!(result.object, "list");
    assert_eq!(result.data.len(), 2);
    assert_eq!(result.data[1]["embedding"], json!([4.0]));
}

#[tokio::test]
async fn script_embedding_error_key_fails() {
    let source = r#"fn get_embeddings(input, settings) { #{ error: "no key configured" } }"#;
    let config = AdapterConfig::custom("bad", "Bad", source);
    let err = CapabilityLoader::default()
        .load_and_embed(&config, &EmbeddingInput::from("x"))
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::execution("bad", "no key configured"));
}

//! HTTP surface driven through `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use switchyard_gateway::{GatewayServer, GatewaySettings};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir) -> Router {
    let settings = GatewaySettings {
        data_dir: dir.path().to_path_buf(),
        ..GatewaySettings::default()
    };
    GatewayServer::new(settings).build_app().unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

const ECHO: &str = r#"
    fn generate_stream(messages, settings) {
        emit(settings.greeting);
        emit(", ");
        messages[messages.len() - 1].content
    }
"#;

fn echo_adapter() -> Value {
    json!({
        "id": "echo",
        "name": "Echo",
        "type": "custom",
        "script_content": ECHO,
        "config": {"greeting": "Hello"}
    })
}

#[tokio::test]
async fn health() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send_json(&app(&dir), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "service": "switchyard"}));
}

#[tokio::test]
async fn register_list_delete() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send_json(&app, "POST", "/v1/models", Some(echo_adapter())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_id"], "echo");
    assert!(dir.path().join("scripts").join("echo.rhai").exists());

    let (_, listed) = send_json(&app, "GET", "/v1/models", None).await;
    assert_eq!(listed["data"][0]["id"], "echo");
    assert_eq!(listed["data"][0]["kind"], "custom");

    let (status, _) = send_json(&app, "DELETE", "/v1/models/echo", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send_json(&app, "DELETE", "/v1/models/echo", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ADAPTER_NOT_FOUND");
}

#[tokio::test]
async fn custom_adapter_without_source_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send_json(
        &app(&dir),
        "POST",
        "/v1/models",
        Some(json!({"id": "broken", "name": "Broken", "type": "custom"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn path_like_model_ids_are_rejected() {
    let dir = TempDir::new().unwrap();
    let mut adapter = echo_adapter();
    adapter["id"] = json!("../../escaped");
    let (status, body) = send_json(&app(&dir), "POST", "/v1/models", Some(adapter)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    assert!(!dir.path().parent().unwrap().join("escaped.rhai").exists());
}

#[tokio::test]
async fn chat_with_unknown_model_is_404() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send_json(
        &app(&dir),
        "POST",
        "/v1/chat/completions",
        Some(json!({"model": "ghost", "messages": [], "stream": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "adapter 'ghost' not found");
}

#[tokio::test]
async fn streamed_chat_carries_trace_frames() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    send_json(&app, "POST", "/v1/models", Some(echo_adapter())).await;

    let (status, bytes) = send(
        &app,
        "POST",
        "/v1/chat/completions",
        Some(json!({"model": "echo", "messages": [{"role": "user", "content": "world"}], "stream": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(bytes).unwrap();
    let frames: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect();
    assert_eq!(frames.last(), Some(&"[DONE]"));

    let chunks: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|f| serde_json::from_str(f).unwrap())
        .collect();
    let content: String = chunks
        .iter()
        .filter_map(|c| c["choices"][0]["delta"]["content"].as_str())
        .collect();
    assert_eq!(content, "Hello, world");

    let traces: Vec<&str> = chunks
        .iter()
        .filter_map(|c| c["trace"]["action"].as_str())
        .collect();
    assert_eq!(traces, vec!["dispatch", "inference in progress", "response complete"]);
    assert_eq!(chunks.last().unwrap()["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn non_streamed_chat_is_aggregated() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    send_json(&app, "POST", "/v1/models", Some(echo_adapter())).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/chat/completions",
        Some(json!({"model": "echo", "messages": [{"role": "user", "content": "there"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["choices"][0]["message"]["content"], "Hello, there");
}

#[tokio::test]
async fn embeddings_from_custom_adapter() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let adapter = json!({
        "id": "embed",
        "name": "Embed",
        "purpose": "embedding",
        "type": "custom",
        "script_content": "fn get_embeddings(input, settings) { #{ data: [#{ index: 0, embedding: [0.5] }] } }"
    });
    send_json(&app, "POST", "/v1/models", Some(adapter)).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/embeddings",
        Some(json!({"model": "embed", "input": "text"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "embed");
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"][0]["embedding"], json!([0.5]));
}

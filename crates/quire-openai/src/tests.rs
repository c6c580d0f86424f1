use axum::{
  Json, Router,
  http::{HeaderMap, StatusCode},
  routing::post,
};
use quire_core::llm::{ChatMessage, ChatModel, Embedder};
use serde_json::{Value, json};

use crate::{Error, OpenAiClient, OpenAiConfig};

const KEY: &str = "sk-test";

fn authorized(headers: &HeaderMap) -> bool {
  headers
    .get("authorization")
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| v == format!("Bearer {KEY}"))
}

async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
  if !authorized(&headers) {
    return (
      StatusCode::UNAUTHORIZED,
      Json(json!({ "error": { "message": "Incorrect API key provided" } })),
    );
  }
  let messages = body["messages"].as_array().cloned().unwrap_or_default();
  let last = messages
    .last()
    .and_then(|m| m["content"].as_str())
    .unwrap_or_default()
    .to_owned();
  let model = body["model"].as_str().unwrap_or("?");
  let reply = format!("{model} saw {} messages, last: {last}", messages.len());
  (
    StatusCode::OK,
    Json(json!({ "choices": [ { "index": 0, "message": { "role": "assistant", "content": reply } } ] })),
  )
}

/// Answers in reverse order so the client has to sort by `index`.
async fn embeddings(Json(body): Json<Value>) -> Json<Value> {
  let inputs = body["input"].as_array().cloned().unwrap_or_default();
  let data: Vec<Value> = inputs
    .iter()
    .enumerate()
    .rev()
    .map(|(i, text)| {
      let len = text.as_str().map_or(0, str::len) as f32;
      json!({ "object": "embedding", "index": i, "embedding": [len, i as f32] })
    })
    .collect();
  Json(json!({ "object": "list", "data": data }))
}

async fn mock() -> String {
  let app = Router::new()
    .route("/v1/chat/completions", post(chat))
    .route("/v1/embeddings", post(embeddings))
    .route(
      "/broken/embeddings",
      post(|| async { Json(json!({ "data": [] })) }),
    )
    .route("/broken/chat/completions", post(|| async { Json(json!({ "choices": [] })) }));

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
    .await
    .expect("bind mock");
  let addr = listener.local_addr().expect("local addr");
  tokio::spawn(async move {
    axum::serve(listener, app).await.ok();
  });
  format!("http://{addr}")
}

fn client(base_url: String, api_key: &str) -> OpenAiClient {
  OpenAiClient::new(OpenAiConfig {
    api_key: api_key.to_owned(),
    base_url,
    ..OpenAiConfig::default()
  })
  .expect("client should build")
}

#[test]
fn defaults_match_hosted_openai() {
  let cfg = OpenAiConfig::default();
  assert_eq!(cfg.base_url, "https://api.openai.com/v1");
  assert_eq!(cfg.chat_model, "gpt-4o");
  assert_eq!(cfg.embedding_model, "text-embedding-ada-002");
}

#[tokio::test]
async fn complete_sends_model_and_messages() {
  let base = mock().await;
  let c = client(format!("{base}/v1/"), KEY);

  let reply = c
    .complete(&[ChatMessage::system("be brief"), ChatMessage::user("hello")])
    .await
    .unwrap();
  assert_eq!(reply, "gpt-4o saw 2 messages, last: hello");
}

#[tokio::test]
async fn api_errors_surface_status_and_message() {
  let base = mock().await;
  let c = client(format!("{base}/v1"), "wrong");

  let err = c.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
  match err {
    Error::Api { status, message } => {
      assert_eq!(status, 401);
      assert_eq!(message, "Incorrect API key provided");
    }
    other => panic!("unexpected error: {other:?}"),
  }
}

#[tokio::test]
async fn embeddings_are_reordered_by_index() {
  let base = mock().await;
  let c = client(format!("{base}/v1"), KEY);

  let texts = vec!["a".to_owned(), "bbb".to_owned(), "cc".to_owned()];
  let vectors = c.embed_documents(&texts).await.unwrap();
  assert_eq!(vectors, vec![vec![1.0, 0.0], vec![3.0, 1.0], vec![2.0, 2.0]]);

  let query = c.embed_query("four").await.unwrap();
  assert_eq!(query, vec![4.0, 0.0]);
  assert!(c.embed_documents(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn short_or_empty_responses_are_errors() {
  let base = mock().await;
  let c = client(format!("{base}/broken"), KEY);

  let err = c.embed_documents(&["x".to_owned()]).await.unwrap_err();
  assert!(matches!(err, Error::EmbeddingCount { expected: 1, got: 0 }));
  let err = c.complete(&[ChatMessage::user("x")]).await.unwrap_err();
  assert!(matches!(err, Error::NoChoices));
}

use axum::{
  Json, Router,
  body::Bytes,
  extract::{Path, Query},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
  routing::{get, post},
};
use chrono::{TimeZone, Utc};
use clap::Parser as _;
use quire_core::{
  blob::BlobPath,
  document::{Document, UserId},
  message::{Message, Role},
};
use quire_rag::UploadEvent;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
  Args, ConfigFile,
  client::{ApiClient, ApiConfig, NdjsonDecoder},
  commands::{document_line, local_name, message_line},
  resolve,
};

// ─── Mock server ──────────────────────────────────────────────────────────────

// "alice:secret"
const ALICE: &str = "Basic YWxpY2U6c2VjcmV0";

fn sample_document() -> Document {
  let user = UserId::new("alice").unwrap();
  let document_id = Uuid::from_u128(7);
  Document {
    document_id,
    user_id: user.clone(),
    name: "paper.pdf".into(),
    size: 2048,
    mime_type: "application/pdf".into(),
    download_url: None,
    storage_path: BlobPath::for_document(&user, document_id),
    sha256: "ab".repeat(32),
    created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
  }
}

fn unauthorized() -> Response {
  (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}

fn authed(headers: &HeaderMap) -> bool {
  headers.get(header::AUTHORIZATION).is_some_and(|v| v == ALICE)
}

async fn me(headers: HeaderMap) -> Response {
  if !authed(&headers) {
    return unauthorized();
  }
  Json(json!({
    "user_id": "alice",
    "has_active_membership": false,
    "document_count": 1,
    "file_limit": 3,
    "is_over_file_limit": false,
  }))
  .into_response()
}

#[derive(Deserialize)]
struct UploadQuery {
  name: String,
}

async fn upload(headers: HeaderMap, Query(q): Query<UploadQuery>, body: Bytes) -> Response {
  if !authed(&headers) {
    return unauthorized();
  }
  let events: Vec<serde_json::Value> = match q.name.as_str() {
    "full.pdf" => vec![json!({ "status": "rejected", "message": "You'll need to upgrade to PRO" })],
    "broken.pdf" => vec![
      serde_json::to_value(UploadEvent::Uploaded { document_id: Uuid::nil() }).unwrap(),
      json!({ "status": "failed", "error": "embedding service unavailable" }),
    ],
    _ => {
      let is_pdf = headers.get(header::CONTENT_TYPE).is_some_and(|v| v == "application/pdf");
      if !is_pdf {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "only PDFs" }))).into_response();
      }
      let total = body.len() as u64;
      let document = Document { name: q.name, size: total, ..sample_document() };
      [
        UploadEvent::Uploading { percent: 100, bytes_transferred: total, total_bytes: total },
        UploadEvent::Uploaded { document_id: document.document_id },
        UploadEvent::Saving { document_id: document.document_id },
        UploadEvent::Generating { document_id: document.document_id },
        UploadEvent::Complete { document, chunks: 4 },
      ]
      .iter()
      .map(|e| serde_json::to_value(e).unwrap())
      .collect()
    }
  };
  let body: String = events.iter().map(|e| format!("{e}\n")).collect();
  ([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response()
}

async fn get_document(Path(id): Path<Uuid>) -> Response {
  if id == sample_document().document_id {
    Json(sample_document()).into_response()
  } else {
    (StatusCode::NOT_FOUND, Json(json!({ "error": format!("document {id} not found") })))
      .into_response()
  }
}

#[derive(Deserialize)]
struct AskBody {
  question: String,
}

async fn ask(Json(body): Json<AskBody>) -> Json<serde_json::Value> {
  Json(json!({ "success": true, "message": format!("you asked: {}", body.question) }))
}

async fn spawn_server() -> String {
  let app = Router::new()
    .route("/api/me", get(me))
    .route("/api/documents", post(upload))
    .route("/api/documents/{id}", get(get_document))
    .route("/api/documents/{id}/ask", post(ask));
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{addr}/")
}

async fn client(password: &str) -> ApiClient {
  ApiClient::new(ApiConfig {
    base_url: spawn_server().await,
    username: "alice".into(),
    password: password.into(),
  })
  .unwrap()
}

// ─── Client ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn me_sends_basic_auth() {
  let sub = client("secret").await.me().await.unwrap();
  assert_eq!(sub.user_id.as_str(), "alice");
  assert_eq!(sub.file_limit, Some(3));
}

#[tokio::test]
async fn server_error_message_is_surfaced() {
  let err = client("wrong").await.me().await.unwrap_err();
  let text = err.to_string();
  assert!(text.contains("401"), "{text}");
  assert!(text.contains("unauthorized"), "{text}");

  let missing = Uuid::from_u128(99);
  let err = client("secret").await.get_document(missing).await.unwrap_err();
  assert!(err.to_string().contains(&format!("document {missing} not found")));
}

#[tokio::test]
async fn upload_reports_every_stage() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("paper.pdf");
  std::fs::write(&path, b"%PDF-1.4 fake").unwrap();

  let mut seen = Vec::new();
  let last = client("secret")
    .await
    .upload(&path, |e| seen.push(e.label()))
    .await
    .unwrap();

  assert_eq!(seen, [
    "Uploading file...",
    "File uploaded successfully",
    "Saving file to database",
    "Generating AI embeddings, This will only take a few seconds...",
    "Ready",
  ]);
  match last {
    UploadEvent::Complete { document, chunks } => {
      assert_eq!(document.name, "paper.pdf");
      assert_eq!(document.size, 13);
      assert_eq!(chunks, 4);
    }
    other => panic!("unexpected terminal event {other:?}"),
  }
}

#[tokio::test]
async fn upload_rejection_is_terminal() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("full.pdf");
  std::fs::write(&path, b"%PDF").unwrap();

  let last = client("secret").await.upload(&path, |_| {}).await.unwrap();
  assert!(matches!(last, UploadEvent::Rejected { message } if message.contains("PRO")));
}

#[tokio::test]
async fn failed_line_becomes_error() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("broken.pdf");
  std::fs::write(&path, b"%PDF").unwrap();

  let mut count = 0;
  let err = client("secret").await.upload(&path, |_| count += 1).await.unwrap_err();
  assert_eq!(count, 1);
  assert!(err.to_string().contains("embedding service unavailable"));
}

#[tokio::test]
async fn non_pdf_extension_is_sent_as_octet_stream() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("notes.txt");
  std::fs::write(&path, b"hello").unwrap();

  let err = client("secret").await.upload(&path, |_| {}).await.unwrap_err();
  assert!(err.to_string().contains("only PDFs"));
}

#[tokio::test]
async fn ask_posts_question() {
  let outcome = client("secret").await.ask(Uuid::from_u128(7), "what is it?").await.unwrap();
  assert!(outcome.success);
  assert_eq!(outcome.message.as_deref(), Some("you asked: what is it?"));
}

// ─── NDJSON ───────────────────────────────────────────────────────────────────

#[test]
fn decoder_reassembles_split_lines() {
  let mut d = NdjsonDecoder::default();
  assert!(d.push(b"{\"a\":").is_empty());
  assert_eq!(d.push(b"1}\n{\"b\""), vec!["{\"a\":1}"]);
  assert_eq!(d.push(b":2}\n\n"), vec!["{\"b\":2}"]);
  assert!(d.push(b"{\"c\":3}").is_empty());
  assert_eq!(d.finish().as_deref(), Some("{\"c\":3}"));
}

// ─── Config ───────────────────────────────────────────────────────────────────

#[test]
fn flags_override_file() {
  let args = Args::try_parse_from(["quire", "--url", "http://flag:1", "ls"]).unwrap();
  let file = ConfigFile {
    url:      "http://file:2".into(),
    username: "bob".into(),
    password: "pw".into(),
  };
  let cfg = resolve(&args, file);
  assert_eq!(cfg.base_url, "http://flag:1");
  assert_eq!(cfg.username, "bob");
  assert_eq!(cfg.password, "pw");
}

#[test]
fn ask_joins_words() {
  let args = Args::try_parse_from(["quire", "ask", &Uuid::nil().to_string(), "what", "is", "this"])
    .unwrap();
  match args.command {
    crate::Command::Ask { question, .. } => assert_eq!(question.join(" "), "what is this"),
    other => panic!("parsed {other:?}"),
  }
}

// ─── Formatting ───────────────────────────────────────────────────────────────

#[test]
fn lines_render_documents_and_messages() {
  let line = document_line(&sample_document());
  assert!(line.starts_with(&Uuid::from_u128(7).to_string()));
  assert!(line.ends_with("   2.00 KiB  2024-05-01 09:30  paper.pdf"), "{line}");

  let big = Document { size: 5 * 1024 * 1024 + 512 * 1024, ..sample_document() };
  assert!(document_line(&big).contains("   5.50 MiB  "), "{}", document_line(&big));

  let m = Message {
    message_id:  Uuid::nil(),
    document_id: Uuid::nil(),
    role:        Role::Ai,
    message:     "It is a paper.".into(),
    created_at:  Utc.with_ymd_and_hms(2024, 5, 1, 9, 31, 0).unwrap(),
  };
  assert_eq!(message_line(&m), "[09:31] ai : It is a paper.");
}

#[test]
fn download_names_are_flattened() {
  assert_eq!(local_name("paper.pdf"), "paper.pdf");
  assert_eq!(local_name("../../etc/passwd"), "passwd");
  assert_eq!(local_name("dir\\file.pdf"), "file.pdf");
  assert_eq!(local_name(".."), "document.pdf");
}

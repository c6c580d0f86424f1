//! Async HTTP client wrapping the quire JSON API.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use bytes::Bytes;
use futures::StreamExt as _;
use quire_core::{document::Document, message::Message};
use quire_rag::{IngestReport, Outcome, Subscription, UploadEvent};
use reqwest::{Client, Response, header};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the quire API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the quire JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    // No overall timeout: uploads stream progress for as long as embedding
    // takes, and answers wait on the model.
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  // ── Account ───────────────────────────────────────────────────────────────

  /// `GET /api/me`
  pub async fn me(&self) -> Result<Subscription> {
    let resp = self.send(self.client.get(self.url("/me")), "GET /me").await?;
    resp.json().await.context("deserialising subscription")
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  /// `GET /api/documents`
  pub async fn list_documents(&self) -> Result<Vec<Document>> {
    let resp = self.send(self.client.get(self.url("/documents")), "GET /documents").await?;
    resp.json().await.context("deserialising documents")
  }

  /// `GET /api/documents/<id>`
  pub async fn get_document(&self, id: Uuid) -> Result<Document> {
    let path = format!("/documents/{id}");
    let resp = self.send(self.client.get(self.url(&path)), &format!("GET {path}")).await?;
    resp.json().await.context("deserialising document")
  }

  /// `POST /api/documents?name=<file name>`, reporting each progress event to
  /// `on_event`. Returns the terminal event.
  pub async fn upload(
    &self,
    path: &Path,
    mut on_event: impl FnMut(&UploadEvent),
  ) -> Result<UploadEvent> {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
    let body = tokio::fs::read(path)
      .await
      .with_context(|| format!("reading {}", path.display()))?;

    let req = self
      .client
      .post(self.url("/documents"))
      .query(&[("name", name.as_str())])
      .header(header::CONTENT_TYPE, guess_mime(path))
      .body(body);
    let resp = self.send(req, "POST /documents").await?;

    let mut decoder = NdjsonDecoder::default();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
      let chunk = chunk.context("reading upload progress")?;
      for line in decoder.push(&chunk) {
        let event = parse_progress(&line)?;
        on_event(&event);
        if event.is_terminal() {
          return Ok(event);
        }
      }
    }
    if let Some(line) = decoder.finish() {
      let event = parse_progress(&line)?;
      on_event(&event);
      if event.is_terminal() {
        return Ok(event);
      }
    }
    bail!("upload stream ended before the document was ready")
  }

  /// `DELETE /api/documents/<id>`
  pub async fn delete_document(&self, id: Uuid) -> Result<Outcome> {
    let path = format!("/documents/{id}");
    let resp = self.send(self.client.delete(self.url(&path)), &format!("DELETE {path}")).await?;
    resp.json().await.context("deserialising outcome")
  }

  /// `GET /api/documents/<id>/file`
  pub async fn download(&self, id: Uuid) -> Result<Bytes> {
    let path = format!("/documents/{id}/file");
    let resp = self.send(self.client.get(self.url(&path)), &format!("GET {path}")).await?;
    resp.bytes().await.context("reading document bytes")
  }

  /// `POST /api/documents/<id>/ingest`
  pub async fn ingest(&self, id: Uuid) -> Result<IngestReport> {
    let path = format!("/documents/{id}/ingest");
    let resp = self.send(self.client.post(self.url(&path)), &format!("POST {path}")).await?;
    resp.json().await.context("deserialising ingest report")
  }

  // ── Chat ──────────────────────────────────────────────────────────────────

  /// `GET /api/documents/<id>/messages`, oldest first.
  pub async fn messages(&self, id: Uuid) -> Result<Vec<Message>> {
    let path = format!("/documents/{id}/messages");
    let resp = self.send(self.client.get(self.url(&path)), &format!("GET {path}")).await?;
    resp.json().await.context("deserialising messages")
  }

  /// `POST /api/documents/<id>/ask`
  pub async fn ask(&self, id: Uuid, question: &str) -> Result<Outcome> {
    let path = format!("/documents/{id}/ask");
    let req = self.client.post(self.url(&path)).json(&json!({ "question": question }));
    let resp = self.send(req, &format!("POST {path}")).await?;
    resp.json().await.context("deserialising outcome")
  }

  // ── Plumbing ──────────────────────────────────────────────────────────────

  /// Send with credentials, turning a non-2xx status into an error carrying
  /// the server's `{"error": ...}` message when there is one.
  async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<Response> {
    let resp = self.auth(req).send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    tracing::debug!(%status, "{what}");
    if status.is_success() {
      return Ok(resp);
    }

    #[derive(Deserialize)]
    struct ErrorBody {
      error: String,
    }
    match resp.json::<ErrorBody>().await {
      Ok(body) => Err(anyhow!("{what} → {status}: {}", body.error)),
      Err(_) => Err(anyhow!("{what} → {status}")),
    }
  }
}

fn guess_mime(path: &Path) -> &'static str {
  match path.extension().and_then(|e| e.to_str()) {
    Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
    _ => "application/octet-stream",
  }
}

// ─── NDJSON ───────────────────────────────────────────────────────────────────

/// Reassembles newline-delimited lines from arbitrarily split chunks.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
  buf: Vec<u8>,
}

impl NdjsonDecoder {
  /// Feed a chunk and take every line it completes.
  pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
    self.buf.extend_from_slice(chunk);
    let mut lines = Vec::new();
    while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
      let line: Vec<u8> = self.buf.drain(..=pos).collect();
      let text = String::from_utf8_lossy(&line).trim().to_owned();
      if !text.is_empty() {
        lines.push(text);
      }
    }
    lines
  }

  /// Whatever trailing line was left without a newline.
  pub fn finish(self) -> Option<String> {
    let text = String::from_utf8_lossy(&self.buf).trim().to_owned();
    (!text.is_empty()).then_some(text)
  }
}

/// One progress line. A `failed` line ends the upload with an error.
fn parse_progress(line: &str) -> Result<UploadEvent> {
  let value: serde_json::Value =
    serde_json::from_str(line).with_context(|| format!("malformed progress line: {line}"))?;
  if value["status"] == "failed" {
    let message = value["error"].as_str().unwrap_or("unknown error");
    bail!("upload failed: {message}");
  }
  serde_json::from_value(value).with_context(|| format!("unexpected progress line: {line}"))
}

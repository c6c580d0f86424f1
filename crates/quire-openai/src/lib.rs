//! OpenAI-compatible chat and embedding client.
//!
//! Speaks the `/chat/completions` and `/embeddings` endpoints of any server
//! that follows the OpenAI wire format, selected by `base_url`. One
//! [`OpenAiClient`] implements both [`ChatModel`] and [`Embedder`].

use std::time::Duration;

use quire_core::llm::{ChatMessage, ChatModel, Embedder};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::{Error, Result};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
  pub api_key:         String,
  /// Everything before `/chat/completions`, e.g. `https://api.openai.com/v1`.
  pub base_url:        String,
  pub chat_model:      String,
  pub embedding_model: String,
  pub timeout_secs:    u64,
}

impl Default for OpenAiConfig {
  fn default() -> Self {
    Self {
      api_key:         String::new(),
      base_url:        "https://api.openai.com/v1".to_owned(),
      chat_model:      "gpt-4o".to_owned(),
      embedding_model: "text-embedding-ada-002".to_owned(),
      timeout_secs:    60,
    }
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:    &'a str,
  messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
  #[serde(default)]
  content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
  index:     usize,
  embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
  error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
  message: String,
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OpenAiClient {
  http:   reqwest::Client,
  config: OpenAiConfig,
}

impl OpenAiClient {
  pub fn new(config: OpenAiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { http, config })
  }

  pub fn config(&self) -> &OpenAiConfig { &self.config }

  fn endpoint(&self, path: &str) -> String {
    format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
  }

  async fn post<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<R> {
    let mut req = self.http.post(self.endpoint(path)).json(body);
    // Local OpenAI-compatible servers often run without a key.
    if !self.config.api_key.is_empty() {
      req = req.bearer_auth(&self.config.api_key);
    }
    let resp = req.send().await?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|b| b.error.message)
        .unwrap_or(text);
      tracing::warn!(path, status = status.as_u16(), %message, "openai request failed");
      return Err(Error::Api { status: status.as_u16(), message });
    }

    Ok(resp.json().await?)
  }
}

impl ChatModel for OpenAiClient {
  type Error = Error;

  async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
    let body = ChatRequest { model: &self.config.chat_model, messages };
    let resp: ChatResponse = self.post("chat/completions", &body).await?;
    resp
      .choices
      .into_iter()
      .next()
      .map(|c| c.message.content.unwrap_or_default())
      .ok_or(Error::NoChoices)
  }
}

impl Embedder for OpenAiClient {
  type Error = Error;

  async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
      return Ok(Vec::new());
    }
    let body = EmbeddingRequest { model: &self.config.embedding_model, input: texts };
    let resp: EmbeddingResponse = self.post("embeddings", &body).await?;

    let mut data = resp.data;
    if data.len() != texts.len() {
      return Err(Error::EmbeddingCount { expected: texts.len(), got: data.len() });
    }
    // The API may answer out of order; `index` ties each vector to its input.
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
  }

  async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
    let input = [text.to_owned()];
    self
      .embed_documents(&input)
      .await?
      .pop()
      .ok_or(Error::EmbeddingCount { expected: 1, got: 0 })
  }
}

#[cfg(test)]
mod tests;

//! Model-provider abstractions: text embeddings and chat completion.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Turns text into vectors. Documents and queries are embedded separately so
/// providers with asymmetric models can treat them differently.
pub trait Embedder: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Embed a batch of document chunks; one vector per input, in order.
  fn embed_documents<'a>(
    &'a self,
    texts: &'a [String],
  ) -> impl Future<Output = Result<Vec<Vec<f32>>, Self::Error>> + Send + 'a;

  /// Embed a single search query.
  fn embed_query<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<f32>, Self::Error>> + Send + 'a;
}

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
  System,
  User,
  Assistant,
}

/// One message of a chat prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role:    ChatRole,
  pub content: String,
}

impl ChatMessage {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: ChatRole::System, content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: ChatRole::User, content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: ChatRole::Assistant, content: content.into() }
  }
}

/// A chat-completion language model.
pub trait ChatModel: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Complete `messages` and return the assistant's reply text.
  fn complete<'a>(
    &'a self,
    messages: &'a [ChatMessage],
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}

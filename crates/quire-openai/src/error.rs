//! Error type for `quire-openai`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The API answered with a non-success status.
  #[error("openai api error ({status}): {message}")]
  Api { status: u16, message: String },

  #[error("chat completion returned no choices")]
  NoChoices,

  #[error("expected {expected} embeddings, got {got}")]
  EmbeddingCount { expected: usize, got: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

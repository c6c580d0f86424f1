//! Error types for `quire-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid user id: {0:?}")]
  InvalidUserId(String),

  #[error("unknown message role: {0:?}")]
  UnknownRole(String),

  #[error("invalid blob path: {0:?}")]
  InvalidBlobPath(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

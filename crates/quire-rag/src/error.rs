//! Error type for `quire-rag`.
//!
//! Quota refusals are not errors; they come back as an unsuccessful
//! [`crate::Outcome`] or an [`crate::UploadEvent::Rejected`].

use thiserror::Error;
use uuid::Uuid;

use crate::fetch::FetchError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RagError {
  #[error("document {0} not found")]
  DocumentNotFound(Uuid),

  #[error("document {0} has no download url")]
  DownloadUrlMissing(Uuid),

  #[error("vector store {0} not found")]
  VectorStoreMissing(String),

  #[error("invalid upload: {0}")]
  InvalidUpload(String),

  #[error("question must not be empty")]
  EmptyQuestion,

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("pdf error: {0}")]
  Pdf(#[from] quire_text::Error),

  #[error("fetch error: {0}")]
  Fetch(#[from] FetchError),

  #[error("background task failed: {0}")]
  Task(#[from] tokio::task::JoinError),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("vector index error: {0}")]
  Vectors(#[source] BoxError),

  #[error("blob store error: {0}")]
  Blob(#[source] BoxError),

  /// Embedding or chat-completion failure.
  #[error("model error: {0}")]
  Model(#[source] BoxError),
}

impl RagError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn vectors(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Vectors(Box::new(e))
  }

  pub(crate) fn blob(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Blob(Box::new(e))
  }

  pub(crate) fn model(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Model(Box::new(e))
  }
}

pub type Result<T, E = RagError> = std::result::Result<T, E>;

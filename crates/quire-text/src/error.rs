//! Error types for `quire-text`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("input is not a PDF document")]
  NotPdf,

  #[error("PDF text extraction failed: {0}")]
  Extract(String),

  #[error("PDF contains no extractable text")]
  NoText,

  #[error("core error: {0}")]
  Core(#[from] quire_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error type for `quire-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] quire_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("failed to register sqlite-vec (sqlite error code {0})")]
  Extension(i32),

  /// An embedding's length disagrees with the index's fixed dimension.
  #[error("embedding has {got} dimensions, the index expects {expected}")]
  Dimensions { expected: usize, got: usize },

  /// A column held a value the domain types cannot represent.
  #[error("corrupt row: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error type for `quire-blob-fs`.

use std::path::PathBuf;

use quire_core::blob::BlobPath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("no pending upload for {0}")]
  NotPending(BlobPath),

  /// A chunk arrived for a position other than the current end of the upload.
  #[error("upload {path} is {expected} bytes long, chunk offset was {got}")]
  OffsetMismatch { path: BlobPath, expected: u64, got: u64 },

  #[error("cannot express {0:?} as a file URL")]
  Url(PathBuf),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

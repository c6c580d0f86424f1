//! The blob store abstraction: where uploaded PDF bytes live.

use std::{fmt, future::Future};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, document::UserId};

// ─── BlobPath ────────────────────────────────────────────────────────────────

/// A relative, `/`-separated key inside the blob store.
///
/// Never absolute and never contains `.` or `..` segments, so backends can map
/// it onto a filesystem or bucket without escaping their root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobPath(String);

impl BlobPath {
  pub fn new(path: impl Into<String>) -> Result<Self> {
    let path = path.into();
    let valid = !path.is_empty()
      && !path.starts_with('/')
      && !path.contains('\\')
      && path
        .split('/')
        .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if valid { Ok(Self(path)) } else { Err(Error::InvalidBlobPath(path)) }
  }

  /// `users/{user_id}/files/{document_id}`, the layout every upload uses.
  pub fn for_document(user: &UserId, document_id: Uuid) -> Self {
    Self(format!("users/{user}/files/{}", document_id.hyphenated()))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn segments(&self) -> impl Iterator<Item = &str> { self.0.split('/') }
}

impl fmt::Display for BlobPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for BlobPath {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<BlobPath> for String {
  fn from(p: BlobPath) -> Self { p.0 }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Object storage for uploaded files.
///
/// Uploads are written in chunks so callers can report progress; a blob only
/// becomes readable once [`BlobStore::finish`] succeeds.
pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Write `bytes` at `offset` of a pending upload. Offset 0 discards any
  /// previous pending data for `path`.
  fn write_chunk<'a>(
    &'a self,
    path: &'a BlobPath,
    offset: u64,
    bytes: Bytes,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Publish the pending upload and return its download URL.
  fn finish<'a>(
    &'a self,
    path: &'a BlobPath,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Read a published blob. Returns `None` if absent.
  fn read<'a>(
    &'a self,
    path: &'a BlobPath,
  ) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send + 'a;

  /// Delete a blob and any pending upload for it. Deleting a missing blob is
  /// not an error.
  fn delete<'a>(
    &'a self,
    path: &'a BlobPath,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blob_path_validation() {
    assert!(BlobPath::new("users/a/files/b").is_ok());
    assert!(BlobPath::new("").is_err());
    assert!(BlobPath::new("/etc/passwd").is_err());
    assert!(BlobPath::new("users/../secret").is_err());
    assert!(BlobPath::new("users//files").is_err());
    assert!(BlobPath::new("users\\files").is_err());
  }

  #[test]
  fn document_layout() {
    let user = UserId::new("user_1").unwrap();
    let id = Uuid::nil();
    assert_eq!(
      BlobPath::for_document(&user, id).as_str(),
      "users/user_1/files/00000000-0000-0000-0000-000000000000"
    );
  }
}

//! Users and the document metadata records they own.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, blob::BlobPath};

// ─── UserId ──────────────────────────────────────────────────────────────────

/// The stable identifier handed out by the identity provider.
///
/// Opaque to quire, but it ends up inside storage paths, so it must be
/// non-empty and free of path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    let valid = !id.is_empty()
      && id != "."
      && id != ".."
      && !id.contains(['/', '\\'])
      && !id.chars().any(char::is_control);
    if valid { Ok(Self(id)) } else { Err(Error::InvalidUserId(id)) }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for UserId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<UserId> for String {
  fn from(id: UserId) -> Self { id.0 }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A signed-in account as seen by quire. Subscription state is written by the
/// billing integration; everything else about the person lives with the
/// identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:               UserId,
  pub has_active_membership: bool,
  pub created_at:            DateTime<Utc>,
}

// ─── Document ────────────────────────────────────────────────────────────────

/// Metadata for one uploaded PDF. The bytes live in the blob store under
/// `storage_path`; the embedded chunks live in the vector namespace named after
/// `document_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub document_id:  Uuid,
  pub user_id:      UserId,
  /// Original file name as supplied by the uploader.
  pub name:         String,
  /// Size in bytes.
  pub size:         u64,
  pub mime_type:    String,
  pub download_url: Option<String>,
  pub storage_path: BlobPath,
  /// Hex SHA-256 of the uploaded bytes.
  pub sha256:       String,
  pub created_at:   DateTime<Utc>,
}

impl Document {
  /// The vector namespace holding this document's chunks.
  pub fn namespace(&self) -> String { namespace_for(self.document_id) }
}

/// Vector namespaces are keyed 1:1 by document id.
pub fn namespace_for(document_id: Uuid) -> String {
  document_id.hyphenated().to_string()
}

/// Input to [`crate::store::DocumentStore::create_document`].
/// `created_at` is always set by the store.
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub document_id:  Uuid,
  pub user_id:      UserId,
  pub name:         String,
  pub size:         u64,
  pub mime_type:    String,
  pub download_url: Option<String>,
  pub storage_path: BlobPath,
  pub sha256:       String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_id_rejects_path_tricks() {
    assert!(UserId::new("user_2abc").is_ok());
    assert!(UserId::new("").is_err());
    assert!(UserId::new("..").is_err());
    assert!(UserId::new("a/b").is_err());
    assert!(UserId::new("a\\b").is_err());
    assert!(UserId::new("a\nb").is_err());
  }

  #[test]
  fn user_id_deserialize_validates() {
    let ok: UserId = serde_json::from_str("\"alice\"").unwrap();
    assert_eq!(ok.as_str(), "alice");
    assert!(serde_json::from_str::<UserId>("\"../etc\"").is_err());
  }

  #[test]
  fn namespace_is_document_id() {
    let id = Uuid::new_v4();
    assert_eq!(namespace_for(id), id.to_string());
  }
}

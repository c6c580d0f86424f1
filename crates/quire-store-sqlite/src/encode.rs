//! Encoding and decoding helpers between quire domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC with fixed microsecond precision so that
//! lexical order in SQL matches chronological order. UUIDs are hyphenated
//! lowercase strings. Embeddings are little-endian `f32` blobs.

use chrono::{DateTime, SecondsFormat, Utc};
use quire_core::{
  blob::BlobPath,
  document::{Document, User, UserId},
  message::{Message, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ─────────────────────────────────────────────────────────────────────

pub fn encode_role(role: Role) -> &'static str { role.into() }

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown role: {s:?}")))
}

// ─── Embedding ────────────────────────────────────────────────────────────────

/// The blob layout sqlite-vec reads for a `float[N]` column.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
  embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

// ─── Sizes ────────────────────────────────────────────────────────────────────

pub fn encode_size(size: u64) -> i64 { i64::try_from(size).unwrap_or(i64::MAX) }

pub fn decode_size(size: i64) -> Result<u64> {
  u64::try_from(size).map_err(|_| Error::Decode(format!("negative size: {size}")))
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:               String,
  pub has_active_membership: bool,
  pub created_at:            String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, has_active_membership, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:               row.get(0)?,
      has_active_membership: row.get(1)?,
      created_at:            row.get(2)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:               UserId::new(self.user_id)?,
      has_active_membership: self.has_active_membership,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `documents` row.
pub struct RawDocument {
  pub document_id:  String,
  pub user_id:      String,
  pub name:         String,
  pub size:         i64,
  pub mime_type:    String,
  pub download_url: Option<String>,
  pub storage_path: String,
  pub sha256:       String,
  pub created_at:   String,
}

impl RawDocument {
  pub const COLUMNS: &'static str = "document_id, user_id, name, size, mime_type, \
                                     download_url, storage_path, sha256, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:  row.get(0)?,
      user_id:      row.get(1)?,
      name:         row.get(2)?,
      size:         row.get(3)?,
      mime_type:    row.get(4)?,
      download_url: row.get(5)?,
      storage_path: row.get(6)?,
      sha256:       row.get(7)?,
      created_at:   row.get(8)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id:  decode_uuid(&self.document_id)?,
      user_id:      UserId::new(self.user_id)?,
      name:         self.name,
      size:         decode_size(self.size)?,
      mime_type:    self.mime_type,
      download_url: self.download_url,
      storage_path: BlobPath::new(self.storage_path)?,
      sha256:       self.sha256,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:  String,
  pub document_id: String,
  pub role:        String,
  pub message:     String,
  pub created_at:  String,
}

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:  row.get(0)?,
      document_id: row.get(1)?,
      role:        row.get(2)?,
      message:     row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:  decode_uuid(&self.message_id)?,
      document_id: decode_uuid(&self.document_id)?,
      role:        decode_role(&self.role)?,
      message:     self.message,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let later = base + Duration::microseconds(1500);
    let (a, b) = (encode_dt(base), encode_dt(later));
    assert!(a < b, "{a} should sort before {b}");
    assert_eq!(decode_dt(&b).unwrap(), later);
  }

  #[test]
  fn embedding_blob_is_little_endian_f32() {
    let blob = encode_embedding(&[1.0, -2.0]);
    assert_eq!(blob.len(), 8);
    assert_eq!(&blob[..4], &1.0_f32.to_le_bytes());
    assert_eq!(&blob[4..], &(-2.0_f32).to_le_bytes());
  }
}

//! Chat messages: the per-document conversation log.
//!
//! Each answered question appends one human message and one ai message, the
//! human one stamped first. Pairs from concurrent questions may interleave,
//! so the log need not strictly alternate; every ai message is preceded by
//! at least as many human messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Who authored a message.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Human,
  Ai,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub message_id:  Uuid,
  pub document_id: Uuid,
  pub role:        Role,
  pub message:     String,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::DocumentStore::append_message`].
///
/// Unlike documents, the timestamp is caller-assigned: the question is stamped
/// when it was asked, the answer when it was produced.
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub role:       Role,
  pub message:    String,
  pub created_at: DateTime<Utc>,
}

impl NewMessage {
  pub fn human(message: impl Into<String>, created_at: DateTime<Utc>) -> Self {
    Self { role: Role::Human, message: message.into(), created_at }
  }

  pub fn ai(message: impl Into<String>, created_at: DateTime<Utc>) -> Self {
    Self { role: Role::Ai, message: message.into(), created_at }
  }
}

/// Read order for [`crate::store::DocumentStore::list_messages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageOrder {
  #[default]
  OldestFirst,
  NewestFirst,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn role_wire_format_is_lowercase() {
    assert_eq!(Role::Human.to_string(), "human");
    assert_eq!(Role::Ai.to_string(), "ai");
    assert_eq!(Role::from_str("ai").unwrap(), Role::Ai);
    assert!(Role::from_str("assistant").is_err());
    assert_eq!(serde_json::to_string(&Role::Human).unwrap(), "\"human\"");
  }
}

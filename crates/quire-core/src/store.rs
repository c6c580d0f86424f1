//! The `DocumentStore` trait: users, document metadata, and chat messages.
//!
//! Implemented by storage backends (e.g. `quire-store-sqlite`). The pipeline
//! and API crates depend on this abstraction, not on any concrete backend.
//! Every document-scoped call takes the owning [`UserId`]; a document that
//! belongs to someone else is indistinguishable from a missing one.

use std::future::Future;

use uuid::Uuid;

use crate::{
  document::{Document, NewDocument, User, UserId},
  message::{Message, MessageOrder, NewMessage, Role},
};

/// Abstraction over a quire metadata store backend.
///
/// Single-record writes are atomic; nothing spans records. All methods return
/// `Send` futures so the trait can be used from axum handlers.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create the user record if it does not exist yet and return it.
  /// Existing records are returned unchanged.
  fn upsert_user<'a>(
    &'a self,
    user: &'a UserId,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  /// Retrieve a user. Returns `None` if the user has never been seen.
  fn get_user<'a>(
    &'a self,
    user: &'a UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Record the billing provider's view of the subscription, creating the
  /// user record if needed.
  fn set_membership<'a>(
    &'a self,
    user: &'a UserId,
    active: bool,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Persist a new document record. `created_at` is set by the store.
  fn create_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  fn get_document<'a>(
    &'a self,
    user: &'a UserId,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// All of a user's documents, newest first.
  fn list_documents<'a>(
    &'a self,
    user: &'a UserId,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  fn count_documents<'a>(
    &'a self,
    user: &'a UserId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Delete a document record together with its messages.
  /// Returns `false` if there was nothing to delete.
  fn delete_document<'a>(
    &'a self,
    user: &'a UserId,
    document_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Messages ──────────────────────────────────────────────────────────

  /// Append a message to a document's chat. Returns `None` if the document
  /// does not exist for `user`.
  fn append_message<'a>(
    &'a self,
    user: &'a UserId,
    document_id: Uuid,
    input: NewMessage,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + 'a;

  /// A document's chat in the requested order, optionally truncated to the
  /// first `limit` messages of that order.
  fn list_messages<'a>(
    &'a self,
    user: &'a UserId,
    document_id: Uuid,
    order: MessageOrder,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  /// Number of messages in a document's chat, optionally restricted to one
  /// role.
  fn count_messages<'a>(
    &'a self,
    user: &'a UserId,
    document_id: Uuid,
    role: Option<Role>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}

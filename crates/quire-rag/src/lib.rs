//! The quire actions layer.
//!
//! [`Rag`] composes a document store, vector index, blob store, embedder and
//! chat model into the user-facing operations: upload, ingest, ask, delete.
//! Every operation takes the caller's [`UserId`] and sees only that user's
//! documents.

use std::sync::Arc;

use quire_core::{
  blob::BlobStore,
  document::{Document, User, UserId},
  llm::{ChatModel, Embedder},
  message::{Message, MessageOrder},
  quota::{self, Action, QuotaDecision},
  store::DocumentStore,
  vector::VectorIndex,
};
use quire_text::RecursiveSplitter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod ask;
pub mod config;
mod documents;
pub mod error;
pub mod fetch;
mod ingest;
pub mod prompts;
mod upload;

pub use config::RagConfig;
pub use documents::Download;
pub use error::{RagError, Result};
pub use fetch::{FetchError, UrlFetcher};
pub use ingest::IngestReport;
pub use upload::{UPLOAD_CHUNK_BYTES, UploadEvent, UploadRequest, UploadStream};

// ─── Backend ─────────────────────────────────────────────────────────────────

/// The concrete service types a deployment plugs into [`Rag`].
pub trait Backend: Send + Sync + 'static {
  type Store: DocumentStore + 'static;
  type Vectors: VectorIndex + 'static;
  type Blobs: BlobStore + 'static;
  type Embedder: Embedder + 'static;
  type Model: ChatModel + 'static;
}

/// Handles to the external services, opened once per process.
pub struct Services<B: Backend> {
  pub store:    Arc<B::Store>,
  pub vectors:  Arc<B::Vectors>,
  pub blobs:    Arc<B::Blobs>,
  pub embedder: Arc<B::Embedder>,
  pub model:    Arc<B::Model>,
}

impl<B: Backend> Clone for Services<B> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      vectors:  Arc::clone(&self.vectors),
      blobs:    Arc::clone(&self.blobs),
      embedder: Arc::clone(&self.embedder),
      model:    Arc::clone(&self.model),
    }
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Result of a gated action. `success: false` is a quota refusal and
/// `message` is meant for the end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
  pub success: bool,
  pub message: Option<String>,
}

impl Outcome {
  pub fn ok(message: Option<String>) -> Self { Self { success: true, message } }

  pub fn refused(message: impl Into<String>) -> Self {
    Self { success: false, message: Some(message.into()) }
  }
}

/// A user's plan and how close they are to the document limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub user_id:               UserId,
  pub has_active_membership: bool,
  pub document_count:        u64,
  /// `None` when the plan is uncapped.
  pub file_limit:            Option<u64>,
  pub is_over_file_limit:    bool,
}

// ─── Rag ─────────────────────────────────────────────────────────────────────

pub struct Rag<B: Backend> {
  services: Services<B>,
  fetcher:  UrlFetcher,
  splitter: RecursiveSplitter,
  config:   RagConfig,
}

impl<B: Backend> Clone for Rag<B> {
  fn clone(&self) -> Self {
    Self {
      services: self.services.clone(),
      fetcher:  self.fetcher.clone(),
      splitter: self.splitter.clone(),
      config:   self.config,
    }
  }
}

impl<B: Backend> Rag<B> {
  pub fn new(services: Services<B>, config: RagConfig) -> Result<Self> {
    let splitter =
      RecursiveSplitter::new(config.chunking).map_err(|e| RagError::Config(e.to_string()))?;
    let fetcher =
      UrlFetcher::new(std::time::Duration::from_secs(config.fetch_timeout_secs))?;
    Ok(Self { services, fetcher, splitter, config })
  }

  pub fn config(&self) -> &RagConfig { &self.config }

  pub fn services(&self) -> &Services<B> { &self.services }

  /// Record a user on first sight. Idempotent.
  pub async fn register(&self, user: &UserId) -> Result<User> {
    self.services.store.upsert_user(user).await.map_err(RagError::store)
  }

  pub async fn subscription(&self, user: &UserId) -> Result<Subscription> {
    let has_active_membership = self.has_active_membership(user).await?;
    let document_count = self
      .services
      .store
      .count_documents(user)
      .await
      .map_err(RagError::store)?;
    let file_limit = self.config.quota.limit_for(has_active_membership);

    Ok(Subscription {
      user_id: user.clone(),
      has_active_membership,
      document_count,
      file_limit,
      is_over_file_limit: file_limit.is_some_and(|limit| document_count >= limit),
    })
  }

  pub async fn documents(&self, user: &UserId) -> Result<Vec<Document>> {
    self.services.store.list_documents(user).await.map_err(RagError::store)
  }

  pub async fn document(&self, user: &UserId, document_id: Uuid) -> Result<Document> {
    self
      .services
      .store
      .get_document(user, document_id)
      .await
      .map_err(RagError::store)?
      .ok_or(RagError::DocumentNotFound(document_id))
  }

  /// The document's chat, oldest first.
  pub async fn messages(&self, user: &UserId, document_id: Uuid) -> Result<Vec<Message>> {
    self.document(user, document_id).await?;
    self
      .services
      .store
      .list_messages(user, document_id, MessageOrder::OldestFirst, None)
      .await
      .map_err(RagError::store)
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// Users without a stored record are on the free tier.
  async fn has_active_membership(&self, user: &UserId) -> Result<bool> {
    let record = self.services.store.get_user(user).await.map_err(RagError::store)?;
    Ok(record.is_some_and(|u| u.has_active_membership))
  }

  /// Run the quota gate for `action`; `Some(message)` means refused.
  async fn gate(&self, user: &UserId, action: Action, count: u64) -> Result<Option<String>> {
    let member = self.has_active_membership(user).await?;
    match quota::check(action, count, member, &self.config.quota) {
      QuotaDecision::Allowed => Ok(None),
      QuotaDecision::Exceeded { message } => {
        tracing::info!(%user, ?action, count, member, "quota refused action");
        Ok(Some(message))
      }
    }
  }
}

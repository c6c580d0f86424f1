//! Document deletion and download.

use bytes::Bytes;
use quire_core::{
  blob::BlobStore,
  document::{Document, UserId},
  quota::Action,
  store::DocumentStore,
  vector::VectorIndex,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Backend, Outcome, Rag, RagError, Result};

/// A document's metadata together with its stored bytes.
#[derive(Debug, Clone)]
pub struct Download {
  pub document: Document,
  pub bytes:    Bytes,
}

impl<B: Backend> Rag<B> {
  /// Remove a document's vectors, then its blob, then its metadata record.
  ///
  /// Metadata goes last: if a step fails the document is still listed and the
  /// delete can be retried. Each step tolerates already-missing data.
  pub async fn delete(&self, user: &UserId, document_id: Uuid) -> Result<Outcome> {
    let document = self.document(user, document_id).await?;

    if let Some(message) = self.gate(user, Action::DeleteDocument, 0).await? {
      return Ok(Outcome::refused(message));
    }

    let namespace = document.namespace();
    self
      .services
      .vectors
      .delete_namespace(&namespace)
      .await
      .map_err(RagError::vectors)?;
    self
      .services
      .blobs
      .delete(&document.storage_path)
      .await
      .map_err(RagError::blob)?;
    let removed = self
      .services
      .store
      .delete_document(user, document_id)
      .await
      .map_err(RagError::store)?;

    if !removed {
      // Lost a race with another delete; the end state is the same.
      warn!(%document_id, "document record already gone");
    }
    info!(%user, %document_id, "deleted document");
    Ok(Outcome::ok(None))
  }

  pub async fn download(&self, user: &UserId, document_id: Uuid) -> Result<Download> {
    let document = self.document(user, document_id).await?;
    let bytes = self
      .services
      .blobs
      .read(&document.storage_path)
      .await
      .map_err(RagError::blob)?
      .ok_or_else(|| RagError::Blob(format!("blob {} is missing", document.storage_path).into()))?;
    Ok(Download { document, bytes })
  }
}

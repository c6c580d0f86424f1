//! Upload as a stream of progress events.
//!
//! The stream is lazy: each poll performs the next step (write a chunk,
//! publish the blob, save metadata, embed) and yields the event describing
//! it. Dropping the stream stops the upload after the step in flight. A blob
//! written by an abandoned upload is removed in the background unless its
//! metadata record was already saved.

use std::{pin::Pin, sync::Arc};

use bytes::Bytes;
use futures::{Stream, stream};
use quire_core::{
  blob::{BlobPath, BlobStore},
  document::{Document, NewDocument, UserId},
  quota::Action,
  store::DocumentStore,
};
use quire_text::{PDF_MIME_TYPE, is_pdf};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Backend, Rag, RagError, Result};

/// Bytes written to the blob store per progress event.
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

pub type UploadStream = Pin<Box<dyn Stream<Item = Result<UploadEvent>> + Send>>;

#[derive(Debug, Clone)]
pub struct UploadRequest {
  pub name:      String,
  pub mime_type: String,
  pub bytes:     Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadEvent {
  Uploading { percent: u8, bytes_transferred: u64, total_bytes: u64 },
  Uploaded { document_id: Uuid },
  Saving { document_id: Uuid },
  Generating { document_id: Uuid },
  Complete { document: Document, chunks: u64 },
  /// The quota gate refused the upload; nothing was stored.
  Rejected { message: String },
}

impl UploadEvent {
  /// Short status line for display.
  pub fn label(&self) -> &'static str {
    match self {
      Self::Uploading { .. } => "Uploading file...",
      Self::Uploaded { .. } => "File uploaded successfully",
      Self::Saving { .. } => "Saving file to database",
      Self::Generating { .. } => "Generating AI embeddings, This will only take a few seconds...",
      Self::Complete { .. } => "Ready",
      Self::Rejected { .. } => "Upload rejected",
    }
  }

  pub fn is_terminal(&self) -> bool { matches!(self, Self::Complete { .. } | Self::Rejected { .. }) }
}

impl<B: Backend> Rag<B> {
  /// Start an upload. Nothing happens until the stream is polled.
  pub fn upload(&self, user: UserId, request: UploadRequest) -> UploadStream {
    let job = UploadJob::new(self.clone(), user, request);
    Box::pin(stream::unfold(job, |mut job| async move {
      let item = job.next_event().await.transpose()?;
      Some((item, job))
    }))
  }
}

// ─── Job ─────────────────────────────────────────────────────────────────────

enum Stage {
  Admit,
  Write { offset: usize },
  Publish,
  AnnounceSave { url: String },
  Save { url: String },
  Generate { document: Box<Document> },
  Done,
}

struct UploadJob<B: Backend> {
  rag:          Rag<B>,
  user:         UserId,
  request:      UploadRequest,
  document_id:  Uuid,
  path:         BlobPath,
  hasher:       Sha256,
  stage:        Stage,
  /// Bytes are in the blob store but no metadata record points at them.
  pending_blob: bool,
}

impl<B: Backend> UploadJob<B> {
  fn new(rag: Rag<B>, user: UserId, request: UploadRequest) -> Self {
    let document_id = Uuid::new_v4();
    let path = BlobPath::for_document(&user, document_id);
    Self {
      rag,
      user,
      request,
      document_id,
      path,
      hasher: Sha256::new(),
      stage: Stage::Admit,
      pending_blob: false,
    }
  }

  /// Advance one step. `Ok(None)` ends the stream; so does any error, since
  /// the stage is left at `Done`.
  async fn next_event(&mut self) -> Result<Option<UploadEvent>> {
    match std::mem::replace(&mut self.stage, Stage::Done) {
      Stage::Admit => {
        if let Some(message) = self.admit().await? {
          return Ok(Some(UploadEvent::Rejected { message }));
        }
        self.write(0).await.map(Some)
      }
      Stage::Write { offset } => self.write(offset).await.map(Some),
      Stage::Publish => {
        let url = self
          .rag
          .services
          .blobs
          .finish(&self.path)
          .await
          .map_err(RagError::blob)?;
        self.stage = Stage::AnnounceSave { url };
        Ok(Some(UploadEvent::Uploaded { document_id: self.document_id }))
      }
      Stage::AnnounceSave { url } => {
        self.stage = Stage::Save { url };
        Ok(Some(UploadEvent::Saving { document_id: self.document_id }))
      }
      Stage::Save { url } => {
        let document = self.save(url).await?;
        self.stage = Stage::Generate { document: Box::new(document) };
        Ok(Some(UploadEvent::Generating { document_id: self.document_id }))
      }
      Stage::Generate { document } => {
        let report = self.rag.ingest_document(&document).await?;
        info!(
          user = %self.user,
          document_id = %self.document_id,
          chunks = report.chunks,
          "upload complete"
        );
        Ok(Some(UploadEvent::Complete { document: *document, chunks: report.chunks }))
      }
      Stage::Done => Ok(None),
    }
  }

  /// Validate the request (including a full parse of the PDF) and run the
  /// quota gate. `Some(message)` is a quota refusal; malformed uploads are
  /// errors.
  async fn admit(&self) -> Result<Option<String>> {
    let req = &self.request;
    if req.name.trim().is_empty() {
      return Err(RagError::InvalidUpload("file name is required".into()));
    }
    if req.bytes.is_empty() {
      return Err(RagError::InvalidUpload("file is empty".into()));
    }
    let essence = req.mime_type.split(';').next().unwrap_or_default().trim();
    if !essence.eq_ignore_ascii_case(PDF_MIME_TYPE) {
      return Err(RagError::InvalidUpload(format!(
        "only {PDF_MIME_TYPE} is accepted, got {:?}",
        req.mime_type
      )));
    }
    if !is_pdf(&req.bytes) {
      return Err(RagError::InvalidUpload("file is not a PDF".into()));
    }
    // Parse before storing anything: a document that cannot be embedded must
    // not count towards the user's limit.
    let bytes = req.bytes.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || quire_text::load_pdf(&bytes)).await? {
      return Err(RagError::InvalidUpload(format!("file could not be read: {e}")));
    }

    let owned = self
      .rag
      .services
      .store
      .count_documents(&self.user)
      .await
      .map_err(RagError::store)?;
    self.rag.gate(&self.user, Action::UploadDocument, owned).await
  }

  async fn write(&mut self, offset: usize) -> Result<UploadEvent> {
    let total = self.request.bytes.len();
    let end = (offset + UPLOAD_CHUNK_BYTES).min(total);
    let chunk = self.request.bytes.slice(offset..end);

    self.pending_blob = true;
    self
      .rag
      .services
      .blobs
      .write_chunk(&self.path, offset as u64, chunk.clone())
      .await
      .map_err(RagError::blob)?;
    self.hasher.update(&chunk);

    self.stage = if end == total { Stage::Publish } else { Stage::Write { offset: end } };
    Ok(UploadEvent::Uploading {
      percent:           (end * 100 / total) as u8,
      bytes_transferred: end as u64,
      total_bytes:       total as u64,
    })
  }

  async fn save(&mut self, url: String) -> Result<Document> {
    let sha256 = hex::encode(std::mem::take(&mut self.hasher).finalize());
    let document = self
      .rag
      .services
      .store
      .create_document(NewDocument {
        document_id: self.document_id,
        user_id: self.user.clone(),
        name: self.request.name.trim().to_owned(),
        size: self.request.bytes.len() as u64,
        mime_type: PDF_MIME_TYPE.to_owned(),
        download_url: Some(url),
        storage_path: self.path.clone(),
        sha256,
      })
      .await
      .map_err(RagError::store)?;
    self.pending_blob = false;
    Ok(document)
  }
}

impl<B: Backend> Drop for UploadJob<B> {
  fn drop(&mut self) {
    if !self.pending_blob {
      return;
    }
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
      warn!(path = %self.path, "abandoned upload left behind, no runtime to clean it up");
      return;
    };
    let blobs = Arc::clone(&self.rag.services.blobs);
    let path = self.path.clone();
    runtime.spawn(async move {
      match blobs.delete(&path).await {
        Ok(()) => info!(%path, "removed abandoned upload"),
        Err(e) => warn!(%path, error = %e, "failed to remove abandoned upload"),
      }
    });
  }
}

//! Ingestion: download URL → pages → chunks → embeddings → vector namespace.

use quire_core::{
  document::{Document, UserId},
  llm::Embedder,
  vector::{VectorIndex, VectorRecord},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Backend, Rag, RagError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
  pub namespace: String,
  /// Vectors in the namespace after ingestion.
  pub chunks:    u64,
  /// True when the namespace was already populated and nothing was embedded.
  pub reused:    bool,
}

/// Vector ids are derived from the document and chunk position, so writing
/// the same chunk twice overwrites rather than duplicates.
fn vector_id(document_id: Uuid, index: u32) -> Uuid {
  Uuid::new_v5(&document_id, &index.to_be_bytes())
}

impl<B: Backend> Rag<B> {
  /// Embed a document into its vector namespace unless that namespace
  /// already holds vectors.
  pub async fn ingest(&self, user: &UserId, document_id: Uuid) -> Result<IngestReport> {
    let document = self.document(user, document_id).await?;
    self.ingest_document(&document).await
  }

  pub(crate) async fn ingest_document(&self, document: &Document) -> Result<IngestReport> {
    let namespace = document.namespace();
    let vectors = &self.services.vectors;

    if vectors.namespace_exists(&namespace).await.map_err(RagError::vectors)? {
      let chunks = vectors.count(&namespace).await.map_err(RagError::vectors)?;
      info!(%namespace, chunks, "namespace already populated, reusing");
      return Ok(IngestReport { namespace, chunks, reused: true });
    }

    let url = document
      .download_url
      .as_deref()
      .ok_or(RagError::DownloadUrlMissing(document.document_id))?;

    info!(document_id = %document.document_id, "fetching document");
    let bytes = self.fetcher.fetch(url).await?;

    let mut pages = tokio::task::spawn_blocking(move || quire_text::load_pdf(&bytes)).await??;
    if let Some(max) = self.config.ingest.max_pages {
      pages.truncate(max);
    }
    let chunks = self.splitter.split_pages(&pages);
    debug!(pages = pages.len(), chunks = chunks.len(), "split document");

    info!(%namespace, "generating embeddings");
    let batch_size = self.config.ingest.embed_batch_size.max(1);
    let mut records = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size) {
      let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
      let embeddings = self
        .services
        .embedder
        .embed_documents(&texts)
        .await
        .map_err(RagError::model)?;
      if embeddings.len() != batch.len() {
        return Err(RagError::Model(
          format!("embedder returned {} vectors for {} chunks", embeddings.len(), batch.len())
            .into(),
        ));
      }
      records.extend(batch.iter().cloned().zip(embeddings).map(|(chunk, embedding)| {
        VectorRecord { id: vector_id(document.document_id, chunk.index), chunk, embedding }
      }));
    }

    // One upsert at the end: a failure part-way leaves the namespace empty,
    // so the next attempt starts over instead of reusing a partial index.
    let total = records.len() as u64;
    vectors.upsert(&namespace, records).await.map_err(RagError::vectors)?;
    info!(%namespace, chunks = total, "stored embeddings");

    Ok(IngestReport { namespace, chunks: total, reused: false })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vector_ids_are_stable_per_chunk() {
    let doc = Uuid::new_v4();
    assert_eq!(vector_id(doc, 3), vector_id(doc, 3));
    assert_ne!(vector_id(doc, 3), vector_id(doc, 4));
    assert_ne!(vector_id(doc, 3), vector_id(Uuid::new_v4(), 3));
  }
}

//! Typed pipeline configuration with documented defaults.
//!
//! Every struct deserialises with `#[serde(default)]`, so a config file only
//! needs to mention the fields it overrides.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How extracted text is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
  /// Maximum chunk length in characters.
  pub chunk_size:    usize,
  /// Characters shared between consecutive chunks. Must be below
  /// `chunk_size`.
  pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
  fn default() -> Self { Self { chunk_size: 1000, chunk_overlap: 200 } }
}

impl ChunkingConfig {
  pub fn validate(&self) -> Result<()> {
    if self.chunk_size == 0 {
      return Err(Error::InvalidConfig("chunk_size must be positive".into()));
    }
    if self.chunk_overlap >= self.chunk_size {
      return Err(Error::InvalidConfig(format!(
        "chunk_overlap ({}) must be smaller than chunk_size ({})",
        self.chunk_overlap, self.chunk_size
      )));
    }
    Ok(())
  }
}

/// How the conversational pipeline retrieves context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
  /// Chunks retrieved per question.
  pub top_k:         usize,
  /// Most recent messages replayed into prompts; `None` replays the whole
  /// chat.
  pub history_limit: Option<usize>,
}

impl Default for RetrievalConfig {
  fn default() -> Self { Self { top_k: 4, history_limit: Some(20) } }
}

/// How documents are embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  /// Chunks sent to the embedder per request.
  pub embed_batch_size: usize,
  /// Only the first `max_pages` pages are indexed, when set.
  pub max_pages:        Option<usize>,
}

impl Default for IngestConfig {
  fn default() -> Self { Self { embed_batch_size: 64, max_pages: None } }
}

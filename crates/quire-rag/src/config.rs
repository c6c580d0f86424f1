//! Pipeline configuration.

use quire_core::{
  config::{ChunkingConfig, IngestConfig, RetrievalConfig},
  quota::QuotaConfig,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
  pub chunking:           ChunkingConfig,
  pub retrieval:          RetrievalConfig,
  pub ingest:             IngestConfig,
  pub quota:              QuotaConfig,
  /// Timeout for fetching a document by its download URL.
  pub fetch_timeout_secs: u64,
}

impl Default for RagConfig {
  fn default() -> Self {
    Self {
      chunking:           ChunkingConfig::default(),
      retrieval:          RetrievalConfig::default(),
      ingest:             IngestConfig::default(),
      quota:              QuotaConfig::default(),
      fetch_timeout_secs: 60,
    }
  }
}

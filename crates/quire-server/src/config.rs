//! Runtime server configuration.
//!
//! Layered from an optional TOML file and `QUIRE_*` environment variables,
//! with `__` separating nested keys (`QUIRE_OPENAI__API_KEY`,
//! `QUIRE_RAG__RETRIEVAL__TOP_K`).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use quire_api::{AuthConfig, DEFAULT_MAX_UPLOAD_BYTES};
use quire_openai::OpenAiConfig;
use quire_rag::RagConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  /// SQLite file holding users, documents, messages and vectors.
  pub store_path:           PathBuf,
  /// Directory uploaded PDFs are written under.
  pub blob_root:            PathBuf,
  pub max_upload_bytes:     usize,
  /// Width of the embedding model's vectors. Fixed once the store is
  /// created; opening it with another width is refused.
  pub embedding_dimensions: usize,
  pub auth:                 AuthConfig,
  pub openai:               OpenAiConfig,
  pub rag:                  RagConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".to_owned(),
      port:                 8080,
      store_path:           PathBuf::from("quire.db"),
      blob_root:            PathBuf::from("blobs"),
      max_upload_bytes:     DEFAULT_MAX_UPLOAD_BYTES,
      // text-embedding-ada-002
      embedding_dimensions: 1536,
      auth:                 AuthConfig::default(),
      openai:               OpenAiConfig::default(),
      rag:                  RagConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("QUIRE")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config from {path:?}"))?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;

    // Fall back to the variable every OpenAI tool reads.
    if cfg.openai.api_key.is_empty()
      && let Ok(key) = std::env::var("OPENAI_API_KEY")
    {
      cfg.openai.api_key = key;
    }
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

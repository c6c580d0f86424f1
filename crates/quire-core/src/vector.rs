//! The vector index abstraction. One namespace of embedded chunks per
//! document.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded span of extracted document text; the unit of embedding and
/// retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
  pub text:  String,
  /// 1-based page the chunk was cut from, when known.
  pub page:  Option<u32>,
  /// Position of the chunk within its document, starting at 0.
  pub index: u32,
}

/// A chunk together with its embedding, ready to be upserted.
#[derive(Debug, Clone)]
pub struct VectorRecord {
  pub id:        Uuid,
  pub chunk:     Chunk,
  pub embedding: Vec<f32>,
}

/// A retrieved chunk and its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
  pub chunk: Chunk,
  pub score: f32,
}

/// Abstraction over a namespaced vector index.
pub trait VectorIndex: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether `namespace` holds at least one vector.
  fn namespace_exists<'a>(
    &'a self,
    namespace: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Number of vectors stored in `namespace`.
  fn count<'a>(
    &'a self,
    namespace: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Insert or replace `records` in `namespace`, keyed by record id.
  fn upsert<'a>(
    &'a self,
    namespace: &'a str,
    records: Vec<VectorRecord>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The `top_k` chunks most similar to `embedding`, best first.
  fn query<'a>(
    &'a self,
    namespace: &'a str,
    embedding: &'a [f32],
    top_k: usize,
  ) -> impl Future<Output = Result<Vec<ScoredChunk>, Self::Error>> + Send + 'a;

  /// Remove every vector in `namespace`. A missing namespace is a no-op.
  fn delete_namespace<'a>(
    &'a self,
    namespace: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

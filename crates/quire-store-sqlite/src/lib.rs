//! SQLite backend for quire: document store and vector index.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] implements both
//! [`quire_core::store::DocumentStore`] and
//! [`quire_core::vector::VectorIndex`]; similarity search runs inside SQLite
//! through the sqlite-vec extension.

mod encode;
mod extension;
mod schema;
mod store;
mod vectors;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;

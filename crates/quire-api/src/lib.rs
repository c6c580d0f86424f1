//! JSON HTTP API for quire.
//!
//! Exposes an axum [`Router`] over a [`quire_rag::Rag`]. Every `/api` route
//! requires HTTP Basic credentials; TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! axum::serve(listener, quire_api::router(state)).await?;
//! ```

pub mod auth;
pub mod chat;
pub mod documents;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use quire_rag::{Backend, Rag};

pub use auth::{Account, AuthConfig, Caller};
pub use error::ApiError;

/// Uploads above this size are refused with 413 unless configured otherwise.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Shared state threaded through all handlers.
pub struct AppState<B: Backend> {
  pub rag:              Rag<B>,
  pub auth:             Arc<AuthConfig>,
  pub max_upload_bytes: usize,
}

impl<B: Backend> Clone for AppState<B> {
  fn clone(&self) -> Self {
    Self {
      rag:              self.rag.clone(),
      auth:             Arc::clone(&self.auth),
      max_upload_bytes: self.max_upload_bytes,
    }
  }
}

/// The `/api` routes alone, for nesting under another router.
pub fn api_router<B: Backend>(state: AppState<B>) -> Router<()> {
  let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);
  Router::new()
    // Account
    .route("/me", get(documents::me::<B>))
    // Documents
    .route(
      "/documents",
      get(documents::list::<B>).post(documents::upload::<B>).layer(upload_limit),
    )
    .route(
      "/documents/{id}",
      get(documents::get_one::<B>).delete(documents::delete_one::<B>),
    )
    .route("/documents/{id}/file", get(documents::download::<B>))
    .route("/documents/{id}/ingest", post(documents::ingest::<B>))
    // Chat
    .route("/documents/{id}/messages", get(chat::messages::<B>))
    .route("/documents/{id}/ask", post(chat::ask::<B>))
    .with_state(state)
}

/// Full application router: `/healthz` plus everything under `/api`.
pub fn router<B: Backend>(state: AppState<B>) -> Router<()> {
  Router::new()
    .route("/healthz", get(|| async { "ok" }))
    .nest("/api", api_router(state))
}

//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use quire_rag::RagError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("payload too large: {0}")]
  PayloadTooLarge(String),

  /// A model provider or remote download failed.
  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<RagError> for ApiError {
  fn from(e: RagError) -> Self {
    let message = e.to_string();
    match e {
      RagError::DocumentNotFound(_)
      | RagError::DownloadUrlMissing(_)
      | RagError::VectorStoreMissing(_) => Self::NotFound(message),
      RagError::InvalidUpload(_) | RagError::EmptyQuestion | RagError::Pdf(_) => {
        Self::BadRequest(message)
      }
      RagError::Fetch(_) | RagError::Model(_) => Self::Upstream(message),
      RagError::Config(_)
      | RagError::Task(_)
      | RagError::Store(_)
      | RagError::Vectors(_)
      | RagError::Blob(_) => Self::Internal(message),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"quire\""),
      );
    }
    res
  }
}

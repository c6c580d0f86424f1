//! Handlers for `/me` and `/documents` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/me` | Plan and document count |
//! | `GET`    | `/documents` | Newest first |
//! | `POST`   | `/documents?name=<file name>` | Raw PDF body; NDJSON progress stream |
//! | `GET`    | `/documents/{id}` | 404 if not found |
//! | `DELETE` | `/documents/{id}` | Quota refusals are `200` with `success: false` |
//! | `GET`    | `/documents/{id}/file` | PDF bytes; honours `If-None-Match` |
//! | `POST`   | `/documents/{id}/ingest` | Embed now if not yet embedded |

use std::convert::Infallible;

use axum::{
  Json,
  body::Body,
  extract::{Path, Query, State, rejection::BytesRejection},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{StreamExt as _, stream};
use quire_core::document::Document;
use quire_rag::{Backend, IngestReport, Outcome, RagError, Subscription, UploadRequest};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, Caller, error::ApiError};

pub const NDJSON: &str = "application/x-ndjson";

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
) -> Result<Json<Subscription>, ApiError> {
  Ok(Json(state.rag.subscription(&user).await?))
}

// ─── List / get ───────────────────────────────────────────────────────────────

/// `GET /documents`
pub async fn list<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
) -> Result<Json<Vec<Document>>, ApiError> {
  Ok(Json(state.rag.documents(&user).await?))
}

/// `GET /documents/{id}`
pub async fn get_one<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
  Ok(Json(state.rag.document(&user, id).await?))
}

// ─── Upload ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub name: String,
}

fn ndjson_line(value: &impl serde::Serialize) -> Bytes {
  let mut line = serde_json::to_vec(value).unwrap_or_default();
  line.push(b'\n');
  Bytes::from(line)
}

/// `POST /documents?name=<file name>`
///
/// The body is the raw file; its type comes from `Content-Type`. Validation
/// failures are answered with a plain error status. Once the upload starts,
/// the response is one JSON [`quire_rag::UploadEvent`] per line; an error after that
/// point is reported as a final `{"status":"failed","error":...}` line.
/// Closing the connection cancels the upload.
pub async fn upload<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
  Query(params): Query<UploadParams>,
  headers: HeaderMap,
  body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
  let bytes = body.map_err(|rejection| {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
      ApiError::PayloadTooLarge(format!("uploads are limited to {} bytes", state.max_upload_bytes))
    } else {
      ApiError::BadRequest(rejection.body_text())
    }
  })?;
  let mime_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .to_owned();

  let mut events = state.rag.upload(user, UploadRequest { name: params.name, mime_type, bytes });

  // Surface validation errors as a status code rather than a stream line.
  let first = match events.next().await {
    Some(Ok(event)) => event,
    Some(Err(e)) => return Err(e.into()),
    None => return Err(ApiError::Internal("upload produced no events".into())),
  };

  let lines = stream::once(async move { Ok::<_, RagError>(first) })
    .chain(events)
    .map(|item| match item {
      Ok(event) => ndjson_line(&event),
      Err(e) => {
        tracing::warn!(error = %e, "upload failed mid-stream");
        ndjson_line(&json!({ "status": "failed", "error": e.to_string() }))
      }
    })
    .map(Ok::<_, Infallible>);

  Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(lines)).into_response())
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /documents/{id}`
pub async fn delete_one<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Outcome>, ApiError> {
  Ok(Json(state.rag.delete(&user, id).await?))
}

// ─── Download ─────────────────────────────────────────────────────────────────

/// `GET /documents/{id}/file`
///
/// The ETag is the SHA-256 of the stored bytes.
pub async fn download<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<Response, ApiError> {
  let document = state.rag.document(&user, id).await?;
  let etag = format!("\"{}\"", document.sha256);

  let fresh = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*"));
  if fresh {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }

  let download = state.rag.download(&user, id).await?;
  let header_value =
    |v: String| HeaderValue::from_str(&v).map_err(|e| ApiError::Internal(e.to_string()));
  let safe_name = document.name.replace(['"', '\\'], "_");

  let headers = [
    (header::CONTENT_TYPE, header_value(document.mime_type)?),
    (header::ETAG, header_value(etag)?),
    (header::CONTENT_DISPOSITION, header_value(format!("inline; filename=\"{safe_name}\""))?),
  ];
  Ok((headers, download.bytes).into_response())
}

// ─── Ingest ───────────────────────────────────────────────────────────────────

/// `POST /documents/{id}/ingest`
pub async fn ingest<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<IngestReport>, ApiError> {
  Ok(Json(state.rag.ingest(&user, id).await?))
}

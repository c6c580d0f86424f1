//! Handlers for a document's chat.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/documents/{id}/messages` | Oldest first |
//! | `POST` | `/documents/{id}/ask` | Body: `{"question":"..."}`; quota refusals are `200` with `success: false` |

use axum::{
  Json,
  extract::{Path, State},
};
use quire_core::message::Message;
use quire_rag::{Backend, Outcome};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, Caller, error::ApiError};

/// `GET /documents/{id}/messages`
pub async fn messages<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
  Ok(Json(state.rag.messages(&user, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AskBody {
  pub question: String,
}

/// `POST /documents/{id}/ask`
pub async fn ask<B: Backend>(
  State(state): State<AppState<B>>,
  Caller(user): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<AskBody>,
) -> Result<Json<Outcome>, ApiError> {
  Ok(Json(state.rag.ask(&user, id, &body.question).await?))
}

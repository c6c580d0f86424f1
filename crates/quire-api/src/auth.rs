//! HTTP Basic-auth extractor yielding the caller's [`UserId`].

use std::sync::OnceLock;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use quire_core::document::UserId;
use quire_rag::Backend;
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// One login accepted by this server.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  /// Identity used for storage; defaults to the username.
  #[serde(default)]
  pub user_id:       Option<UserId>,
}

impl Account {
  pub fn user_id(&self) -> Result<UserId, ApiError> {
    match &self.user_id {
      Some(id) => Ok(id.clone()),
      None => UserId::new(self.username.clone()).map_err(|e| ApiError::Internal(e.to_string())),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
  #[serde(default)]
  pub accounts: Vec<Account>,
}

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

/// Check Basic credentials in `headers` against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<UserId, ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  // Unknown usernames still pay for one argon2 verification, so response
  // time does not reveal which accounts exist.
  let account = config.accounts.iter().find(|a| a.username == username);
  let hash = match account {
    Some(a) => a.password_hash.as_str(),
    None => dummy_hash(),
  };

  let verified = PasswordHash::new(hash)
    .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok());

  match account {
    Some(account) if verified => account.user_id(),
    _ => Err(ApiError::Unauthorized),
  }
}

/// A hash no account owns, made with the same parameters as real ones.
fn dummy_hash() -> &'static str {
  static DUMMY: OnceLock<String> = OnceLock::new();
  DUMMY.get_or_init(|| {
    SaltString::encode_b64(b"quire-no-account")
      .and_then(|salt| Argon2::default().hash_password(b"", &salt).map(|h| h.to_string()))
      .unwrap_or_default()
  })
}

impl<B: Backend> FromRequestParts<AppState<B>> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<B>,
  ) -> Result<Self, Self::Rejection> {
    let user = verify_auth(&parts.headers, &state.auth)?;
    state.rag.register(&user).await?;
    Ok(Caller(user))
  }
}

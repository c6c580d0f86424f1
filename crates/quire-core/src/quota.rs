//! The quota gate: free/pro usage limits.
//!
//! Pure policy. Callers read the relevant count and the membership flag from
//! their store and ask [`check`] whether the action may proceed.

use serde::{Deserialize, Serialize};

/// Something a user can be limited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  /// `count` is the number of questions already asked about the document.
  AskQuestion,
  /// `count` is the number of documents the user already has.
  UploadDocument,
  /// `count` is ignored.
  DeleteDocument,
}

/// Limits applied by [`check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
  /// Questions per document and documents per user on the free tier.
  pub free_limit:      u64,
  /// The same limits for members. `None` leaves members uncapped.
  pub pro_limit:       Option<u64>,
  /// Whether deleting documents requires an active membership.
  pub pro_only_delete: bool,
}

impl Default for QuotaConfig {
  fn default() -> Self {
    Self { free_limit: 3, pro_limit: Some(100), pro_only_delete: true }
  }
}

impl QuotaConfig {
  /// The limit that applies to a user, or `None` when uncapped.
  pub fn limit_for(&self, has_active_membership: bool) -> Option<u64> {
    if has_active_membership { self.pro_limit } else { Some(self.free_limit) }
  }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
  Allowed,
  /// The action is refused; `message` is meant for the end user.
  Exceeded { message: String },
}

impl QuotaDecision {
  pub fn is_allowed(&self) -> bool { matches!(self, Self::Allowed) }
}

/// Decide whether `action` may proceed for a user who already has `count` of
/// the limited resource.
pub fn check(
  action: Action,
  count: u64,
  has_active_membership: bool,
  config: &QuotaConfig,
) -> QuotaDecision {
  let (verb, noun) = match action {
    Action::AskQuestion => ("ask", "questions"),
    Action::UploadDocument => ("upload", "documents"),
    Action::DeleteDocument => return check_delete(has_active_membership, config),
  };

  match config.limit_for(has_active_membership) {
    Some(limit) if count >= limit => {
      let message = if has_active_membership {
        format!("You've reached the PRO limit and can't {verb} more than {limit} {noun}.")
      } else {
        format!("You'll need to upgrade to PRO to {verb} more than {limit} {noun}!")
      };
      QuotaDecision::Exceeded { message }
    }
    _ => QuotaDecision::Allowed,
  }
}

fn check_delete(has_active_membership: bool, config: &QuotaConfig) -> QuotaDecision {
  if config.pro_only_delete && !has_active_membership {
    QuotaDecision::Exceeded {
      message: "Deleting documents is a PRO feature.".to_string(),
    }
  } else {
    QuotaDecision::Allowed
  }
}

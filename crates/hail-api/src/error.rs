//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error response carries a machine-checkable `reason` code alongside
//! the human-readable message, so polling clients can branch without
//! matching on strings.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{message}")]
  NotFound {
    message: String,
    reason:  &'static str,
  },

  #[error("{message}")]
  Conflict {
    message: String,
    reason:  &'static str,
  },

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn not_found(message: impl Into<String>) -> Self {
    Self::NotFound {
      message: message.into(),
      reason:  "not_found",
    }
  }

  /// Map a backend error onto the wire taxonomy by locating the domain
  /// error in its source chain; anything without one is a 500.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut cursor: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(current) = cursor {
      if let Some(core) = current.downcast_ref::<hail_core::Error>() {
        return Self::from_core(core);
      }
      cursor = current.source();
    }
    Self::Store(Box::new(err))
  }

  fn from_core(err: &hail_core::Error) -> Self {
    use hail_core::Error as E;
    let message = err.to_string();
    match err {
      E::TripNotFound(_) => Self::NotFound {
        message,
        reason: "not_found",
      },
      E::AlreadyAssigned(_) => Self::Conflict {
        message,
        reason: "already_assigned",
      },
      E::InvalidState { .. } => Self::Conflict {
        message,
        reason: "invalid_state",
      },
      E::OfferConflict(_) => Self::Conflict {
        message,
        reason: "offer_conflict",
      },
      E::OfferExpired(_) => Self::Conflict {
        message,
        reason: "offer_expired",
      },
      E::OfferNotHeld { .. } => Self::Conflict {
        message,
        reason: "offer_not_held",
      },
      E::UnknownStatus(_) => Self::Store(message.into()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, reason, message) = match &self {
      ApiError::NotFound { message, reason } => {
        (StatusCode::NOT_FOUND, *reason, message.clone())
      }
      ApiError::Conflict { message, reason } => {
        (StatusCode::CONFLICT, *reason, message.clone())
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, "bad_request", m.clone())
      }
      ApiError::Store(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
      }
    };
    (status, Json(json!({ "error": message, "reason": reason })))
      .into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn domain_errors_are_found_through_the_source_chain() {
    let core = hail_core::Error::AlreadyAssigned(Uuid::new_v4());
    let wrapped = hail_store_sqlite::Error::Core(core);

    let api = ApiError::from_store(wrapped);
    assert!(matches!(
      api,
      ApiError::Conflict {
        reason: "already_assigned",
        ..
      }
    ));
  }

  #[test]
  fn unrelated_errors_fall_back_to_internal() {
    let io = std::io::Error::other("disk on fire");
    assert!(matches!(ApiError::from_store(io), ApiError::Store(_)));
  }
}

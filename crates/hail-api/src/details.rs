//! Handlers for `/details` profile endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/details/driver` | The earliest-registered driver |
//! | `GET`  | `/details/driver/:id` | 404 if not found |
//! | `POST` | `/details/driver` | Body: [`NewDriver`]; returns 201 |
//! | `GET`  | `/details/user/:id` | 404 if not found |
//! | `POST` | `/details/user` | Body: [`NewUser`]; returns 201 |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use hail_core::{
  profile::{DriverProfile, NewDriver, NewUser, UserProfile},
  store::TripStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Drivers ──────────────────────────────────────────────────────────────────

/// `GET /details/driver` — the demo clients fetch "the" driver without an
/// id; this returns the earliest-registered one.
pub async fn first_driver<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<DriverProfile>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let profile = state
    .store
    .first_driver()
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::not_found("no drivers registered"))?;
  Ok(Json(profile))
}

/// `GET /details/driver/:id`
pub async fn get_driver<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DriverProfile>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let profile = state
    .store
    .get_driver(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::not_found(format!("driver {id} not found")))?;
  Ok(Json(profile))
}

/// `POST /details/driver` — body: [`NewDriver`]
pub async fn create_driver<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewDriver>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let profile = state
    .store
    .add_driver(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Users ────────────────────────────────────────────────────────────────────

/// `GET /details/user/:id`
pub async fn get_user<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let profile = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::not_found(format!("user {id} not found")))?;
  Ok(Json(profile))
}

/// `POST /details/user` — body: [`NewUser`]
pub async fn create_user<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let profile = state
    .store
    .add_user(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(profile)))
}

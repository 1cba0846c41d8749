//! Handlers for `/trips` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/trips` | Optional `?status=pending\|assigned\|...` |
//! | `POST` | `/trips` | Body: [`NewTrip`]; returns 201 + stored trip |
//! | `GET`  | `/trips/active` | Optional `?role=user\|driver&id=<uuid>` |
//! | `GET`  | `/trips/:id` | 404 if not found |
//! | `PUT`  | `/trips/:id/assign-driver` | Body: `{"driver_id":...}` |
//! | `PUT`  | `/trips/:id/end-user` | Rider-side end signal |
//! | `PUT`  | `/trips/:id/end-driver` | Driver-side end signal |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use hail_core::{
  lifecycle::{Party, TripStatus},
  store::{TripQuery, TripStore},
  trip::{NewTrip, Trip},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<TripStatus>,
}

/// `GET /trips[?status=<status>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Trip>>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let trips = state
    .store
    .list_trips(TripQuery {
      status: params.status,
      ..Default::default()
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(trips))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /trips` — body: `{"rider_id":..., "source":..., "destination":...}`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewTrip>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.source.trim().is_empty() || body.destination.trim().is_empty() {
    return Err(ApiError::BadRequest(
      "source and destination must be non-empty".into(),
    ));
  }

  let trip = state
    .store
    .create_trip(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(trip)))
}

// ─── Active ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActiveParams {
  pub role: Option<Party>,
  pub id:   Option<Uuid>,
}

/// `GET /trips/active[?role=user|driver&id=<uuid>]`
///
/// The first successful fetch of an assigned trip is its activation point.
pub async fn active<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ActiveParams>,
) -> Result<Json<Trip>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let party = match (params.role, params.id) {
    (Some(role), Some(id)) => Some((role, id)),
    (None, None) => None,
    _ => {
      return Err(ApiError::BadRequest(
        "role and id must be provided together".into(),
      ));
    }
  };

  let trip = state
    .store
    .active_trip(party)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::not_found("no active trip"))?;
  Ok(Json(trip))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /trips/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Trip>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let trip = state
    .store
    .get_trip(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::not_found(format!("trip {id} not found")))?;
  Ok(Json(trip))
}

// ─── Assign ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub driver_id: Uuid,
}

/// `PUT /trips/:id/assign-driver` — body: `{"driver_id":"..."}`
///
/// The single mutation path that binds a driver. Exactly one caller per trip
/// ever gets a 200; the rest see `409 already_assigned` and resume polling.
pub async fn assign_driver<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignBody>,
) -> Result<Json<Trip>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let trip = state
    .store
    .assign_driver(id, body.driver_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(trip))
}

// ─── End ride ─────────────────────────────────────────────────────────────────

/// Response body for the end-ride endpoints.
#[derive(Debug, Serialize)]
pub struct EndRideResponse {
  pub message: String,
  pub trip:    Trip,
}

/// `PUT /trips/:id/end-user`
pub async fn end_user<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<EndRideResponse>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  end_ride(state, id, Party::User).await
}

/// `PUT /trips/:id/end-driver`
pub async fn end_driver<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<EndRideResponse>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  end_ride(state, id, Party::Driver).await
}

async fn end_ride<S>(
  state: ApiState<S>,
  trip_id: Uuid,
  side: Party,
) -> Result<Json<EndRideResponse>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let trip = state
    .store
    .end_ride(trip_id, side)
    .await
    .map_err(ApiError::from_store)?;

  let message = match trip.status {
    TripStatus::EndingUser => {
      "Ride ended by user. Waiting for the driver to end the ride."
    }
    TripStatus::EndingDriver => {
      "Ride ended by driver. Waiting for the user to end the ride."
    }
    _ => "Ride ended.",
  }
  .to_owned();

  Ok(Json(EndRideResponse { message, trip }))
}

//! Handlers for the driver offer flow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/offers/next` | `?driver_id` required; 404 `no_pending_trips` when idle |
//! | `PUT`  | `/trips/:id/accept` | Body: `{"driver_id":...}` |
//!
//! The countdown shown to drivers is rendered from `remaining_seconds`,
//! recomputed on every poll — the server keeps no per-offer timer.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use hail_core::{offer::Offer, store::TripStore, trip::Trip};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Next offer ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NextParams {
  pub driver_id: Uuid,
}

/// Wire form of an offer, with the countdown precomputed.
#[derive(Debug, Serialize)]
pub struct OfferView {
  pub trip_id:           Uuid,
  pub driver_id:         Uuid,
  pub expires_at:        DateTime<Utc>,
  pub remaining_seconds: i64,
}

impl OfferView {
  fn from_offer(offer: Offer, now: DateTime<Utc>) -> Self {
    Self {
      trip_id:           offer.trip_id,
      driver_id:         offer.driver_id,
      expires_at:        offer.expires_at,
      remaining_seconds: offer.remaining_seconds(now),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct OfferEnvelope {
  pub trip:  Trip,
  pub offer: OfferView,
}

/// `GET /offers/next?driver_id=<uuid>`
pub async fn next<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<NextParams>,
) -> Result<Json<OfferEnvelope>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let trip = state
    .store
    .next_offer(params.driver_id, state.offer_window_secs)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::NotFound {
      message: "no pending trips available to offer".into(),
      reason:  "no_pending_trips",
    })?;

  let offer = trip
    .current_offer()
    .ok_or_else(|| ApiError::Store("offered trip has no offer columns".into()))?;

  Ok(Json(OfferEnvelope {
    offer: OfferView::from_offer(offer, Utc::now()),
    trip,
  }))
}

// ─── Accept ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AcceptBody {
  pub driver_id: Uuid,
}

/// `PUT /trips/:id/accept` — body: `{"driver_id":"..."}`
///
/// Accepts the live offer held by this driver. Races resolve against the
/// caller: `offer_expired` once the deadline passes, `already_assigned` when
/// the matching engine bound someone else first.
pub async fn accept<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AcceptBody>,
) -> Result<Json<Trip>, ApiError>
where
  S: TripStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let trip = state
    .store
    .accept_offer(id, body.driver_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(trip))
}

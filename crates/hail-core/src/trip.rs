//! Trip — the central entity of the matching service.
//!
//! A trip is created by a rider, mutated by the matching engine (assignment)
//! and the ride lifecycle (status and end timestamps), and logically deleted
//! (never physically) once `ended`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{lifecycle::TripStatus, offer::Offer};

/// One rider's requested journey, tracked through its full lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
  pub trip_id:     Uuid,
  pub rider_id:    Uuid,
  /// Opaque address strings; geocoding is the presentation layer's concern.
  pub source:      String,
  pub destination: String,
  /// Kilometres; `None` until a route has been computed.
  pub distance_km: Option<f64>,
  /// Set exactly once, by the single successful assignment.
  pub driver_id:   Option<Uuid>,
  pub status:      TripStatus,
  pub created_at:  DateTime<Utc>,
  pub assigned_at: Option<DateTime<Utc>>,
  pub ended_at:    Option<DateTime<Utc>>,

  /// The outstanding offer, stored alongside the trip so there is a single
  /// source of truth. Cleared on accept, expiry, or assignment.
  pub offer_driver_id:  Option<Uuid>,
  pub offer_expires_at: Option<DateTime<Utc>>,
}

impl Trip {
  /// The current offer as a value object, if one is recorded. The caller is
  /// responsible for checking expiry against its own clock.
  pub fn current_offer(&self) -> Option<Offer> {
    match (self.offer_driver_id, self.offer_expires_at) {
      (Some(driver_id), Some(expires_at)) => Some(Offer {
        trip_id: self.trip_id,
        driver_id,
        expires_at,
      }),
      _ => None,
    }
  }
}

/// Input for creating a trip; the id, status, and timestamps are assigned by
/// the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrip {
  pub rider_id:    Uuid,
  pub source:      String,
  pub destination: String,
  #[serde(default)]
  pub distance_km: Option<f64>,
}

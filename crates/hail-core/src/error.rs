//! Error types for `hail-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::lifecycle::TripStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("trip not found: {0}")]
  TripNotFound(Uuid),

  #[error("trip {0} already has a driver assigned")]
  AlreadyAssigned(Uuid),

  #[error("operation not valid for trip {trip_id} in status {status}")]
  InvalidState { trip_id: Uuid, status: TripStatus },

  #[error("trip {0} already has a live offer to another driver")]
  OfferConflict(Uuid),

  #[error("offer on trip {0} has expired")]
  OfferExpired(Uuid),

  #[error("no live offer on trip {trip_id} is held by driver {driver_id}")]
  OfferNotHeld { trip_id: Uuid, driver_id: Uuid },

  #[error("unknown trip status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

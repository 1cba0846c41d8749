//! Offer — a time-boxed proposal of a pending trip to one driver.
//!
//! Offers own no timer. The deadline is stored and expiry is computed on
//! demand by comparing against the caller's clock, so it can be checked
//! synchronously on every poll and an abandoned offer costs nothing.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds a driver has to accept an offered trip, unless configured
/// otherwise.
pub const DEFAULT_OFFER_WINDOW_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
  pub trip_id:    Uuid,
  pub driver_id:  Uuid,
  pub expires_at: DateTime<Utc>,
}

impl Offer {
  /// Build an offer whose window opens at `now`.
  pub fn starting_at(
    trip_id: Uuid,
    driver_id: Uuid,
    now: DateTime<Utc>,
    window_secs: u32,
  ) -> Self {
    Self {
      trip_id,
      driver_id,
      expires_at: now + TimeDelta::seconds(i64::from(window_secs)),
    }
  }

  /// Expiry favours the deadline: an offer is dead the instant
  /// `now >= expires_at`, even if an accept arrives in the same tick.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }

  /// Whole seconds left in the window, clamped to zero.
  pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
    (self.expires_at - now).num_seconds().max(0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn offer_at(now: DateTime<Utc>, window_secs: u32) -> Offer {
    Offer::starting_at(Uuid::new_v4(), Uuid::new_v4(), now, window_secs)
  }

  #[test]
  fn expires_exactly_at_the_deadline() {
    let now = Utc::now();
    let offer = offer_at(now, 10);

    assert!(!offer.is_expired(now));
    assert!(!offer.is_expired(now + TimeDelta::seconds(9)));
    assert!(offer.is_expired(now + TimeDelta::seconds(10)));
    assert!(offer.is_expired(now + TimeDelta::seconds(11)));
  }

  #[test]
  fn zero_window_offer_is_born_expired() {
    let now = Utc::now();
    assert!(offer_at(now, 0).is_expired(now));
  }

  #[test]
  fn remaining_seconds_clamps_to_zero() {
    let now = Utc::now();
    let offer = offer_at(now, 10);

    assert_eq!(offer.remaining_seconds(now), 10);
    assert_eq!(offer.remaining_seconds(now + TimeDelta::seconds(4)), 6);
    assert_eq!(offer.remaining_seconds(now + TimeDelta::seconds(25)), 0);
  }
}

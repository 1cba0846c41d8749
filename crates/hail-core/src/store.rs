//! The `TripStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `hail-store-sqlite`).
//! Higher layers (`hail-api`, `hail-cli`) depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  lifecycle::{Party, TripStatus},
  offer::Offer,
  profile::{DriverProfile, NewDriver, NewUser, UserProfile},
  trip::{NewTrip, Trip},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`TripStore::list_trips`].
#[derive(Debug, Clone, Default)]
pub struct TripQuery {
  pub status:    Option<TripStatus>,
  pub rider_id:  Option<Uuid>,
  pub driver_id: Option<Uuid>,
  pub limit:     Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Hail trip store backend.
///
/// Every conditional mutation (`assign_driver`, `end_ride`, the offer
/// operations) must be atomic per-trip: the precondition check and the write
/// happen as one indivisible step, which is what makes double assignment
/// impossible under concurrent callers.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait TripStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Trips ─────────────────────────────────────────────────────────────

  /// Create and persist a new pending trip. The id, status, and
  /// `created_at` are set by the store.
  fn create_trip(
    &self,
    input: NewTrip,
  ) -> impl Future<Output = Result<Trip, Self::Error>> + Send + '_;

  /// Retrieve a trip by id. Returns `None` if not found.
  fn get_trip(
    &self,
    trip_id: Uuid,
  ) -> impl Future<Output = Result<Option<Trip>, Self::Error>> + Send + '_;

  /// List trips matching `query`, in creation order.
  fn list_trips(
    &self,
    query: TripQuery,
  ) -> impl Future<Output = Result<Vec<Trip>, Self::Error>> + Send + '_;

  /// The live trip a party is currently part of (most recently assigned
  /// first), or any live trip when `party` is `None`.
  ///
  /// Fetching is the activation point: a returned trip still in `assigned`
  /// is atomically promoted to `active` before being handed back.
  fn active_trip(
    &self,
    party: Option<(Party, Uuid)>,
  ) -> impl Future<Output = Result<Option<Trip>, Self::Error>> + Send + '_;

  // ── Matching ──────────────────────────────────────────────────────────

  /// Atomically bind `driver_id` to a pending trip.
  ///
  /// Exactly one call ever succeeds per trip. Losers of the race get
  /// `AlreadyAssigned`; trips that progressed further get `InvalidState`.
  /// Any outstanding offer is cleared by a successful assignment.
  fn assign_driver(
    &self,
    trip_id: Uuid,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<Trip, Self::Error>> + Send + '_;

  // ── Offers ────────────────────────────────────────────────────────────

  /// The poll entry point for an on-duty driver: return the driver's
  /// outstanding live offer, or stamp a fresh offer on the most recently
  /// created pending trip that has no live offer to anyone else. Expired
  /// offers encountered along the way are cleared, making their trips
  /// eligible for re-offer. Returns `None` when there is nothing to offer.
  fn next_offer(
    &self,
    driver_id: Uuid,
    window_secs: u32,
  ) -> impl Future<Output = Result<Option<Trip>, Self::Error>> + Send + '_;

  /// Record an offer on one specific trip.
  ///
  /// Fails with `OfferConflict` if a live offer to a different driver
  /// exists, and with `InvalidState` if the trip is no longer pending.
  /// When this driver already holds the live offer, it is returned
  /// unchanged — repeat polls cannot extend a deadline.
  fn start_offer(
    &self,
    trip_id: Uuid,
    driver_id: Uuid,
    window_secs: u32,
  ) -> impl Future<Output = Result<Offer, Self::Error>> + Send + '_;

  /// Accept a live offer held by exactly this `(trip, driver)` pair and
  /// delegate to the assignment CAS in the same atomic step.
  ///
  /// Once `now >= expires_at` the offer is dead (`OfferExpired`) no matter
  /// how close the race was, and the stale offer is cleared. The matching
  /// engine's verdict is authoritative: a concurrent direct assignment
  /// still yields `AlreadyAssigned` even though the local offer was live.
  fn accept_offer(
    &self,
    trip_id: Uuid,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<Trip, Self::Error>> + Send + '_;

  // ── Ride ending ───────────────────────────────────────────────────────

  /// Apply an end-ride signal from `side` (see
  /// [`TripStatus::apply_end`](crate::lifecycle::TripStatus::apply_end)).
  ///
  /// Idempotent per side; the completing call also settles the driver's
  /// profile (trip count and fare). Returns the trip as stored afterwards.
  fn end_ride(
    &self,
    trip_id: Uuid,
    side: Party,
  ) -> impl Future<Output = Result<Trip, Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  fn add_driver(
    &self,
    input: NewDriver,
  ) -> impl Future<Output = Result<DriverProfile, Self::Error>> + Send + '_;

  fn get_driver(
    &self,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<Option<DriverProfile>, Self::Error>> + Send + '_;

  /// The earliest-registered driver. The demo clients fetch "the" driver
  /// without an id; this is that lookup.
  fn first_driver(
    &self,
  ) -> impl Future<Output = Result<Option<DriverProfile>, Self::Error>> + Send + '_;

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;
}

//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use hail_core::{
  Error as CoreError,
  lifecycle::{Party, TripStatus},
  profile::{NewDriver, NewUser},
  store::{TripQuery, TripStore},
  trip::NewTrip,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_trip(rider_id: Uuid) -> NewTrip {
  NewTrip {
    rider_id,
    source: "MG Road".into(),
    destination: "Airport".into(),
    distance_km: Some(5.0),
  }
}

fn sample_driver() -> NewDriver {
  NewDriver {
    name:           "Arjun Rao".into(),
    vehicle_number: "DL9IAR3425".into(),
    license_number: "24J4KJ2H3".into(),
  }
}

// ─── Trips ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_trip() {
  let s = store().await;
  let rider = Uuid::new_v4();

  let trip = s.create_trip(new_trip(rider)).await.unwrap();
  assert_eq!(trip.rider_id, rider);
  assert_eq!(trip.status, TripStatus::Pending);
  assert!(trip.driver_id.is_none());
  assert!(trip.assigned_at.is_none());
  assert!(trip.ended_at.is_none());

  let fetched = s.get_trip(trip.trip_id).await.unwrap().unwrap();
  assert_eq!(fetched.trip_id, trip.trip_id);
  assert_eq!(fetched.source, "MG Road");
  assert_eq!(fetched.destination, "Airport");
  assert_eq!(fetched.distance_km, Some(5.0));
}

#[tokio::test]
async fn get_trip_missing_returns_none() {
  let s = store().await;
  assert!(s.get_trip(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_trips_in_creation_order() {
  let s = store().await;
  let rider = Uuid::new_v4();

  let first = s.create_trip(new_trip(rider)).await.unwrap();
  let second = s.create_trip(new_trip(rider)).await.unwrap();
  let third = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  let all = s.list_trips(TripQuery::default()).await.unwrap();
  assert_eq!(
    all.iter().map(|t| t.trip_id).collect::<Vec<_>>(),
    vec![first.trip_id, second.trip_id, third.trip_id]
  );
}

#[tokio::test]
async fn list_trips_filters() {
  let s = store().await;
  let rider = Uuid::new_v4();
  let driver = Uuid::new_v4();

  let assigned = s.create_trip(new_trip(rider)).await.unwrap();
  s.create_trip(new_trip(rider)).await.unwrap();
  s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  s.assign_driver(assigned.trip_id, driver).await.unwrap();

  let pending = s
    .list_trips(TripQuery {
      status: Some(TripStatus::Pending),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(pending.len(), 2);
  assert!(pending.iter().all(|t| t.status == TripStatus::Pending));

  let by_rider = s
    .list_trips(TripQuery {
      rider_id: Some(rider),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_rider.len(), 2);

  let by_driver = s
    .list_trips(TripQuery {
      driver_id: Some(driver),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_driver.len(), 1);
  assert_eq!(by_driver[0].trip_id, assigned.trip_id);

  let limited = s
    .list_trips(TripQuery {
      limit: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

// ─── Matching ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_driver_binds_and_stamps() {
  let s = store().await;
  let driver = Uuid::new_v4();
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  let assigned = s.assign_driver(trip.trip_id, driver).await.unwrap();
  assert_eq!(assigned.status, TripStatus::Assigned);
  assert_eq!(assigned.driver_id, Some(driver));
  assert!(assigned.assigned_at.is_some());
  assert!(assigned.offer_driver_id.is_none());
}

#[tokio::test]
async fn assign_driver_missing_trip() {
  let s = store().await;
  let err = s
    .assign_driver(Uuid::new_v4(), Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::TripNotFound(_))));
}

#[tokio::test]
async fn second_assignment_loses_the_race() {
  let s = store().await;
  let winner = Uuid::new_v4();
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  s.assign_driver(trip.trip_id, winner).await.unwrap();
  let err = s
    .assign_driver(trip.trip_id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::AlreadyAssigned(_))));

  // The winner's binding is untouched.
  let stored = s.get_trip(trip.trip_id).await.unwrap().unwrap();
  assert_eq!(stored.driver_id, Some(winner));
}

#[tokio::test]
async fn concurrent_assignments_have_a_single_winner() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  let mut handles = Vec::new();
  for _ in 0..8 {
    let s = s.clone();
    let trip_id = trip.trip_id;
    handles.push(tokio::spawn(async move {
      s.assign_driver(trip_id, Uuid::new_v4()).await
    }));
  }

  let mut wins = 0;
  let mut losses = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(trip) => {
        assert_eq!(trip.status, TripStatus::Assigned);
        wins += 1;
      }
      Err(Error::Core(CoreError::AlreadyAssigned(_))) => losses += 1,
      Err(other) => panic!("unexpected error: {other}"),
    }
  }

  assert_eq!(wins, 1);
  assert_eq!(losses, 7);
}

#[tokio::test]
async fn assignment_is_invalid_once_the_ride_progressed() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  s.assign_driver(trip.trip_id, Uuid::new_v4()).await.unwrap();
  s.active_trip(None).await.unwrap(); // promotes to active

  let err = s
    .assign_driver(trip.trip_id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::InvalidState {
      status: TripStatus::Active,
      ..
    })
  ));
}

// ─── Activation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_promotes_assigned_to_active() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  s.assign_driver(trip.trip_id, Uuid::new_v4()).await.unwrap();

  let active = s.active_trip(None).await.unwrap().unwrap();
  assert_eq!(active.trip_id, trip.trip_id);
  assert_eq!(active.status, TripStatus::Active);

  // A second fetch finds it already active.
  let again = s.active_trip(None).await.unwrap().unwrap();
  assert_eq!(again.status, TripStatus::Active);
}

#[tokio::test]
async fn active_trip_is_scoped_to_the_party() {
  let s = store().await;
  let rider_a = Uuid::new_v4();
  let rider_b = Uuid::new_v4();
  let driver_a = Uuid::new_v4();
  let driver_b = Uuid::new_v4();

  let trip_a = s.create_trip(new_trip(rider_a)).await.unwrap();
  let trip_b = s.create_trip(new_trip(rider_b)).await.unwrap();
  s.assign_driver(trip_a.trip_id, driver_a).await.unwrap();
  s.assign_driver(trip_b.trip_id, driver_b).await.unwrap();

  let for_rider = s
    .active_trip(Some((Party::User, rider_a)))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(for_rider.trip_id, trip_a.trip_id);

  let for_driver = s
    .active_trip(Some((Party::Driver, driver_b)))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(for_driver.trip_id, trip_b.trip_id);

  let nobody = s
    .active_trip(Some((Party::User, Uuid::new_v4())))
    .await
    .unwrap();
  assert!(nobody.is_none());
}

#[tokio::test]
async fn pending_and_ended_trips_are_never_active() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  assert!(s.active_trip(None).await.unwrap().is_none());

  s.assign_driver(trip.trip_id, Uuid::new_v4()).await.unwrap();
  s.end_ride(trip.trip_id, Party::Driver).await.unwrap();
  s.end_ride(trip.trip_id, Party::User).await.unwrap();

  assert!(s.active_trip(None).await.unwrap().is_none());
}

// ─── Ride ending ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn both_sides_must_end_driver_first() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  s.assign_driver(trip.trip_id, Uuid::new_v4()).await.unwrap();
  s.active_trip(None).await.unwrap();

  let half = s.end_ride(trip.trip_id, Party::Driver).await.unwrap();
  assert_eq!(half.status, TripStatus::EndingDriver);
  assert!(half.ended_at.is_none());

  let done = s.end_ride(trip.trip_id, Party::User).await.unwrap();
  assert_eq!(done.status, TripStatus::Ended);
  assert!(done.ended_at.is_some());
}

#[tokio::test]
async fn both_sides_must_end_user_first() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  s.assign_driver(trip.trip_id, Uuid::new_v4()).await.unwrap();
  s.active_trip(None).await.unwrap();

  let half = s.end_ride(trip.trip_id, Party::User).await.unwrap();
  assert_eq!(half.status, TripStatus::EndingUser);

  let done = s.end_ride(trip.trip_id, Party::Driver).await.unwrap();
  assert_eq!(done.status, TripStatus::Ended);
}

#[tokio::test]
async fn end_ride_is_idempotent_per_side() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  s.assign_driver(trip.trip_id, Uuid::new_v4()).await.unwrap();

  s.end_ride(trip.trip_id, Party::User).await.unwrap();
  let repeat = s.end_ride(trip.trip_id, Party::User).await.unwrap();
  assert_eq!(repeat.status, TripStatus::EndingUser);

  let done = s.end_ride(trip.trip_id, Party::Driver).await.unwrap();
  assert_eq!(done.status, TripStatus::Ended);

  // Ended is absorbing; further ends from either side change nothing.
  let after = s.end_ride(trip.trip_id, Party::Driver).await.unwrap();
  assert_eq!(after.status, TripStatus::Ended);
  assert_eq!(after.ended_at, done.ended_at);
  let after = s.end_ride(trip.trip_id, Party::User).await.unwrap();
  assert_eq!(after.status, TripStatus::Ended);
}

#[tokio::test]
async fn ending_a_pending_trip_is_invalid() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  let err = s.end_ride(trip.trip_id, Party::User).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::InvalidState {
      status: TripStatus::Pending,
      ..
    })
  ));
}

#[tokio::test]
async fn ending_a_missing_trip_is_not_found() {
  let s = store().await;
  let err = s
    .end_ride(Uuid::new_v4(), Party::Driver)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::TripNotFound(_))));
}

#[tokio::test]
async fn completion_settles_the_driver() {
  let s = store().await;
  let driver = s.add_driver(sample_driver()).await.unwrap();

  // 5 km at the flat rate credits 75.
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  s.assign_driver(trip.trip_id, driver.driver_id)
    .await
    .unwrap();
  s.end_ride(trip.trip_id, Party::Driver).await.unwrap();
  s.end_ride(trip.trip_id, Party::User).await.unwrap();

  let settled = s.get_driver(driver.driver_id).await.unwrap().unwrap();
  assert_eq!(settled.total_trips, 1);
  assert!((settled.earnings - 75.0).abs() < 1e-9);

  // A trip with no computed distance counts, but credits no fare.
  let mut input = new_trip(Uuid::new_v4());
  input.distance_km = None;
  let trip = s.create_trip(input).await.unwrap();
  s.assign_driver(trip.trip_id, driver.driver_id)
    .await
    .unwrap();
  s.end_ride(trip.trip_id, Party::User).await.unwrap();
  s.end_ride(trip.trip_id, Party::Driver).await.unwrap();

  let settled = s.get_driver(driver.driver_id).await.unwrap().unwrap();
  assert_eq!(settled.total_trips, 2);
  assert!((settled.earnings - 75.0).abs() < 1e-9);
}

// ─── Offers ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn next_offer_picks_the_latest_pending_trip() {
  let s = store().await;
  let driver = Uuid::new_v4();

  s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  let latest = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  let offered = s.next_offer(driver, 10).await.unwrap().unwrap();
  assert_eq!(offered.trip_id, latest.trip_id);
  assert_eq!(offered.offer_driver_id, Some(driver));

  let offer = offered.current_offer().unwrap();
  let remaining = offer.remaining_seconds(Utc::now());
  assert!(remaining > 8 && remaining <= 10);
}

#[tokio::test]
async fn polling_again_returns_the_same_offer() {
  let s = store().await;
  let driver = Uuid::new_v4();
  s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  let first = s.next_offer(driver, 10).await.unwrap().unwrap();
  let second = s.next_offer(driver, 10).await.unwrap().unwrap();

  assert_eq!(first.trip_id, second.trip_id);
  // The window is not extended by polling.
  assert_eq!(first.offer_expires_at, second.offer_expires_at);
}

#[tokio::test]
async fn live_offers_do_not_overlap() {
  let s = store().await;
  let older = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  let newer = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  let first = s.next_offer(Uuid::new_v4(), 10).await.unwrap().unwrap();
  assert_eq!(first.trip_id, newer.trip_id);

  // The second driver is offered the remaining pending trip...
  let second = s.next_offer(Uuid::new_v4(), 10).await.unwrap().unwrap();
  assert_eq!(second.trip_id, older.trip_id);

  // ...and a third driver finds nothing on the table.
  assert!(s.next_offer(Uuid::new_v4(), 10).await.unwrap().is_none());
}

#[tokio::test]
async fn next_offer_none_without_pending_trips() {
  let s = store().await;
  assert!(s.next_offer(Uuid::new_v4(), 10).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_offer_frees_the_trip_for_reoffer() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  // A zero-second window is expired the moment it is stamped.
  s.start_offer(trip.trip_id, Uuid::new_v4(), 0).await.unwrap();

  let second_driver = Uuid::new_v4();
  let reoffered = s.next_offer(second_driver, 10).await.unwrap().unwrap();
  assert_eq!(reoffered.trip_id, trip.trip_id);
  assert_eq!(reoffered.offer_driver_id, Some(second_driver));
}

#[tokio::test]
async fn start_offer_conflicts_with_a_live_holder() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  s.start_offer(trip.trip_id, Uuid::new_v4(), 10).await.unwrap();
  let err = s
    .start_offer(trip.trip_id, Uuid::new_v4(), 10)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::OfferConflict(_))));
}

#[tokio::test]
async fn start_offer_for_the_holder_returns_it_unchanged() {
  let s = store().await;
  let driver = Uuid::new_v4();
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  let offer = s.start_offer(trip.trip_id, driver, 10).await.unwrap();
  let again = s.start_offer(trip.trip_id, driver, 10).await.unwrap();
  assert_eq!(offer.expires_at, again.expires_at);
}

#[tokio::test]
async fn start_offer_requires_a_pending_trip() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();
  s.assign_driver(trip.trip_id, Uuid::new_v4()).await.unwrap();

  let err = s
    .start_offer(trip.trip_id, Uuid::new_v4(), 10)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidState { .. })));

  let err = s
    .start_offer(Uuid::new_v4(), Uuid::new_v4(), 10)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::TripNotFound(_))));
}

#[tokio::test]
async fn accept_assigns_through_the_matching_engine() {
  let s = store().await;
  let driver = Uuid::new_v4();
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  s.start_offer(trip.trip_id, driver, 10).await.unwrap();
  let accepted = s.accept_offer(trip.trip_id, driver).await.unwrap();

  assert_eq!(accepted.status, TripStatus::Assigned);
  assert_eq!(accepted.driver_id, Some(driver));
  assert!(accepted.offer_driver_id.is_none());
}

#[tokio::test]
async fn accept_without_holding_the_offer_fails() {
  let s = store().await;
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  // No offer at all.
  let err = s
    .accept_offer(trip.trip_id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::OfferNotHeld { .. })));

  // An offer held by someone else.
  s.start_offer(trip.trip_id, Uuid::new_v4(), 10).await.unwrap();
  let err = s
    .accept_offer(trip.trip_id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::OfferNotHeld { .. })));
}

#[tokio::test]
async fn expired_offer_cannot_be_accepted() {
  let s = store().await;
  let driver = Uuid::new_v4();
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  s.start_offer(trip.trip_id, driver, 0).await.unwrap();
  let err = s.accept_offer(trip.trip_id, driver).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::OfferExpired(_))));

  // The trip is back on the table, with the stale offer cleared.
  let stored = s.get_trip(trip.trip_id).await.unwrap().unwrap();
  assert_eq!(stored.status, TripStatus::Pending);
  assert!(stored.offer_driver_id.is_none());
}

#[tokio::test]
async fn direct_assignment_beats_a_live_offer() {
  let s = store().await;
  let offer_holder = Uuid::new_v4();
  let trip = s.create_trip(new_trip(Uuid::new_v4())).await.unwrap();

  s.start_offer(trip.trip_id, offer_holder, 10).await.unwrap();
  s.assign_driver(trip.trip_id, Uuid::new_v4()).await.unwrap();

  // The holder's accept loses: the matching engine's verdict is
  // authoritative even though the local offer was live.
  let err = s.accept_offer(trip.trip_id, offer_holder).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::AlreadyAssigned(_))));
}

// ─── Acceptance scenario ─────────────────────────────────────────────────────

#[tokio::test]
async fn full_trip_lifecycle_scenario() {
  let s = store().await;
  let trip = s
    .create_trip(NewTrip {
      rider_id:    Uuid::new_v4(),
      source:      "A".into(),
      destination: "B".into(),
      distance_km: Some(5.0),
    })
    .await
    .unwrap();

  let assigned = s
    .assign_driver(trip.trip_id, Uuid::new_v4())
    .await
    .unwrap();
  assert_eq!(assigned.status, TripStatus::Assigned);

  let err = s
    .assign_driver(trip.trip_id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::AlreadyAssigned(_))));

  let half = s.end_ride(trip.trip_id, Party::Driver).await.unwrap();
  assert_eq!(half.status, TripStatus::EndingDriver);

  let done = s.end_ride(trip.trip_id, Party::User).await.unwrap();
  assert_eq!(done.status, TripStatus::Ended);
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_driver() {
  let s = store().await;
  let driver = s.add_driver(sample_driver()).await.unwrap();

  let fetched = s.get_driver(driver.driver_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Arjun Rao");
  assert_eq!(fetched.vehicle_number, "DL9IAR3425");
  assert_eq!(fetched.total_trips, 0);
  assert_eq!(fetched.rating, 5.0);
}

#[tokio::test]
async fn first_driver_is_the_earliest_registered() {
  let s = store().await;
  assert!(s.first_driver().await.unwrap().is_none());

  let first = s.add_driver(sample_driver()).await.unwrap();
  s.add_driver(NewDriver {
    name:           "Meera Iyer".into(),
    vehicle_number: "KA05MH8826".into(),
    license_number: "88A1PQ9X2".into(),
  })
  .await
  .unwrap();

  let found = s.first_driver().await.unwrap().unwrap();
  assert_eq!(found.driver_id, first.driver_id);
}

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;
  let user = s
    .add_user(NewUser {
      name: "Priya Sharma".into(),
    })
    .await
    .unwrap();

  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Priya Sharma");
  assert_eq!(fetched.rating, 5.0);

  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

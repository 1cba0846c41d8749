//! `hail` — command-line rider and driver client for the Hail trip
//! matching service.
//!
//! # Usage
//!
//! ```
//! hail request --rider <uuid> --from "MG Road" --to "Airport" --distance 5.2
//! hail duty --driver <uuid> --accept
//! hail end --trip <uuid> --side driver
//! ```

mod client;

use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use client::{ApiClient, ApiConfig};
use hail_core::{
  lifecycle::{Party, TripStatus},
  pricing,
  profile::{NewDriver, NewUser},
  trip::NewTrip,
};
use uuid::Uuid;

/// Poll cadence for trip lists and offers, matching the mobile clients.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
  name = "hail",
  about = "Command-line client for the Hail trip matching service"
)]
struct Args {
  /// Base URL of the hail server.
  #[arg(long, env = "HAIL_URL", default_value = "http://localhost:5000")]
  url: String,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Side {
  User,
  Driver,
}

impl From<Side> for Party {
  fn from(side: Side) -> Self {
    match side {
      Side::User => Party::User,
      Side::Driver => Party::Driver,
    }
  }
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create a trip request as a rider.
  Request {
    #[arg(long)]
    rider: Uuid,
    #[arg(long = "from")]
    source: String,
    #[arg(long = "to")]
    destination: String,
    /// Route distance in kilometres, if known.
    #[arg(long)]
    distance: Option<f64>,
  },
  /// List trips, optionally filtered by status.
  Trips {
    #[arg(long)]
    status: Option<String>,
  },
  /// Show the current active trip.
  Ride {
    #[arg(long, value_enum)]
    role: Option<Side>,
    #[arg(long)]
    id: Option<Uuid>,
  },
  /// Go on duty as a driver and poll for offers.
  Duty {
    #[arg(long)]
    driver: Uuid,
    /// Accept the first offer that comes in instead of just printing it.
    #[arg(long)]
    accept: bool,
  },
  /// Directly assign a driver to a pending trip.
  Assign {
    #[arg(long)]
    trip: Uuid,
    #[arg(long)]
    driver: Uuid,
  },
  /// Signal the end of a ride from one side.
  End {
    #[arg(long)]
    trip: Uuid,
    #[arg(long, value_enum)]
    side: Side,
  },
  /// Register a driver profile.
  RegisterDriver {
    #[arg(long)]
    name: String,
    #[arg(long)]
    vehicle: String,
    #[arg(long)]
    license: String,
  },
  /// Register a user profile.
  RegisterUser {
    #[arg(long)]
    name: String,
  },
  /// Show a driver's earnings and bonus.
  Points {
    /// Driver id; defaults to the earliest-registered driver.
    #[arg(long)]
    driver: Option<Uuid>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let client = ApiClient::new(ApiConfig {
    base_url: args.url.clone(),
  })?;

  match args.command {
    Command::Request {
      rider,
      source,
      destination,
      distance,
    } => {
      let trip = client
        .create_trip(&NewTrip {
          rider_id: rider,
          source,
          destination,
          distance_km: distance,
        })
        .await?;
      println!("trip {} created ({})", trip.trip_id, trip.status);
    }

    Command::Trips { status } => {
      let status = status
        .as_deref()
        .map(|s| {
          TripStatus::parse(s).ok_or_else(|| anyhow!("unknown status: {s}"))
        })
        .transpose()?;
      for trip in client.list_trips(status).await? {
        println!(
          "{}  {:>13}  {} -> {}",
          trip.trip_id,
          trip.status.as_str(),
          trip.source,
          trip.destination
        );
      }
    }

    Command::Ride { role, id } => {
      let party = match (role, id) {
        (Some(role), Some(id)) => Some((Party::from(role), id)),
        (None, None) => None,
        _ => bail!("--role and --id must be given together"),
      };
      match client.active_trip(party).await? {
        Some(trip) => {
          println!(
            "{}: {} -> {} ({})",
            trip.trip_id, trip.source, trip.destination, trip.status
          );
          if let Some(km) = trip.distance_km {
            println!("distance {km} km, fare {:.0}", pricing::fare(km));
          }
        }
        None => println!("no active trip"),
      }
    }

    Command::Duty { driver, accept } => duty_loop(&client, driver, accept).await?,

    Command::Assign { trip, driver } => {
      let trip = client.assign_driver(trip, driver).await?;
      println!("assigned: trip {} -> driver {driver}", trip.trip_id);
    }

    Command::End { trip, side } => {
      let done = client.end_ride(trip, side.into()).await?;
      println!("{} (status: {})", done.message, done.trip.status);
    }

    Command::RegisterDriver {
      name,
      vehicle,
      license,
    } => {
      let profile = client
        .register_driver(&NewDriver {
          name,
          vehicle_number: vehicle,
          license_number: license,
        })
        .await?;
      println!("driver registered: {}", profile.driver_id);
    }

    Command::RegisterUser { name } => {
      let profile = client.register_user(&NewUser { name }).await?;
      println!("user registered: {}", profile.user_id);
    }

    Command::Points { driver } => {
      let profile = match driver {
        Some(id) => client.get_driver(id).await?,
        None => client.first_driver().await?,
      };
      let percent = pricing::bonus_percent(profile.points, profile.rating);
      let cash =
        pricing::bonus_cash(profile.points, profile.rating, profile.earnings);
      println!(
        "{}: {} trips, earnings {:.2}",
        profile.name, profile.total_trips, profile.earnings
      );
      println!(
        "points {}, rating {:.1} -> bonus {percent:.2}% = {cash:.2}",
        profile.points, profile.rating
      );
    }
  }

  Ok(())
}

/// Poll for offers every five seconds, printing the countdown as it shrinks;
/// optionally accept the first one.
async fn duty_loop(client: &ApiClient, driver: Uuid, accept: bool) -> Result<()> {
  println!("on duty as driver {driver}; polling for offers");
  loop {
    match client.next_offer(driver).await? {
      Some(envelope) => {
        let trip = &envelope.trip;
        println!(
          "offer: trip {}: {} -> {} ({} km, fare {:.0}), {}s left",
          trip.trip_id,
          trip.source,
          trip.destination,
          trip.distance_km.unwrap_or(0.0),
          trip.distance_km.map_or(0.0, pricing::fare),
          envelope.offer.remaining_seconds,
        );
        if accept {
          match client.accept_offer(trip.trip_id, driver).await {
            Ok(trip) => {
              println!("accepted trip {}", trip.trip_id);
              return Ok(());
            }
            // Lost the race or the window; keep polling.
            Err(err) => println!("accept failed: {err}"),
          }
        }
      }
      None => println!("no pending trips"),
    }
    tokio::time::sleep(POLL_INTERVAL).await;
  }
}

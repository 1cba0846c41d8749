//! The ride lifecycle state machine.
//!
//! A trip moves monotonically through
//! `pending -> assigned -> active -> {ending_user | ending_driver} -> ended`.
//! The two `ending_*` statuses are concurrent partial-end substates: either
//! side may signal first, and the trip becomes terminal only once both have.
//! There are no backward transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a trip currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
  Pending,
  Assigned,
  Active,
  EndingUser,
  EndingDriver,
  Ended,
}

impl TripStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Assigned => "assigned",
      Self::Active => "active",
      Self::EndingUser => "ending_user",
      Self::EndingDriver => "ending_driver",
      Self::Ended => "ended",
    }
  }

  /// The inverse of [`as_str`](Self::as_str); `None` for unknown input.
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(Self::Pending),
      "assigned" => Some(Self::Assigned),
      "active" => Some(Self::Active),
      "ending_user" => Some(Self::EndingUser),
      "ending_driver" => Some(Self::EndingDriver),
      "ended" => Some(Self::Ended),
      _ => None,
    }
  }

  /// `ended` is absorbing; nothing transitions out of it.
  pub fn is_terminal(self) -> bool { matches!(self, Self::Ended) }

  /// True for every status in which a driver is bound to the trip.
  pub fn has_driver(self) -> bool { !matches!(self, Self::Pending) }

  /// Statuses an active-trip fetch may return: assigned through ending.
  pub fn is_live(self) -> bool {
    matches!(
      self,
      Self::Assigned | Self::Active | Self::EndingUser | Self::EndingDriver
    )
  }

  /// Apply an end-ride signal from `side`.
  ///
  /// Returns `None` when the trip cannot be ended at all (`pending` — no
  /// ride ever started). A still-`assigned` trip can be ended: the ride
  /// evidently happened even if neither client fetched it, so the
  /// transition passes through `active` implicitly.
  pub fn apply_end(self, side: Party) -> Option<EndOutcome> {
    use TripStatus::*;
    let outcome = match (self, side) {
      (Pending, _) => return None,
      (Assigned | Active, Party::User) => EndOutcome::AwaitingOther(EndingUser),
      (Assigned | Active, Party::Driver) => {
        EndOutcome::AwaitingOther(EndingDriver)
      }
      (EndingUser, Party::Driver) | (EndingDriver, Party::User) => {
        EndOutcome::Completed
      }
      (EndingUser, Party::User)
      | (EndingDriver, Party::Driver)
      | (Ended, _) => EndOutcome::NoChange,
    };
    Some(outcome)
  }
}

impl fmt::Display for TripStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Parties ─────────────────────────────────────────────────────────────────

/// Which side of a trip is acting: the rider ("user" on the wire, matching
/// the client app) or the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
  User,
  Driver,
}

impl Party {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::User => "user",
      Self::Driver => "driver",
    }
  }
}

impl fmt::Display for Party {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── End-ride outcome ────────────────────────────────────────────────────────

/// Result of applying an end-ride signal to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
  /// The first side has signalled; the trip now awaits the other side.
  AwaitingOther(TripStatus),
  /// Both sides have signalled; the trip is terminal.
  Completed,
  /// This side had already signalled, or the trip was already ended.
  /// Idempotent: nothing changes.
  NoChange,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

//! Fare and driver-bonus rules.

/// Flat per-kilometre fare rate, in currency units.
pub const FARE_PER_KM: f64 = 15.0;

/// Fare for a trip of `distance_km` kilometres.
pub fn fare(distance_km: f64) -> f64 { distance_km * FARE_PER_KM }

/// Bonus percentage earned from accumulated points and rating:
/// `(points / 10_000) x (rating / 2)`, expressed in percent.
pub fn bonus_percent(points: u64, rating: f64) -> f64 {
  (points as f64 / 10_000.0) * (rating / 2.0)
}

/// Bonus cash: `bonus_percent` percent of the month's earnings.
pub fn bonus_cash(points: u64, rating: f64, monthly_earnings: f64) -> f64 {
  bonus_percent(points, rating) / 100.0 * monthly_earnings
}

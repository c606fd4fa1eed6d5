//! Travel-time budgets expressed as search radii.
//!
//! The conversion uses a fixed average speed per travel mode. It is a deliberate simplification:
//! it does not route over roads and is not meant to predict real travel times, only to bound a
//! search radius the same way on every request.

use serde::{Deserialize, Serialize};

use crate::criteria::TravelMode;

pub const WALKING_SPEED_KMH: f64 = 5.0;
pub const DRIVING_SPEED_KMH: f64 = 30.0;
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub lat: f64,
	pub lon: f64,
}
impl GeoPoint {
	pub fn new(lat: f64, lon: f64) -> Self {
		Self { lat, lon }
	}

	/// Builds a point from nullable store columns. Zeroed coordinates are placeholders in the
	/// listing data and count as missing.
	pub fn from_columns(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
		let point = Self { lat: lat?, lon: lon? };

		point.is_valid().then_some(point)
	}

	pub fn is_valid(&self) -> bool {
		self.lat.is_finite()
			&& self.lon.is_finite()
			&& (-90.0..=90.0).contains(&self.lat)
			&& (-180.0..=180.0).contains(&self.lon)
			&& !(self.lat == 0.0 || self.lon == 0.0)
	}
}

pub fn speed_kmh(mode: TravelMode) -> f64 {
	match mode {
		TravelMode::Walking => WALKING_SPEED_KMH,
		TravelMode::Driving => DRIVING_SPEED_KMH,
	}
}

/// Converts a travel budget into a radius. Non-positive budgets mean "no travel budget" and yield
/// zero.
pub fn minutes_to_meters(minutes: f64, mode: TravelMode) -> f64 {
	if !minutes.is_finite() || minutes <= 0.0 {
		return 0.0;
	}

	speed_kmh(mode) * (minutes / 60.0) * 1_000.0
}

pub fn meters_to_minutes(meters: f64, mode: TravelMode) -> f64 {
	if !meters.is_finite() || meters <= 0.0 {
		return 0.0;
	}

	meters / 1_000.0 / speed_kmh(mode) * 60.0
}

/// Great-circle distance in meters.
pub fn haversine_meters(from: GeoPoint, to: GeoPoint) -> f64 {
	let lat1 = from.lat.to_radians();
	let lat2 = to.lat.to_radians();
	let dlat = (to.lat - from.lat).to_radians();
	let dlon = (to.lon - from.lon).to_radians();
	let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
	let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

	EARTH_RADIUS_METERS * c
}

pub fn round_tenths(value: f64) -> f64 {
	(value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
	use super::{GeoPoint, haversine_meters, meters_to_minutes, minutes_to_meters, round_tenths};
	use crate::criteria::TravelMode;

	#[test]
	fn zero_or_negative_budget_is_zero_meters() {
		assert_eq!(minutes_to_meters(0.0, TravelMode::Driving), 0.0);
		assert_eq!(minutes_to_meters(0.0, TravelMode::Walking), 0.0);
		assert_eq!(minutes_to_meters(-5.0, TravelMode::Driving), 0.0);
		assert_eq!(minutes_to_meters(f64::NAN, TravelMode::Walking), 0.0);
	}

	#[test]
	fn one_hour_matches_mode_speed() {
		assert_eq!(minutes_to_meters(60.0, TravelMode::Driving), 30_000.0);
		assert_eq!(minutes_to_meters(60.0, TravelMode::Walking), 5_000.0);
	}

	#[test]
	fn meters_to_minutes_inverts_the_conversion() {
		let meters = minutes_to_meters(12.0, TravelMode::Walking);

		assert!((meters_to_minutes(meters, TravelMode::Walking) - 12.0).abs() < 1e-9);
	}

	#[test]
	fn haversine_riyadh_to_jeddah_is_about_850_km() {
		let riyadh = GeoPoint::new(24.7136, 46.6753);
		let jeddah = GeoPoint::new(21.4858, 39.1925);
		let km = haversine_meters(riyadh, jeddah) / 1_000.0;

		assert!((840.0..880.0).contains(&km), "{km}");
	}

	#[test]
	fn zeroed_or_missing_columns_are_not_points() {
		assert!(GeoPoint::from_columns(Some(24.7), Some(46.6)).is_some());
		assert!(GeoPoint::from_columns(Some(0.0), Some(46.6)).is_none());
		assert!(GeoPoint::from_columns(None, Some(46.6)).is_none());
		assert!(GeoPoint::from_columns(Some(124.7), Some(46.6)).is_none());
	}

	#[test]
	fn rounds_to_one_decimal() {
		assert_eq!(round_tenths(12.345), 12.3);
		assert_eq!(round_tenths(0.06), 0.1);
	}
}

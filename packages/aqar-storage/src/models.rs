use serde::{Deserialize, Serialize};

use aqar_domain::proximity::GeoPoint;

/// A listing row. Numeric columns are cast to fixed SQL types by the queries that load them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertyRow {
	pub id: String,
	pub url: Option<String>,
	pub purpose: Option<String>,
	pub property_type: Option<String>,
	pub city: Option<String>,
	pub district: Option<String>,
	pub title: Option<String>,
	pub price_num: Option<f64>,
	pub price_currency: Option<String>,
	pub price_period: Option<String>,
	pub area_m2: Option<f64>,
	pub description: Option<String>,
	pub image_url: Option<String>,
	pub final_lat: Option<f64>,
	pub final_lon: Option<f64>,
	pub time_to_metro_min: Option<f64>,
	pub rooms: Option<i32>,
	pub baths: Option<i32>,
	pub halls: Option<i32>,
}
impl PropertyRow {
	pub fn location(&self) -> Option<GeoPoint> {
		GeoPoint::from_columns(self.final_lat, self.final_lon)
	}
}

/// A canonical school, university or mosque. `alt_name` holds the transliterated variant when the
/// store has one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FacilityRecord {
	pub name: String,
	pub alt_name: Option<String>,
	pub lat: f64,
	pub lon: f64,
}
impl FacilityRecord {
	pub fn names(&self) -> impl Iterator<Item = &str> {
		std::iter::once(self.name.as_str()).chain(self.alt_name.as_deref())
	}

	pub fn location(&self) -> GeoPoint {
		GeoPoint::new(self.lat, self.lon)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NearbyFacility {
	pub name: String,
	pub alt_name: Option<String>,
	pub lat: f64,
	pub lon: f64,
	pub distance_meters: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ScoredId {
	pub id: String,
	pub score: f64,
}

/// Inputs of the price/location-ranked fallback RPC.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericTarget {
	pub purpose: String,
	pub property_type: String,
	pub city: String,
	pub location: Option<GeoPoint>,
	pub price: Option<f64>,
}

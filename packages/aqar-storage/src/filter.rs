//! Property predicates shared by the SQL renderer and in-memory evaluation.

use sqlx::{Postgres, QueryBuilder};

use crate::models::PropertyRow;
use aqar_domain::proximity::{self, GeoPoint};

pub const PROPERTY_COLUMNS: &str = "\
id::text AS id,
	url,
	purpose,
	property_type,
	city,
	district,
	title,
	price_num::float8 AS price_num,
	price_currency,
	price_period,
	area_m2::float8 AS area_m2,
	description,
	image_url,
	final_lat::float8 AS final_lat,
	final_lon::float8 AS final_lon,
	time_to_metro_min::float8 AS time_to_metro_min,
	rooms::int4 AS rooms,
	baths::int4 AS baths,
	halls::int4 AS halls";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
	Purpose,
	PropertyType,
	City,
	District,
	PricePeriod,
	Rooms,
	Baths,
	Halls,
	AreaM2,
	PriceNum,
}
impl Column {
	pub fn as_sql(self) -> &'static str {
		match self {
			Self::Purpose => "purpose",
			Self::PropertyType => "property_type",
			Self::City => "city",
			Self::District => "district",
			Self::PricePeriod => "price_period",
			Self::Rooms => "rooms",
			Self::Baths => "baths",
			Self::Halls => "halls",
			Self::AreaM2 => "area_m2",
			Self::PriceNum => "price_num",
		}
	}

	fn text(self, row: &PropertyRow) -> Option<&str> {
		match self {
			Self::Purpose => row.purpose.as_deref(),
			Self::PropertyType => row.property_type.as_deref(),
			Self::City => row.city.as_deref(),
			Self::District => row.district.as_deref(),
			Self::PricePeriod => row.price_period.as_deref(),
			_ => None,
		}
	}

	fn number(self, row: &PropertyRow) -> Option<f64> {
		match self {
			Self::Rooms => row.rooms.map(f64::from),
			Self::Baths => row.baths.map(f64::from),
			Self::Halls => row.halls.map(f64::from),
			Self::AreaM2 => row.area_m2,
			Self::PriceNum => row.price_num,
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
	Text(String),
	Number(f64),
}

/// Bounds are inclusive. A predicate on a NULL column never matches.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
	Eq(Column, FilterValue),
	Gte(Column, f64),
	Lte(Column, f64),
}
impl Predicate {
	pub fn column(&self) -> Column {
		match self {
			Self::Eq(column, _) | Self::Gte(column, _) | Self::Lte(column, _) => *column,
		}
	}

	pub fn matches(&self, row: &PropertyRow) -> bool {
		match self {
			Self::Eq(column, FilterValue::Text(value)) => column.text(row) == Some(value.as_str()),
			Self::Eq(column, FilterValue::Number(value)) => column.number(row) == Some(*value),
			Self::Gte(column, bound) => column.number(row).is_some_and(|value| value >= *bound),
			Self::Lte(column, bound) => column.number(row).is_some_and(|value| value <= *bound),
		}
	}
}

/// A circle on the ground that candidates must fall within.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoScope {
	pub center: GeoPoint,
	pub radius_meters: f64,
}
impl GeoScope {
	pub fn contains(&self, point: GeoPoint) -> bool {
		proximity::haversine_meters(self.center, point) <= self.radius_meters
	}
}

/// Property fetch filter. Results are ordered by ascending price. Rows without valid coordinates
/// only fall out when a spatial scope is set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyFilter {
	pub predicates: Vec<Predicate>,
	pub scope: Option<GeoScope>,
	pub limit: Option<u32>,
}
impl PropertyFilter {
	pub fn with_scope(&self, scope: Option<GeoScope>) -> Self {
		Self { scope, ..self.clone() }
	}

	pub fn matches(&self, row: &PropertyRow) -> bool {
		if let Some(scope) = self.scope {
			match row.location() {
				Some(location) if scope.contains(location) => {},
				_ => return false,
			}
		}

		self.predicates.iter().all(|predicate| predicate.matches(row))
	}

	/// Appends the WHERE clause, if any, to a query that selects from `properties`.
	pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		self.push_conditions(builder, " WHERE ");
	}

	/// Extends a query that already carries a WHERE clause.
	pub fn push_and(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		self.push_conditions(builder, " AND ");
	}

	fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>, first: &'static str) {
		let mut separator = first;

		for predicate in &self.predicates {
			builder.push(separator);

			separator = " AND ";

			match predicate {
				Predicate::Eq(column, FilterValue::Text(value)) => {
					builder.push(column.as_sql()).push(" = ").push_bind(value.clone());
				},
				Predicate::Eq(column, FilterValue::Number(value)) => {
					builder.push(column.as_sql()).push("::float8 = ").push_bind(*value);
				},
				Predicate::Gte(column, bound) => {
					builder.push(column.as_sql()).push("::float8 >= ").push_bind(*bound);
				},
				Predicate::Lte(column, bound) => {
					builder.push(column.as_sql()).push("::float8 <= ").push_bind(*bound);
				},
			}
		}

		if let Some(scope) = self.scope {
			builder
				.push(separator)
				.push(
					"final_lat IS NOT NULL AND final_lat <> 0 \
					 AND final_lon IS NOT NULL AND final_lon <> 0 \
					 AND ST_DWithin(\
					 ST_SetSRID(ST_MakePoint(final_lon, final_lat), 4326)::geography, \
					 ST_SetSRID(ST_MakePoint(",
				)
				.push_bind(scope.center.lon)
				.push(", ")
				.push_bind(scope.center.lat)
				.push("), 4326)::geography, ")
				.push_bind(scope.radius_meters)
				.push(")");
		}
	}

	pub fn push_order_and_limit(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		builder.push(" ORDER BY price_num ASC NULLS LAST, id ASC");

		if let Some(limit) = self.limit {
			builder.push(" LIMIT ").push_bind(i64::from(limit));
		}
	}
}

/// Facility-specific arguments of the proximity RPCs. Empty fields impose no filter.
///
/// The school RPCs take no name argument, so `name` only narrows universities and mosques. A
/// resolved school name scopes the property fetch and nothing else.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FacilityFilter {
	pub name: Option<String>,
	pub gender: Option<String>,
	pub levels: Vec<String>,
}

use sqlx::{Postgres, QueryBuilder};

use crate::{
	Result,
	db::Db,
	filter::{FacilityFilter, PROPERTY_COLUMNS, PropertyFilter},
	models::{FacilityRecord, NearbyFacility, NumericTarget, PropertyRow, ScoredId},
};
use aqar_domain::{criteria::FacilityKind, proximity::GeoPoint};

pub async fn fetch_properties(db: &Db, filter: &PropertyFilter) -> Result<Vec<PropertyRow>> {
	let mut builder = select_properties();

	filter.push_where(&mut builder);
	filter.push_order_and_limit(&mut builder);

	let rows: Vec<PropertyRow> = builder.build_query_as().fetch_all(&db.pool).await?;

	Ok(rows)
}

/// Loads rows by id that still satisfy `filter`. The filter limit is ignored.
pub async fn fetch_properties_by_ids(
	db: &Db,
	ids: &[String],
	filter: &PropertyFilter,
) -> Result<Vec<PropertyRow>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let mut builder = select_properties();

	builder.push(" WHERE id::text = ANY(").push_bind(ids.to_vec()).push(")");
	filter.push_and(&mut builder);

	let rows: Vec<PropertyRow> = builder.build_query_as().fetch_all(&db.pool).await?;

	Ok(rows)
}

pub async fn fetch_property(db: &Db, id: &str) -> Result<Option<PropertyRow>> {
	let mut builder = select_properties();

	builder.push(" WHERE id::text = ").push_bind(id.to_string());

	let row: Option<PropertyRow> = builder.build_query_as().fetch_optional(&db.pool).await?;

	Ok(row)
}

pub async fn list_facilities(db: &Db, kind: FacilityKind) -> Result<Vec<FacilityRecord>> {
	let sql = match kind {
		FacilityKind::School => {
			"\
SELECT name, NULL::text AS alt_name, lat::float8 AS lat, lon::float8 AS lon
FROM schools
WHERE name IS NOT NULL AND lat IS NOT NULL AND lon IS NOT NULL"
		},
		FacilityKind::University => {
			"\
SELECT name_ar AS name, name_en AS alt_name, lat::float8 AS lat, lon::float8 AS lon
FROM universities
WHERE name_ar IS NOT NULL AND lat IS NOT NULL AND lon IS NOT NULL"
		},
		FacilityKind::Mosque => {
			"\
SELECT name, NULL::text AS alt_name, lat::float8 AS lat, lon::float8 AS lon
FROM mosques
WHERE name IS NOT NULL AND lat IS NOT NULL AND lon IS NOT NULL"
		},
	};
	let rows = sqlx::query_as::<_, FacilityRecord>(sql).fetch_all(&db.pool).await?;

	Ok(rows)
}

/// Point check: is any facility of `kind` matching `filter` within `radius_meters` of `point`.
pub async fn check_proximity(
	db: &Db,
	kind: FacilityKind,
	point: GeoPoint,
	radius_meters: f64,
	filter: &FacilityFilter,
) -> Result<bool> {
	let found: Option<bool> = match kind {
		FacilityKind::School =>
			sqlx::query_scalar("SELECT check_school_proximity($1, $2, $3, $4, $5)")
				.bind(point.lat)
				.bind(point.lon)
				.bind(radius_meters)
				.bind(filter.gender.as_deref())
				.bind(levels(filter))
				.fetch_one(&db.pool)
				.await?,
		FacilityKind::University =>
			sqlx::query_scalar("SELECT check_university_proximity($1, $2, $3, $4)")
				.bind(point.lat)
				.bind(point.lon)
				.bind(radius_meters)
				.bind(filter.name.as_deref())
				.fetch_one(&db.pool)
				.await?,
		FacilityKind::Mosque =>
			sqlx::query_scalar("SELECT check_mosque_proximity($1, $2, $3, $4)")
				.bind(point.lat)
				.bind(point.lon)
				.bind(radius_meters)
				.bind(filter.name.as_deref())
				.fetch_one(&db.pool)
				.await?,
	};

	Ok(found.unwrap_or(false))
}

/// Per-center listing of facilities for display.
pub async fn nearby_for_display(
	db: &Db,
	kind: FacilityKind,
	center: GeoPoint,
	radius_meters: f64,
	filter: &FacilityFilter,
) -> Result<Vec<NearbyFacility>> {
	let rows = match kind {
		FacilityKind::School =>
			sqlx::query_as::<_, NearbyFacility>(
				"\
SELECT
	name,
	NULL::text AS alt_name,
	lat::float8 AS lat,
	lon::float8 AS lon,
	distance_meters::float8 AS distance_meters
FROM get_nearby_schools($1, $2, $3, $4, $5)",
			)
			.bind(center.lat)
			.bind(center.lon)
			.bind(radius_meters)
			.bind(filter.gender.as_deref())
			.bind(levels(filter))
			.fetch_all(&db.pool)
			.await?,
		FacilityKind::University =>
			sqlx::query_as::<_, NearbyFacility>(
				"\
SELECT
	name_ar AS name,
	name_en AS alt_name,
	lat::float8 AS lat,
	lon::float8 AS lon,
	distance_meters::float8 AS distance_meters
FROM get_universities_for_display($1, $2, $3, $4)",
			)
			.bind(center.lat)
			.bind(center.lon)
			.bind(radius_meters)
			.bind(filter.name.as_deref())
			.fetch_all(&db.pool)
			.await?,
		FacilityKind::Mosque =>
			sqlx::query_as::<_, NearbyFacility>(
				"\
SELECT
	name,
	NULL::text AS alt_name,
	lat::float8 AS lat,
	lon::float8 AS lon,
	distance_meters::float8 AS distance_meters
FROM get_mosques_for_display($1, $2, $3, $4)",
			)
			.bind(center.lat)
			.bind(center.lon)
			.bind(radius_meters)
			.bind(filter.name.as_deref())
			.fetch_all(&db.pool)
			.await?,
	};

	Ok(rows)
}

/// Vector similarity over listing embeddings, best first.
pub async fn match_property_vectors(
	db: &Db,
	embedding: &[f32],
	threshold: f32,
	count: u32,
) -> Result<Vec<ScoredId>> {
	let rows = sqlx::query_as::<_, ScoredId>(
		"\
SELECT id::text AS id, similarity_score::float8 AS score
FROM match_properties_bge_m3($1, $2, $3)
ORDER BY score DESC",
	)
	.bind(vector_literal(embedding))
	.bind(f64::from(threshold))
	.bind(i32::try_from(count).unwrap_or(i32::MAX))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Price/location-ranked neighbors of a target, best first.
pub async fn flexible_ranked(db: &Db, target: &NumericTarget) -> Result<Vec<ScoredId>> {
	let rows = sqlx::query_as::<_, ScoredId>(
		"\
SELECT id::text AS id, similarity::float8 AS score
FROM search_properties_flexible_ranked($1, $2, $3, $4, $5, $6)
ORDER BY score DESC",
	)
	.bind(target.purpose.as_str())
	.bind(target.property_type.as_str())
	.bind(target.city.as_str())
	.bind(target.location.map(|point| point.lat))
	.bind(target.location.map(|point| point.lon))
	.bind(target.price)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

fn select_properties() -> QueryBuilder<'static, Postgres> {
	QueryBuilder::new(format!("SELECT {PROPERTY_COLUMNS} FROM properties"))
}

fn levels(filter: &FacilityFilter) -> Option<Vec<String>> {
	(!filter.levels.is_empty()).then(|| filter.levels.clone())
}

/// pgvector text form, e.g. `[0.1,0.2]`.
pub fn vector_literal(embedding: &[f32]) -> String {
	let values = embedding.iter().map(|value| value.to_string()).collect::<Vec<_>>();

	format!("[{}]", values.join(","))
}

#[cfg(test)]
mod tests {
	use super::vector_literal;

	#[test]
	fn renders_vector_literal() {
		assert_eq!(vector_literal(&[0.5, -1.0, 0.25]), "[0.5,-1,0.25]");
		assert_eq!(vector_literal(&[]), "[]");
	}
}

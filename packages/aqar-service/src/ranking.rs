use std::cmp::Ordering;

use aqar_config::{Config, Ranking, RankingBands, Search};
use aqar_domain::criteria::{CountFilter, RangeFilter, SearchCriteria};
use aqar_storage::models::PropertyRow;

use crate::{
	outcome::RankedResult,
	query::{count_bounds, range_bounds},
};

type Bounds = (Option<f64>, Option<f64>);

/// A flexible-mode candidate with its two signals. A missing signal counts as zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
	pub row: PropertyRow,
	pub structural: Option<f32>,
	pub semantic: Option<f32>,
}

pub struct ResultRanker<'a> {
	ranking: &'a Ranking,
	search: &'a Search,
}
impl<'a> ResultRanker<'a> {
	pub fn new(cfg: &'a Config) -> Self {
		Self { ranking: &cfg.ranking, search: &cfg.search }
	}

	pub fn structural_score(&self, row: &PropertyRow, criteria: &SearchCriteria) -> f32 {
		structural_score(row, criteria, self.search, &self.ranking.bands)
	}

	/// Exact matches are binary, so order is price ascending with unpriced rows last.
	pub fn rank_exact(&self, mut rows: Vec<PropertyRow>) -> Vec<RankedResult> {
		rows.sort_by(cmp_price_then_id);

		rows.into_iter().map(|row| RankedResult::new(row, 1.0)).collect()
	}

	pub fn rank_flexible(&self, candidates: Vec<Candidate>) -> Vec<RankedResult> {
		let mut results = candidates
			.into_iter()
			.map(|candidate| {
				let structural = candidate.structural.unwrap_or(0.0);
				let semantic = candidate.semantic.unwrap_or(0.0);
				let score =
					self.ranking.sql_weight * structural + self.ranking.vector_weight * semantic;
				let mut result = RankedResult::new(candidate.row, score);

				result.structural_score = candidate.structural;
				result.semantic_score = candidate.semantic;

				result
			})
			.collect::<Vec<_>>();

		results.sort_by(|a, b| {
			cmp_f32_desc(a.match_score, b.match_score)
				.then_with(|| cmp_price_then_id(&a.property, &b.property))
		});

		results
	}
}

/// Mean band score over the numeric dimensions the criteria constrain. Unconstrained criteria
/// score 1.0; a row missing a constrained value falls in the outside band.
pub fn structural_score(
	row: &PropertyRow,
	criteria: &SearchCriteria,
	search: &Search,
	bands: &RankingBands,
) -> f32 {
	let tolerance = &search.tolerance;
	let mut dimensions = Vec::new();
	let counts = [
		(row.rooms, criteria.rooms.as_ref()),
		(row.baths, criteria.baths.as_ref()),
		(row.halls, criteria.halls.as_ref()),
	];

	for (value, filter) in counts {
		if let Some(filter) = filter.filter(|filter| !filter.is_empty()) {
			dimensions.push(count_band(value, filter, tolerance.count_slack, bands));
		}
	}

	if let Some(area) = criteria.area.as_ref().filter(|area| !area.is_empty()) {
		dimensions.push(range_band(
			row.area_m2,
			area,
			(tolerance.area_min_factor, tolerance.area_max_factor),
			bands,
		));
	}
	if let Some(price) = criteria.price.as_ref().map(|price| price.range())
		&& !price.is_empty()
	{
		dimensions.push(range_band(
			row.price_num,
			&price,
			(tolerance.price_min_factor, tolerance.price_max_factor),
			bands,
		));
	}

	if dimensions.is_empty() {
		return 1.0;
	}

	dimensions.iter().sum::<f32>() / dimensions.len() as f32
}

fn count_band(value: Option<i32>, filter: &CountFilter, slack: u32, bands: &RankingBands) -> f32 {
	band(value.map(f64::from), count_bounds(filter, 0), count_bounds(filter, slack), bands)
}

fn range_band(
	value: Option<f64>,
	filter: &RangeFilter,
	factors: (f64, f64),
	bands: &RankingBands,
) -> f32 {
	band(value, range_bounds(filter, (1.0, 1.0)), range_bounds(filter, factors), bands)
}

fn band(value: Option<f64>, strict: Bounds, widened: Bounds, bands: &RankingBands) -> f32 {
	match value {
		Some(value) if within(value, strict) => bands.exact,
		Some(value) if within(value, widened) => bands.within_tolerance,
		_ => bands.outside,
	}
}

fn within(value: f64, (min, max): Bounds) -> bool {
	min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Price ascending with unpriced rows last, then id for a total order.
pub fn cmp_price_then_id(a: &PropertyRow, b: &PropertyRow) -> Ordering {
	let by_price = match (a.price_num, b.price_num) {
		(Some(a), Some(b)) => a.total_cmp(&b),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	};

	by_price.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
	use aqar_config::{FacilityDefaults, RankingBands, Search, SearchTolerance, SearchVector};
	use aqar_domain::criteria::{CountFilter, PriceFilter, PropertyType, Purpose, SearchCriteria};
	use aqar_storage::models::PropertyRow;

	use super::{cmp_f32_desc, structural_score};

	fn search() -> Search {
		Search {
			exact_limit: 20,
			flexible_limit: 50,
			resolve_threshold: 0.5,
			default_city: "الرياض".to_string(),
			vector: SearchVector { match_count: 500, similarity_threshold: 0.7 },
			tolerance: SearchTolerance::default(),
			facility_defaults: FacilityDefaults::default(),
		}
	}

	fn row(rooms: Option<i32>, price: Option<f64>) -> PropertyRow {
		PropertyRow { id: "p".to_string(), rooms, price_num: price, ..PropertyRow::default() }
	}

	#[test]
	fn bands_follow_strict_then_widened_bounds() {
		let mut criteria = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);

		criteria.rooms = Some(CountFilter::exact(3));

		let bands = RankingBands::default();

		assert_eq!(structural_score(&row(Some(3), None), &criteria, &search(), &bands), 1.0);
		assert_eq!(structural_score(&row(Some(4), None), &criteria, &search(), &bands), 0.7);
		assert_eq!(structural_score(&row(Some(6), None), &criteria, &search(), &bands), 0.3);
		assert_eq!(structural_score(&row(None, None), &criteria, &search(), &bands), 0.3);
	}

	#[test]
	fn score_is_the_mean_of_evaluated_dimensions() {
		let mut criteria = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);
		let bands = RankingBands::default();

		assert_eq!(structural_score(&row(None, None), &criteria, &search(), &bands), 1.0);

		criteria.rooms = Some(CountFilter::exact(3));
		criteria.price = Some(PriceFilter { max: Some(50_000.0), ..PriceFilter::default() });

		let score = structural_score(&row(Some(3), Some(60_000.0)), &criteria, &search(), &bands);

		assert!((score - 0.85).abs() < 1e-6, "{score}");
	}

	#[test]
	fn nan_sorts_last_in_descending_order() {
		let mut scores = vec![0.2, f32::NAN, 0.9];

		scores.sort_by(|a, b| cmp_f32_desc(*a, *b));

		assert_eq!(scores[0], 0.9);
		assert!(scores[2].is_nan());
	}
}

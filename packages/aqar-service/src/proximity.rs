//! Facility and metro post-filtering, and nearby-facility annotation for display.

use std::collections::HashSet;

use aqar_config::{Search, SearchTolerance};
use aqar_domain::{
	criteria::{FacilityKind, FacilityRequirement, SearchCriteria, TravelMode},
	proximity::{self, GeoPoint},
};
use aqar_storage::{
	filter::FacilityFilter,
	models::{NearbyFacility, PropertyRow},
};

use crate::{
	FacilityStore,
	outcome::{Diagnostic, NearbySummary, RankedResult, Source},
	query::{ResolvedFacility, SpatialContext},
};

/// A requirement's time budget, with flexible-mode slack applied when not strict.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TravelBudget {
	pub minutes: f64,
	pub mode: TravelMode,
}
impl TravelBudget {
	pub fn for_requirement(
		search: &Search,
		requirement: &FacilityRequirement,
		kind: FacilityKind,
		strict: bool,
	) -> Self {
		let mut minutes = requirement.minutes(kind, &search.facility_defaults);

		if !strict {
			minutes += slack_minutes(&search.tolerance, kind);
		}

		Self { minutes, mode: requirement.mode(kind) }
	}

	pub fn meters(self) -> f64 {
		proximity::minutes_to_meters(self.minutes, self.mode)
	}
}

pub fn slack_minutes(tolerance: &SearchTolerance, kind: FacilityKind) -> f64 {
	match kind {
		FacilityKind::School => tolerance.school_slack_minutes,
		FacilityKind::University => tolerance.university_slack_minutes,
		FacilityKind::Mosque => tolerance.mosque_slack_minutes,
	}
}

/// Strict checks reject listings without a metro time; flexible checks let them through.
pub fn metro_satisfied(
	time_to_metro_min: Option<f64>,
	max_minutes: f64,
	strict: bool,
	tolerance: &SearchTolerance,
) -> bool {
	match (time_to_metro_min, strict) {
		(Some(minutes), true) => minutes <= max_minutes,
		(Some(minutes), false) => minutes <= max_minutes + tolerance.metro_slack_minutes,
		(None, strict) => !strict,
	}
}

/// Arguments for the proximity RPCs. A resolved facility narrows the lookup to its canonical name.
pub fn facility_filter(
	kind: FacilityKind,
	requirement: &FacilityRequirement,
	resolved: Option<&ResolvedFacility>,
) -> FacilityFilter {
	let name = resolved.map(|facility| facility.record.name.clone());

	match kind {
		FacilityKind::School => FacilityFilter {
			name,
			gender: requirement.gender.and_then(|gender| gender.store_filter()).map(str::to_string),
			levels: requirement
				.levels
				.iter()
				.map(|level| level.as_store_value().to_string())
				.collect(),
		},
		FacilityKind::University | FacilityKind::Mosque =>
			FacilityFilter { name, ..FacilityFilter::default() },
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActiveRequirement {
	pub kind: FacilityKind,
	pub budget: TravelBudget,
	pub filter: FacilityFilter,
}

pub struct ServiceProximityFilter<'a> {
	search: &'a Search,
	facilities: &'a dyn FacilityStore,
}
impl<'a> ServiceProximityFilter<'a> {
	pub fn new(search: &'a Search, facilities: &'a dyn FacilityStore) -> Self {
		Self { search, facilities }
	}

	/// Required facilities other than the one the fetch was already scoped to.
	pub fn active_requirements(
		&self,
		criteria: &SearchCriteria,
		strict: bool,
		spatial: &SpatialContext,
	) -> Vec<ActiveRequirement> {
		criteria
			.required_facilities()
			.into_iter()
			.filter(|kind| spatial.scoped != Some(*kind))
			.map(|kind| {
				let requirement = criteria.requirement(kind);

				ActiveRequirement {
					kind,
					budget: TravelBudget::for_requirement(self.search, requirement, kind, strict),
					filter: facility_filter(kind, requirement, spatial.resolved_for(kind)),
				}
			})
			.collect()
	}

	/// Keeps candidates that satisfy every active requirement and the metro budget. A failed
	/// lookup counts as unsatisfied.
	pub async fn filter(
		&self,
		candidates: Vec<PropertyRow>,
		criteria: &SearchCriteria,
		strict: bool,
		spatial: &SpatialContext,
	) -> (Vec<PropertyRow>, Vec<Diagnostic>) {
		let active = self.active_requirements(criteria, strict, spatial);
		let metro = criteria.metro_time_max;

		if active.is_empty() && metro.is_none() {
			return (candidates, Vec::new());
		}

		let before = candidates.len();
		let mut kept = Vec::with_capacity(before);
		let mut failed = HashSet::new();
		let mut diagnostics = Vec::new();
		let tolerance = &self.search.tolerance;

		'candidates: for row in candidates {
			if let Some(max_minutes) = metro
				&& !metro_satisfied(row.time_to_metro_min, max_minutes, strict, tolerance)
			{
				continue;
			}
			if active.is_empty() {
				kept.push(row);

				continue;
			}

			let Some(point) = row.location() else {
				continue;
			};

			for requirement in &active {
				let radius_meters = requirement.budget.meters();

				match self
					.facilities
					.within_radius(requirement.kind, point, radius_meters, &requirement.filter)
					.await
				{
					Ok(true) => {},
					Ok(false) => continue 'candidates,
					Err(err) => {
						tracing::warn!(
							error = %err,
							kind = requirement.kind.as_str(),
							property_id = %row.id,
							"Proximity check failed."
						);

						if failed.insert(requirement.kind) {
							let kind = requirement.kind.as_str();

							diagnostics.push(Diagnostic::collaborator(
								Source::FacilityStore,
								format!("{kind} proximity check failed: {err}"),
							));
						}

						continue 'candidates;
					},
				}
			}

			kept.push(row);
		}

		tracing::info!(
			strict,
			requirements = active.len(),
			metro = metro.is_some(),
			before,
			after = kept.len(),
			"Applied proximity filter."
		);

		(kept, diagnostics)
	}

	/// Attaches nearby facilities of every required kind to each result, using the filter radius
	/// widened by the display factor.
	pub async fn annotate(
		&self,
		results: &mut [RankedResult],
		criteria: &SearchCriteria,
		strict: bool,
		spatial: &SpatialContext,
	) -> Vec<Diagnostic> {
		let mut diagnostics = Vec::new();

		for kind in criteria.required_facilities() {
			let requirement = criteria.requirement(kind);
			let budget = TravelBudget::for_requirement(self.search, requirement, kind, strict);
			let radius_meters = budget.meters() * self.search.tolerance.display_widening;
			let filter = facility_filter(kind, requirement, spatial.resolved_for(kind));
			let mut failed = false;

			if radius_meters <= 0.0 {
				continue;
			}

			for result in results.iter_mut() {
				let Some(point) = result.property.location() else {
					continue;
				};

				match self.facilities.nearby(kind, point, radius_meters, &filter).await {
					Ok(found) => *result.nearby_mut(kind) = summarize(point, found, budget.mode),
					Err(err) => {
						tracing::warn!(
							error = %err,
							kind = kind.as_str(),
							property_id = %result.property.id,
							"Nearby facility lookup failed."
						);

						if !failed {
							failed = true;

							diagnostics.push(Diagnostic::collaborator(
								Source::FacilityStore,
								format!("{} display lookup failed: {err}", kind.as_str()),
							));
						}
					},
				}
			}
		}

		diagnostics
	}
}

/// Closest first. Distances the store did not return are computed on the sphere.
pub fn summarize(
	origin: GeoPoint,
	found: Vec<NearbyFacility>,
	mode: TravelMode,
) -> Vec<NearbySummary> {
	let mut summaries = found
		.into_iter()
		.map(|facility| {
			let distance_meters =
				facility.distance_meters.filter(|value| value.is_finite()).unwrap_or_else(|| {
					proximity::haversine_meters(origin, GeoPoint::new(facility.lat, facility.lon))
				});

			NearbySummary {
				name: facility.name,
				alt_name: facility.alt_name,
				lat: facility.lat,
				lon: facility.lon,
				distance_meters,
				travel_minutes: proximity::round_tenths(proximity::meters_to_minutes(
					distance_meters,
					mode,
				)),
				travel_mode: mode,
			}
		})
		.collect::<Vec<_>>();

	summaries.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

	summaries
}

#[cfg(test)]
mod tests {
	use aqar_config::{FacilityDefaults, Search, SearchTolerance, SearchVector};
	use aqar_domain::{
		criteria::{FacilityKind, FacilityRequirement, SchoolGender, SchoolLevel, TravelMode},
		proximity::GeoPoint,
	};
	use aqar_storage::models::NearbyFacility;

	use super::{TravelBudget, facility_filter, metro_satisfied, summarize};

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

	#[test]
	fn flexible_budget_adds_per_kind_slack() {
		let requirement = FacilityRequirement { required: true, ..FacilityRequirement::default() };
		let strict =
			TravelBudget::for_requirement(&search(), &requirement, FacilityKind::Mosque, true);
		let loose =
			TravelBudget::for_requirement(&search(), &requirement, FacilityKind::Mosque, false);

		assert_eq!(strict.minutes, 5.0);
		assert_eq!(loose.minutes, 7.0);
		assert_eq!(strict.mode, TravelMode::Walking);

		let university =
			TravelBudget::for_requirement(&search(), &requirement, FacilityKind::University, false);

		assert_eq!(university.minutes, 20.0);
		assert_eq!(university.meters(), 10_000.0);
	}

	#[test]
	fn metro_budget_handles_missing_values_by_mode() {
		let tolerance = SearchTolerance::default();

		assert!(metro_satisfied(Some(10.0), 10.0, true, &tolerance));
		assert!(!metro_satisfied(Some(11.0), 10.0, true, &tolerance));
		assert!(metro_satisfied(Some(12.0), 10.0, false, &tolerance));
		assert!(!metro_satisfied(Some(12.5), 10.0, false, &tolerance));
		assert!(!metro_satisfied(None, 10.0, true, &tolerance));
		assert!(metro_satisfied(None, 10.0, false, &tolerance));
	}

	#[test]
	fn school_filter_maps_gender_and_levels() {
		let requirement = FacilityRequirement {
			required: true,
			gender: Some(SchoolGender::Girls),
			levels: vec![SchoolLevel::Elementary, SchoolLevel::High],
			..FacilityRequirement::default()
		};
		let filter = facility_filter(FacilityKind::School, &requirement, None);

		assert_eq!(filter.gender.as_deref(), Some("girls"));
		assert_eq!(filter.levels, vec!["elementary".to_string(), "high".to_string()]);

		let mixed = FacilityRequirement { gender: Some(SchoolGender::Mixed), ..requirement };

		assert_eq!(facility_filter(FacilityKind::School, &mixed, None).gender, None);
	}

	#[test]
	fn summaries_fill_missing_distance_and_sort() {
		let origin = GeoPoint::new(24.7136, 46.6753);
		let found = vec![
			NearbyFacility {
				name: "far".to_string(),
				alt_name: None,
				lat: 24.72,
				lon: 46.68,
				distance_meters: Some(2_500.0),
			},
			NearbyFacility {
				name: "computed".to_string(),
				alt_name: None,
				lat: 24.7136,
				lon: 46.6853,
				distance_meters: None,
			},
		];
		let summaries = summarize(origin, found, TravelMode::Driving);

		assert_eq!(summaries[0].name, "computed");
		let computed = summaries[0].distance_meters;

		assert!((computed - 1_010.0).abs() < 20.0, "{computed}");
		assert_eq!(summaries[1].travel_minutes, 5.0);
	}
}

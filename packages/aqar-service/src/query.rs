//! Turns criteria into property predicates and fetches the structural candidate set.

use aqar_config::{Config, Search};
use aqar_domain::{
	criteria::{CountFilter, FacilityKind, RangeFilter, SearchCriteria},
	resolve,
};
use aqar_storage::{
	filter::{Column, FilterValue, GeoScope, Predicate, PropertyFilter},
	models::{FacilityRecord, PropertyRow},
};

use crate::{
	FacilityStore, PropertyStore,
	outcome::{Diagnostic, SearchMode, Source, SourceOutcome},
	proximity::TravelBudget,
};

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFacility {
	pub kind: FacilityKind,
	pub record: FacilityRecord,
	pub score: f32,
}

/// Facilities resolved for this request and the one the fetch was scoped to, if any.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpatialContext {
	pub scoped: Option<FacilityKind>,
	pub resolved: Vec<ResolvedFacility>,
}
impl SpatialContext {
	pub fn resolved_for(&self, kind: FacilityKind) -> Option<&ResolvedFacility> {
		self.resolved.iter().find(|facility| facility.kind == kind)
	}
}

#[derive(Clone, Debug)]
pub struct CandidateSet {
	pub rows: Vec<PropertyRow>,
	/// The filter the rows were fetched with, scope included. Hydrated rows must satisfy it too.
	pub filter: PropertyFilter,
	pub spatial: SpatialContext,
	pub diagnostics: Vec<Diagnostic>,
}

pub struct CriteriaQueryBuilder<'a> {
	search: &'a Search,
	properties: &'a dyn PropertyStore,
	facilities: &'a dyn FacilityStore,
}
impl<'a> CriteriaQueryBuilder<'a> {
	pub fn new(
		cfg: &'a Config,
		properties: &'a dyn PropertyStore,
		facilities: &'a dyn FacilityStore,
	) -> Self {
		Self { search: &cfg.search, properties, facilities }
	}

	pub fn filter(&self, criteria: &SearchCriteria, mode: SearchMode) -> PropertyFilter {
		let limit = match mode {
			SearchMode::Exact => self.search.exact_limit,
			SearchMode::Flexible => self.search.flexible_limit,
		};

		PropertyFilter {
			predicates: predicates(criteria, mode, self.search),
			scope: None,
			limit: Some(limit),
		}
	}

	/// Resolves every required, named facility against the store's canonical list.
	pub async fn resolve(&self, criteria: &SearchCriteria) -> Vec<SourceOutcome<ResolvedFacility>> {
		let mut outcomes = Vec::new();

		for kind in criteria.required_facilities() {
			let Some(name) = criteria.requirement(kind).named() else {
				continue;
			};

			outcomes.push(self.resolve_one(kind, name).await);
		}

		outcomes
	}

	async fn resolve_one(&self, kind: FacilityKind, name: &str) -> SourceOutcome<ResolvedFacility> {
		let records = match self.facilities.list(kind).await {
			Ok(records) => records,
			Err(err) => {
				tracing::warn!(error = %err, kind = kind.as_str(), "Facility listing failed.");

				return SourceOutcome::collaborator_error(Source::FacilityStore, err);
			},
		};

		match resolve::resolve(name, &records, FacilityRecord::names, self.search.resolve_threshold) {
			Some(resolution) => {
				tracing::info!(
					kind = kind.as_str(),
					query = name,
					matched = resolution.name,
					score = resolution.score,
					"Resolved facility name."
				);

				SourceOutcome::Ok(ResolvedFacility {
					kind,
					record: resolution.entity.clone(),
					score: resolution.score,
				})
			},
			None => {
				tracing::warn!(
					kind = kind.as_str(),
					query = name,
					candidates = records.len(),
					"Facility name did not resolve."
				);

				SourceOutcome::ResolutionMiss { kind, query: name.to_string() }
			},
		}
	}

	/// Scope around the first resolved facility, radius from its travel budget.
	pub fn scope_for(
		&self,
		criteria: &SearchCriteria,
		mode: SearchMode,
		resolved: &[ResolvedFacility],
	) -> Option<(FacilityKind, GeoScope)> {
		let facility = resolved.first()?;
		let budget = TravelBudget::for_requirement(
			self.search,
			criteria.requirement(facility.kind),
			facility.kind,
			mode.is_strict(),
		);
		let radius_meters = budget.meters();

		if radius_meters <= 0.0 {
			return None;
		}

		Some((facility.kind, GeoScope { center: facility.record.location(), radius_meters }))
	}

	/// Fetches candidates, scoped to a resolved facility when possible. Store failures are logged
	/// and reported as diagnostics; the candidate set is then empty.
	pub async fn fetch(&self, criteria: &SearchCriteria, mode: SearchMode) -> CandidateSet {
		let base = self.filter(criteria, mode);
		let mut diagnostics = Vec::new();
		let mut resolved = Vec::new();

		for outcome in self.resolve(criteria).await {
			let (facility, diagnostic) = outcome.split();

			resolved.extend(facility);
			diagnostics.extend(diagnostic);
		}

		if let Some((kind, scope)) = self.scope_for(criteria, mode, &resolved) {
			let scoped = base.with_scope(Some(scope));

			match self.fetch_rows(&scoped).await {
				SourceOutcome::Ok(rows) => {
					tracing::info!(
						mode = mode.as_str(),
						kind = kind.as_str(),
						radius_meters = scope.radius_meters,
						count = rows.len(),
						"Fetched spatially scoped candidates."
					);

					return CandidateSet {
						rows,
						filter: scoped,
						spatial: SpatialContext { scoped: Some(kind), resolved },
						diagnostics,
					};
				},
				outcome => diagnostics.extend(outcome.diagnostic()),
			}
		}

		let (rows, diagnostic) = self.fetch_rows(&base).await.split();
		let rows = rows.unwrap_or_default();

		diagnostics.extend(diagnostic);

		tracing::info!(mode = mode.as_str(), count = rows.len(), "Fetched structural candidates.");

		CandidateSet {
			rows,
			filter: base,
			spatial: SpatialContext { scoped: None, resolved },
			diagnostics,
		}
	}

	async fn fetch_rows(&self, filter: &PropertyFilter) -> SourceOutcome<Vec<PropertyRow>> {
		match self.properties.fetch(filter).await {
			Ok(rows) => SourceOutcome::Ok(rows),
			Err(err) => {
				tracing::warn!(
					error = %err,
					scoped = filter.scope.is_some(),
					"Property fetch failed."
				);

				SourceOutcome::collaborator_error(Source::PropertyStore, err)
			},
		}
	}
}

/// Predicates for one mode. Flexible mode widens counts, area and price by the configured
/// tolerance; exact mode keeps every bound as given.
pub fn predicates(criteria: &SearchCriteria, mode: SearchMode, search: &Search) -> Vec<Predicate> {
	let tolerance = &search.tolerance;
	let strict = mode.is_strict();
	let mut out = Vec::new();

	if let Some(purpose) = criteria.purpose {
		out.push(text_eq(Column::Purpose, purpose.as_store_value()));
	}
	if let Some(property_type) = criteria.property_type {
		out.push(text_eq(Column::PropertyType, property_type.as_store_value()));
	}

	out.push(text_eq(Column::City, criteria.city_or(&search.default_city)));

	if let Some(district) = criteria.district() {
		out.push(text_eq(Column::District, district));
	}

	let counts = [
		(Column::Rooms, criteria.rooms.as_ref()),
		(Column::Baths, criteria.baths.as_ref()),
		(Column::Halls, criteria.halls.as_ref()),
	];

	for (column, filter) in counts {
		let Some(filter) = filter else {
			continue;
		};

		match (strict, filter.exact) {
			(true, Some(exact)) => out.push(Predicate::Eq(column, FilterValue::Number(exact.into()))),
			_ => {
				let slack = if strict { 0 } else { tolerance.count_slack };

				push_bounds(&mut out, column, count_bounds(filter, slack));
			},
		}
	}

	if let Some(area) = criteria.area.as_ref() {
		let factors = if strict {
			(1.0, 1.0)
		} else {
			(tolerance.area_min_factor, tolerance.area_max_factor)
		};

		push_bounds(&mut out, Column::AreaM2, range_bounds(area, factors));
	}
	if let Some(price) = criteria.price.as_ref() {
		let factors = if strict {
			(1.0, 1.0)
		} else {
			(tolerance.price_min_factor, tolerance.price_max_factor)
		};

		push_bounds(&mut out, Column::PriceNum, range_bounds(&price.range(), factors));

		if strict && let Some(period) = price.period {
			out.push(text_eq(Column::PricePeriod, period.as_store_value()));
		}
	}

	out
}

/// Inclusive bounds for a count filter widened by `slack`. The lower bound never drops below zero.
pub fn count_bounds(filter: &CountFilter, slack: u32) -> (Option<f64>, Option<f64>) {
	let (min, max) = filter.bounds();

	(
		min.map(|value| f64::from(value.saturating_sub(slack))),
		max.map(|value| f64::from(value.saturating_add(slack))),
	)
}

pub fn range_bounds(
	filter: &RangeFilter,
	(min_factor, max_factor): (f64, f64),
) -> (Option<f64>, Option<f64>) {
	(filter.min.map(|value| value * min_factor), filter.max.map(|value| value * max_factor))
}

fn push_bounds(out: &mut Vec<Predicate>, column: Column, (min, max): (Option<f64>, Option<f64>)) {
	if let Some(min) = min {
		out.push(Predicate::Gte(column, min));
	}
	if let Some(max) = max {
		out.push(Predicate::Lte(column, max));
	}
}

fn text_eq(column: Column, value: &str) -> Predicate {
	Predicate::Eq(column, FilterValue::Text(value.to_string()))
}

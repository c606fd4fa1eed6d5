use serde::{Deserialize, Serialize};

use aqar_domain::criteria::{FacilityKind, SearchCriteria, TravelMode};
use aqar_storage::models::PropertyRow;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
	#[default]
	Exact,
	#[serde(alias = "similar")]
	Flexible,
}
impl SearchMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Exact => "exact",
			Self::Flexible => "flexible",
		}
	}

	pub fn is_strict(self) -> bool {
		matches!(self, Self::Exact)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
	#[serde(default)]
	pub mode: SearchMode,
	pub criteria: SearchCriteria,
}

/// Result of a search call. Searches never fail; degraded collaborators show up as diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
	Completed(SearchResponse),
	NeedsMoreInput { missing: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub mode: SearchMode,
	pub results: Vec<RankedResult>,
	/// Ranked candidates before truncation to the mode's limit.
	pub total_count: usize,
	pub ranking_source: RankingSource,
	#[serde(default)]
	pub diagnostics: Vec<Diagnostic>,
}

/// Which signal ordered the results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingSource {
	Price,
	Vector,
	WeightedNumeric,
	StructuralOnly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
	pub property: PropertyRow,
	pub match_score: f32,
	pub structural_score: Option<f32>,
	pub semantic_score: Option<f32>,
	#[serde(default)]
	pub nearby_schools: Vec<NearbySummary>,
	#[serde(default)]
	pub nearby_universities: Vec<NearbySummary>,
	#[serde(default)]
	pub nearby_mosques: Vec<NearbySummary>,
}
impl RankedResult {
	pub fn new(property: PropertyRow, match_score: f32) -> Self {
		Self {
			property,
			match_score,
			structural_score: None,
			semantic_score: None,
			nearby_schools: Vec::new(),
			nearby_universities: Vec::new(),
			nearby_mosques: Vec::new(),
		}
	}

	pub fn nearby_mut(&mut self, kind: FacilityKind) -> &mut Vec<NearbySummary> {
		match kind {
			FacilityKind::School => &mut self.nearby_schools,
			FacilityKind::University => &mut self.nearby_universities,
			FacilityKind::Mosque => &mut self.nearby_mosques,
		}
	}
}

/// A facility near a result, for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbySummary {
	pub name: String,
	pub alt_name: Option<String>,
	pub lat: f64,
	pub lon: f64,
	pub distance_meters: f64,
	pub travel_minutes: f64,
	pub travel_mode: TravelMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
	PropertyStore,
	FacilityStore,
	VectorIndex,
	Embedding,
	NumericFallback,
}
impl Source {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::PropertyStore => "property_store",
			Self::FacilityStore => "facility_store",
			Self::VectorIndex => "vector_index",
			Self::Embedding => "embedding",
			Self::NumericFallback => "numeric_fallback",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
	CollaboratorError,
	ResolutionMiss,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
	pub source: Source,
	pub cause: Cause,
	pub message: String,
}
impl Diagnostic {
	pub fn collaborator(source: Source, message: impl Into<String>) -> Self {
		Self { source, cause: Cause::CollaboratorError, message: message.into() }
	}

	pub fn resolution_miss(kind: FacilityKind, query: &str) -> Self {
		Self {
			source: Source::FacilityStore,
			cause: Cause::ResolutionMiss,
			message: format!("No {} matched {query:?}.", kind.as_str()),
		}
	}
}

/// Typed result of one collaborator call inside a search.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceOutcome<T> {
	Ok(T),
	CollaboratorError { source: Source, message: String },
	ResolutionMiss { kind: FacilityKind, query: String },
}
impl<T> SourceOutcome<T> {
	pub fn collaborator_error(source: Source, err: impl std::fmt::Display) -> Self {
		Self::CollaboratorError { source, message: err.to_string() }
	}

	pub fn diagnostic(&self) -> Option<Diagnostic> {
		match self {
			Self::Ok(_) => None,
			Self::CollaboratorError { source, message } =>
				Some(Diagnostic::collaborator(*source, message.clone())),
			Self::ResolutionMiss { kind, query } => Some(Diagnostic::resolution_miss(*kind, query)),
		}
	}

	/// Splits into the value, if any, and the diagnostic to report, if any.
	pub fn split(self) -> (Option<T>, Option<Diagnostic>) {
		let diagnostic = self.diagnostic();

		match self {
			Self::Ok(value) => (Some(value), diagnostic),
			_ => (None, diagnostic),
		}
	}
}

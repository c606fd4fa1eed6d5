use std::collections::{HashMap, HashSet};

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use aqar_domain::criteria::{PriceFilter, SearchCriteria};
use aqar_storage::models::{NumericTarget, ScoredId};

use crate::{
	SearchService,
	cache::{SearchCache, embedding_key, key_prefix, search_key},
	outcome::{
		Cause, Diagnostic, RankingSource, SearchMode, SearchOutcome, SearchRequest, SearchResponse,
		Source, SourceOutcome,
	},
	proximity::ServiceProximityFilter,
	query::{CandidateSet, CriteriaQueryBuilder, SpatialContext},
	ranking::{Candidate, ResultRanker},
};

/// Ranked ids from the vector index or the numeric fallback, scores clamped to [0, 1].
struct Signal {
	source: RankingSource,
	scores: Vec<(String, f32)>,
}
impl Signal {
	fn structural_only() -> Self {
		Self { source: RankingSource::StructuralOnly, scores: Vec::new() }
	}

	fn from_scored(source: RankingSource, scored: Vec<ScoredId>) -> Self {
		let mut seen = HashSet::new();
		let scores = scored
			.into_iter()
			.filter(|item| seen.insert(item.id.clone()))
			.map(|item| {
				let score = if item.score.is_finite() { item.score.clamp(0.0, 1.0) } else { 0.0 };

				(item.id, score as f32)
			})
			.collect();

		Self { source, scores }
	}
}

impl SearchService {
	/// Runs one search. Collaborator failures degrade the response and are reported as
	/// diagnostics; this never returns an error.
	pub async fn search(&self, request: SearchRequest) -> SearchOutcome {
		let SearchRequest { mode, criteria } = request;
		let missing = criteria.missing_fields();

		if !missing.is_empty() {
			tracing::info!(mode = mode.as_str(), missing = ?missing, "Search needs more input.");

			return SearchOutcome::NeedsMoreInput {
				missing: missing.into_iter().map(str::to_string).collect(),
			};
		}

		let cache_key = self.search_cache_key(mode, &criteria);

		if let Some(key) = cache_key.as_deref()
			&& let Some(response) = self.cached_response(key)
		{
			return SearchOutcome::Completed(response);
		}

		let response = match mode {
			SearchMode::Exact => self.search_exact(&criteria).await,
			SearchMode::Flexible => self.search_flexible(&criteria).await,
		};

		tracing::info!(
			mode = mode.as_str(),
			total_count = response.total_count,
			returned = response.results.len(),
			ranking_source = ?response.ranking_source,
			diagnostics = response.diagnostics.len(),
			"Search completed."
		);

		if let Some(key) = cache_key.as_deref() {
			self.store_response(key, &response);
		}

		SearchOutcome::Completed(response)
	}

	async fn search_exact(&self, criteria: &SearchCriteria) -> SearchResponse {
		let mode = SearchMode::Exact;
		let builder = self.query_builder();
		let proximity = self.proximity_filter();
		let CandidateSet { rows, spatial, mut diagnostics, .. } =
			builder.fetch(criteria, mode).await;
		let (rows, filter_diagnostics) = proximity.filter(rows, criteria, true, &spatial).await;

		diagnostics.extend(filter_diagnostics);

		let mut results = ResultRanker::new(&self.cfg).rank_exact(rows);
		let total_count = results.len();

		results.truncate(self.cfg.search.exact_limit as usize);
		diagnostics.extend(proximity.annotate(&mut results, criteria, true, &spatial).await);

		SearchResponse {
			mode,
			results,
			total_count,
			ranking_source: RankingSource::Price,
			diagnostics,
		}
	}

	async fn search_flexible(&self, criteria: &SearchCriteria) -> SearchResponse {
		let mode = SearchMode::Flexible;
		let builder = self.query_builder();
		let proximity = self.proximity_filter();
		let ranker = ResultRanker::new(&self.cfg);
		let (candidates, (vector_ids, signal_diagnostics)) =
			tokio::join!(builder.fetch(criteria, mode), self.semantic_signal(criteria));
		let CandidateSet { rows, filter, spatial, mut diagnostics } = candidates;

		diagnostics.extend(signal_diagnostics);

		// Ids already fetched are never hydrated again, even if proximity rejected them.
		let fetched = rows.iter().map(|row| row.id.clone()).collect::<HashSet<_>>();
		let (rows, filter_diagnostics) = proximity.filter(rows, criteria, false, &spatial).await;

		diagnostics.extend(filter_diagnostics);

		let signal = if !vector_ids.is_empty() {
			Signal::from_scored(RankingSource::Vector, vector_ids)
		} else {
			self.numeric_signal(criteria, &spatial, &mut diagnostics).await
		};
		let by_id =
			signal.scores.iter().map(|(id, score)| (id.as_str(), *score)).collect::<HashMap<_, _>>();
		let has_signal = signal.source != RankingSource::StructuralOnly;
		let mut candidates = rows
			.into_iter()
			.map(|row| {
				let semantic =
					has_signal.then(|| by_id.get(row.id.as_str()).copied().unwrap_or(0.0));

				Candidate { structural: Some(ranker.structural_score(&row, criteria)), semantic, row }
			})
			.collect::<Vec<_>>();
		let missing = signal
			.scores
			.iter()
			.filter(|(id, _)| !fetched.contains(id))
			.map(|(id, _)| id.clone())
			.collect::<Vec<_>>();

		if !missing.is_empty() {
			let hydrated = match self.collaborators.properties.fetch_by_ids(&missing, &filter).await {
				Ok(rows) => rows,
				Err(err) => {
					tracing::warn!(error = %err, count = missing.len(), "Candidate hydration failed.");

					diagnostics.push(Diagnostic::collaborator(
						Source::PropertyStore,
						format!("Hydrating ranked ids failed: {err}"),
					));

					Vec::new()
				},
			};
			let (hydrated, hydrate_diagnostics) =
				proximity.filter(hydrated, criteria, false, &spatial).await;

			diagnostics.extend(hydrate_diagnostics);

			tracing::info!(requested = missing.len(), hydrated = hydrated.len(), "Hydrated ranked ids.");

			candidates.extend(
				hydrated.into_iter().filter(|row| !fetched.contains(&row.id)).map(|row| Candidate {
					structural: None,
					semantic: Some(by_id.get(row.id.as_str()).copied().unwrap_or(0.0)),
					row,
				}),
			);
		}

		let mut results = ranker.rank_flexible(candidates);
		let total_count = results.len();

		results.truncate(self.cfg.search.flexible_limit as usize);
		diagnostics.extend(proximity.annotate(&mut results, criteria, false, &spatial).await);

		SearchResponse { mode, results, total_count, ranking_source: signal.source, diagnostics }
	}

	/// Embeds the free-text query and asks the vector index for similar listings. No query text
	/// means no signal.
	async fn semantic_signal(&self, criteria: &SearchCriteria) -> (Vec<ScoredId>, Vec<Diagnostic>) {
		let Some(text) = criteria.query_text() else {
			return (Vec::new(), Vec::new());
		};
		let embedding = match self.embed_query(text).await {
			SourceOutcome::Ok(embedding) => embedding,
			outcome => return (Vec::new(), outcome.diagnostic().into_iter().collect()),
		};
		let vector = &self.cfg.search.vector;

		match self
			.collaborators
			.vectors
			.search(&embedding, vector.similarity_threshold, vector.match_count)
			.await
		{
			Ok(ids) => {
				tracing::info!(count = ids.len(), "Vector index returned matches.");

				(ids, Vec::new())
			},
			Err(err) => {
				tracing::warn!(error = %err, "Vector search failed.");

				(Vec::new(), vec![Diagnostic::collaborator(Source::VectorIndex, err.to_string())])
			},
		}
	}

	async fn embed_query(&self, text: &str) -> SourceOutcome<Vec<f32>> {
		let provider = &self.cfg.providers.embedding;
		let key = match embedding_key(&provider.provider_id, &provider.model, text) {
			Ok(key) => Some(key),
			Err(err) => {
				tracing::warn!(error = %err, "Failed to build embedding cache key.");

				None
			},
		};

		if let (Some(cache), Some(key)) = (self.collaborators.cache.as_deref(), key.as_deref())
			&& let Some(payload) = cache.get(key, OffsetDateTime::now_utc())
		{
			match serde_json::from_value::<Vec<f32>>(payload) {
				Ok(embedding) => {
					tracing::info!(cache_key_prefix = key_prefix(key), "Embedding cache hit.");

					return SourceOutcome::Ok(embedding);
				},
				Err(err) => tracing::warn!(
					error = %err,
					cache_key_prefix = key_prefix(key),
					"Cached embedding is unreadable."
				),
			}
		}

		let embedding = match self.collaborators.embedding.embed(text).await {
			Ok(embedding) => embedding,
			Err(err) => {
				tracing::warn!(error = %err, "Query embedding failed.");

				return SourceOutcome::collaborator_error(Source::Embedding, err);
			},
		};

		if let (Some(cache), Some(key)) = (self.collaborators.cache.as_deref(), key.as_deref()) {
			cache.put(
				key,
				Value::from(embedding.clone()),
				Duration::seconds(self.cfg.cache.embedding_ttl_seconds),
				OffsetDateTime::now_utc(),
			);
		}

		SourceOutcome::Ok(embedding)
	}

	/// Second step of the cascade. Skipped when there is neither a target price nor a target
	/// location.
	async fn numeric_signal(
		&self,
		criteria: &SearchCriteria,
		spatial: &SpatialContext,
		diagnostics: &mut Vec<Diagnostic>,
	) -> Signal {
		let Some(target) = numeric_target(criteria, spatial, &self.cfg.search.default_city) else {
			tracing::info!("No numeric target. Ranking by structural score.");

			return Signal::structural_only();
		};

		match self.collaborators.properties.numeric_neighbors(&target).await {
			Ok(ids) if !ids.is_empty() => {
				tracing::info!(count = ids.len(), "Numeric fallback returned matches.");

				Signal::from_scored(RankingSource::WeightedNumeric, ids)
			},
			Ok(_) => Signal::structural_only(),
			Err(err) => {
				tracing::warn!(error = %err, "Numeric fallback failed.");

				diagnostics.push(Diagnostic::collaborator(Source::NumericFallback, err.to_string()));

				Signal::structural_only()
			},
		}
	}

	fn query_builder(&self) -> CriteriaQueryBuilder<'_> {
		CriteriaQueryBuilder::new(
			&self.cfg,
			self.collaborators.properties.as_ref(),
			self.collaborators.facilities.as_ref(),
		)
	}

	fn proximity_filter(&self) -> ServiceProximityFilter<'_> {
		ServiceProximityFilter::new(&self.cfg.search, self.collaborators.facilities.as_ref())
	}

	fn search_cache_key(&self, mode: SearchMode, criteria: &SearchCriteria) -> Option<String> {
		self.collaborators.cache.as_ref()?;

		match search_key(mode, criteria) {
			Ok(key) => Some(key),
			Err(err) => {
				tracing::warn!(error = %err, "Failed to build search cache key.");

				None
			},
		}
	}

	fn cached_response(&self, key: &str) -> Option<SearchResponse> {
		let cache: &dyn SearchCache = self.collaborators.cache.as_deref()?;
		let payload = cache.get(key, OffsetDateTime::now_utc())?;

		match serde_json::from_value(payload) {
			Ok(response) => {
				tracing::info!(cache_key_prefix = key_prefix(key), "Search cache hit.");

				Some(response)
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = key_prefix(key),
					"Cached search response is unreadable."
				);

				None
			},
		}
	}

	/// Degraded responses are not cached.
	fn store_response(&self, key: &str, response: &SearchResponse) {
		let Some(cache) = self.collaborators.cache.as_deref() else {
			return;
		};

		if response
			.diagnostics
			.iter()
			.any(|diagnostic| diagnostic.cause == Cause::CollaboratorError)
		{
			return;
		}

		match serde_json::to_value(response) {
			Ok(payload) => cache.put(
				key,
				payload,
				Duration::seconds(self.cfg.cache.search_ttl_seconds),
				OffsetDateTime::now_utc(),
			),
			Err(err) => tracing::warn!(
				error = %err,
				cache_key_prefix = key_prefix(key),
				"Failed to encode search response for cache."
			),
		}
	}
}

/// Target for the price/location-ranked fallback: the price midpoint and the first resolved
/// facility's location.
pub fn numeric_target(
	criteria: &SearchCriteria,
	spatial: &SpatialContext,
	default_city: &str,
) -> Option<NumericTarget> {
	let price = criteria.price.as_ref().and_then(PriceFilter::target);
	let location = spatial.resolved.first().map(|facility| facility.record.location());

	if price.is_none() && location.is_none() {
		return None;
	}

	Some(NumericTarget {
		purpose: criteria.purpose?.as_store_value().to_string(),
		property_type: criteria.property_type?.as_store_value().to_string(),
		city: criteria.city_or(default_city).to_string(),
		location,
		price,
	})
}

#[cfg(test)]
mod tests {
	use aqar_domain::criteria::{FacilityKind, PriceFilter, PropertyType, Purpose, SearchCriteria};
	use aqar_storage::models::{FacilityRecord, ScoredId};

	use super::{Signal, numeric_target};
	use crate::{
		outcome::RankingSource,
		query::{ResolvedFacility, SpatialContext},
	};

	#[test]
	fn numeric_target_needs_price_or_location() {
		let mut criteria = SearchCriteria::new(Purpose::Sale, PropertyType::Villa);

		assert!(numeric_target(&criteria, &SpatialContext::default(), "الرياض").is_none());

		criteria.price = Some(PriceFilter {
			min: Some(1_000_000.0),
			max: Some(2_000_000.0),
			..PriceFilter::default()
		});

		let target = numeric_target(&criteria, &SpatialContext::default(), "الرياض").expect("target");

		assert_eq!(target.price, Some(1_500_000.0));
		assert_eq!(target.purpose, "للبيع");
		assert_eq!(target.city, "الرياض");
		assert!(target.location.is_none());
	}

	#[test]
	fn numeric_target_uses_resolved_location() {
		let criteria = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);
		let spatial = SpatialContext {
			scoped: Some(FacilityKind::University),
			resolved: vec![ResolvedFacility {
				kind: FacilityKind::University,
				record: FacilityRecord {
					name: "جامعة الملك سعود".to_string(),
					alt_name: None,
					lat: 24.7163,
					lon: 46.6195,
				},
				score: 1.0,
			}],
		};
		let target = numeric_target(&criteria, &spatial, "الرياض").expect("target");

		assert_eq!(target.price, None);
		assert_eq!(target.location.map(|point| point.lat), Some(24.7163));
	}

	#[test]
	fn signal_scores_are_clamped_and_deduplicated() {
		let signal = Signal::from_scored(
			RankingSource::Vector,
			vec![
				ScoredId { id: "a".to_string(), score: 1.4 },
				ScoredId { id: "b".to_string(), score: -0.2 },
				ScoredId { id: "a".to_string(), score: 0.1 },
				ScoredId { id: "c".to_string(), score: f64::NAN },
			],
		);

		assert_eq!(
			signal.scores,
			vec![("a".to_string(), 1.0), ("b".to_string(), 0.0), ("c".to_string(), 0.0)]
		);
	}
}

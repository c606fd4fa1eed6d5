pub mod cache;
pub mod outcome;
pub mod proximity;
pub mod query;
pub mod ranking;
pub mod search;

mod error;

pub use cache::{SearchCache, TtlCache};
pub use error::{Error, Result};
pub use outcome::{
	Cause, Diagnostic, NearbySummary, RankedResult, RankingSource, SearchMode, SearchOutcome,
	SearchRequest, SearchResponse, Source, SourceOutcome,
};

use std::{future::Future, pin::Pin, sync::Arc};

use aqar_config::Config;
use aqar_domain::{criteria::FacilityKind, proximity::GeoPoint};
use aqar_providers::EmbeddingClient;
use aqar_storage::{
	db::Db,
	filter::{FacilityFilter, PropertyFilter},
	models::{FacilityRecord, NearbyFacility, NumericTarget, PropertyRow, ScoredId},
	queries,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait PropertyStore
where
	Self: Send + Sync,
{
	fn fetch<'a>(&'a self, filter: &'a PropertyFilter) -> BoxFuture<'a, Result<Vec<PropertyRow>>>;

	/// Batch load by id. Rows must still satisfy `filter`.
	fn fetch_by_ids<'a>(
		&'a self,
		ids: &'a [String],
		filter: &'a PropertyFilter,
	) -> BoxFuture<'a, Result<Vec<PropertyRow>>>;

	fn fetch_one<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<PropertyRow>>>;

	fn numeric_neighbors<'a>(
		&'a self,
		target: &'a NumericTarget,
	) -> BoxFuture<'a, Result<Vec<ScoredId>>>;
}

pub trait FacilityStore
where
	Self: Send + Sync,
{
	fn list<'a>(&'a self, kind: FacilityKind) -> BoxFuture<'a, Result<Vec<FacilityRecord>>>;

	fn within_radius<'a>(
		&'a self,
		kind: FacilityKind,
		point: GeoPoint,
		radius_meters: f64,
		filter: &'a FacilityFilter,
	) -> BoxFuture<'a, Result<bool>>;

	fn nearby<'a>(
		&'a self,
		kind: FacilityKind,
		center: GeoPoint,
		radius_meters: f64,
		filter: &'a FacilityFilter,
	) -> BoxFuture<'a, Result<Vec<NearbyFacility>>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		embedding: &'a [f32],
		threshold: f32,
		count: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredId>>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;
}

#[derive(Clone)]
pub struct Collaborators {
	pub properties: Arc<dyn PropertyStore>,
	pub facilities: Arc<dyn FacilityStore>,
	pub vectors: Arc<dyn VectorIndex>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub cache: Option<Arc<dyn SearchCache>>,
}
impl Collaborators {
	pub fn new(
		properties: Arc<dyn PropertyStore>,
		facilities: Arc<dyn FacilityStore>,
		vectors: Arc<dyn VectorIndex>,
		embedding: Arc<dyn EmbeddingProvider>,
	) -> Self {
		Self { properties, facilities, vectors, embedding, cache: None }
	}

	pub fn with_cache(mut self, cache: Arc<dyn SearchCache>) -> Self {
		self.cache = Some(cache);

		self
	}
}

/// Postgres-backed store covering listings, facilities and listing vectors.
pub struct PgStore {
	pub db: Db,
}
impl PropertyStore for PgStore {
	fn fetch<'a>(&'a self, filter: &'a PropertyFilter) -> BoxFuture<'a, Result<Vec<PropertyRow>>> {
		Box::pin(async move { Ok(queries::fetch_properties(&self.db, filter).await?) })
	}

	fn fetch_by_ids<'a>(
		&'a self,
		ids: &'a [String],
		filter: &'a PropertyFilter,
	) -> BoxFuture<'a, Result<Vec<PropertyRow>>> {
		Box::pin(async move { Ok(queries::fetch_properties_by_ids(&self.db, ids, filter).await?) })
	}

	fn fetch_one<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<PropertyRow>>> {
		Box::pin(async move { Ok(queries::fetch_property(&self.db, id).await?) })
	}

	fn numeric_neighbors<'a>(
		&'a self,
		target: &'a NumericTarget,
	) -> BoxFuture<'a, Result<Vec<ScoredId>>> {
		Box::pin(async move { Ok(queries::flexible_ranked(&self.db, target).await?) })
	}
}

impl FacilityStore for PgStore {
	fn list<'a>(&'a self, kind: FacilityKind) -> BoxFuture<'a, Result<Vec<FacilityRecord>>> {
		Box::pin(async move { Ok(queries::list_facilities(&self.db, kind).await?) })
	}

	fn within_radius<'a>(
		&'a self,
		kind: FacilityKind,
		point: GeoPoint,
		radius_meters: f64,
		filter: &'a FacilityFilter,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(queries::check_proximity(&self.db, kind, point, radius_meters, filter).await?)
		})
	}

	fn nearby<'a>(
		&'a self,
		kind: FacilityKind,
		center: GeoPoint,
		radius_meters: f64,
		filter: &'a FacilityFilter,
	) -> BoxFuture<'a, Result<Vec<NearbyFacility>>> {
		Box::pin(async move {
			Ok(queries::nearby_for_display(&self.db, kind, center, radius_meters, filter).await?)
		})
	}
}

impl VectorIndex for PgStore {
	fn search<'a>(
		&'a self,
		embedding: &'a [f32],
		threshold: f32,
		count: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredId>>> {
		Box::pin(async move {
			Ok(queries::match_property_vectors(&self.db, embedding, threshold, count).await?)
		})
	}
}

impl EmbeddingProvider for EmbeddingClient {
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(self.embed_one(text).await?) })
	}
}

pub struct SearchService {
	pub cfg: Config,
	pub collaborators: Collaborators,
}
impl SearchService {
	/// Wires the Postgres store, the embedding client and, when enabled, the in-process cache.
	pub fn new(cfg: Config, db: Db) -> Self {
		let store = Arc::new(PgStore { db });
		let embedding = Arc::new(EmbeddingClient::new(cfg.providers.embedding.clone()));
		let mut collaborators =
			Collaborators::new(store.clone(), store.clone(), store, embedding);

		if cfg.cache.enabled {
			collaborators = collaborators.with_cache(Arc::new(TtlCache::default()));
		}

		Self { cfg, collaborators }
	}

	pub fn with_collaborators(cfg: Config, collaborators: Collaborators) -> Self {
		Self { cfg, collaborators }
	}

	/// Single listing lookup by id.
	pub async fn property(&self, id: &str) -> Result<Option<PropertyRow>> {
		let id = id.trim();

		if id.is_empty() {
			return Err(Error::InvalidRequest { message: "id must not be empty.".to_string() });
		}

		self.collaborators.properties.fetch_one(id).await
	}
}

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub cache: Cache,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Search {
	pub exact_limit: u32,
	pub flexible_limit: u32,
	#[serde(default = "default_resolve_threshold")]
	pub resolve_threshold: f32,
	#[serde(default = "default_city")]
	pub default_city: String,
	pub vector: SearchVector,
	#[serde(default)]
	pub tolerance: SearchTolerance,
	#[serde(default)]
	pub facility_defaults: FacilityDefaults,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchVector {
	pub match_count: u32,
	pub similarity_threshold: f32,
}

/// Widening applied by flexible-mode searches.
///
/// Factors multiply the user's bounds; slack values are added to counts or travel budgets.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchTolerance {
	pub count_slack: u32,
	pub area_min_factor: f64,
	pub area_max_factor: f64,
	pub price_min_factor: f64,
	pub price_max_factor: f64,
	pub metro_slack_minutes: f64,
	pub school_slack_minutes: f64,
	pub university_slack_minutes: f64,
	pub mosque_slack_minutes: f64,
	/// Multiplier on the filter radius used when listing nearby facilities for display.
	pub display_widening: f64,
}
impl Default for SearchTolerance {
	fn default() -> Self {
		Self {
			count_slack: 1,
			area_min_factor: 0.8,
			area_max_factor: 1.2,
			price_min_factor: 0.7,
			price_max_factor: 1.3,
			metro_slack_minutes: 2.0,
			school_slack_minutes: 3.0,
			university_slack_minutes: 5.0,
			mosque_slack_minutes: 2.0,
			display_widening: 1.5,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FacilityDefaults {
	pub school_minutes: f64,
	pub university_minutes: f64,
	pub mosque_minutes: f64,
}
impl Default for FacilityDefaults {
	fn default() -> Self {
		Self { school_minutes: 10.0, university_minutes: 15.0, mosque_minutes: 5.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub sql_weight: f32,
	pub vector_weight: f32,
	/// The value `sql_weight + vector_weight` must equal.
	pub weight_total: f32,
	pub bands: RankingBands,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			sql_weight: 0.7,
			vector_weight: 0.3,
			weight_total: 1.0,
			bands: RankingBands::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RankingBands {
	pub exact: f32,
	pub within_tolerance: f32,
	pub outside: f32,
}
impl Default for RankingBands {
	fn default() -> Self {
		Self { exact: 1.0, within_tolerance: 0.7, outside: 0.3 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub enabled: bool,
	pub search_ttl_seconds: i64,
	pub embedding_ttl_seconds: i64,
}
impl Default for Cache {
	fn default() -> Self {
		Self { enabled: true, search_ttl_seconds: 300, embedding_ttl_seconds: 3_600 }
	}
}

fn default_resolve_threshold() -> f32 {
	0.5
}

fn default_city() -> String {
	"الرياض".to_string()
}

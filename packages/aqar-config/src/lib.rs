mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, EmbeddingProviderConfig, FacilityDefaults, Postgres, Providers, Ranking,
	RankingBands, Search, SearchTolerance, SearchVector, Service, Storage,
};

use std::{fs, path::Path};

const WEIGHT_EPSILON: f32 = 1e-4;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}

	validate_search(&cfg.search)?;
	validate_ranking(&cfg.ranking)?;

	if cfg.cache.enabled {
		if cfg.cache.search_ttl_seconds <= 0 {
			return Err(Error::Validation {
				message: "cache.search_ttl_seconds must be greater than zero.".to_string(),
			});
		}
		if cfg.cache.embedding_ttl_seconds <= 0 {
			return Err(Error::Validation {
				message: "cache.embedding_ttl_seconds must be greater than zero.".to_string(),
			});
		}
	}

	Ok(())
}

fn validate_search(search: &Search) -> Result<()> {
	if search.exact_limit == 0 {
		return Err(Error::Validation {
			message: "search.exact_limit must be greater than zero.".to_string(),
		});
	}
	if search.flexible_limit == 0 {
		return Err(Error::Validation {
			message: "search.flexible_limit must be greater than zero.".to_string(),
		});
	}
	if search.default_city.trim().is_empty() {
		return Err(Error::Validation {
			message: "search.default_city must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("search.resolve_threshold", search.resolve_threshold),
		("search.vector.similarity_threshold", search.vector.similarity_threshold),
	] {
		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if search.vector.match_count == 0 {
		return Err(Error::Validation {
			message: "search.vector.match_count must be greater than zero.".to_string(),
		});
	}

	let tolerance = &search.tolerance;

	for (label, min_factor, max_factor) in [
		("area", tolerance.area_min_factor, tolerance.area_max_factor),
		("price", tolerance.price_min_factor, tolerance.price_max_factor),
	] {
		if !min_factor.is_finite() || min_factor <= 0.0 || min_factor > 1.0 {
			return Err(Error::Validation {
				message: format!(
					"search.tolerance.{label}_min_factor must be greater than zero and at most 1.0."
				),
			});
		}
		if !max_factor.is_finite() || max_factor < 1.0 {
			return Err(Error::Validation {
				message: format!("search.tolerance.{label}_max_factor must be 1.0 or greater."),
			});
		}
	}
	for (label, slack) in [
		("metro_slack_minutes", tolerance.metro_slack_minutes),
		("school_slack_minutes", tolerance.school_slack_minutes),
		("university_slack_minutes", tolerance.university_slack_minutes),
		("mosque_slack_minutes", tolerance.mosque_slack_minutes),
	] {
		if !slack.is_finite() || slack < 0.0 {
			return Err(Error::Validation {
				message: format!("search.tolerance.{label} must be zero or greater."),
			});
		}
	}

	if !tolerance.display_widening.is_finite() || tolerance.display_widening < 1.0 {
		return Err(Error::Validation {
			message: "search.tolerance.display_widening must be 1.0 or greater.".to_string(),
		});
	}

	let defaults = &search.facility_defaults;

	for (label, minutes) in [
		("school_minutes", defaults.school_minutes),
		("university_minutes", defaults.university_minutes),
		("mosque_minutes", defaults.mosque_minutes),
	] {
		if !minutes.is_finite() || minutes <= 0.0 {
			return Err(Error::Validation {
				message: format!("search.facility_defaults.{label} must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn validate_ranking(ranking: &Ranking) -> Result<()> {
	for (label, weight) in [
		("ranking.sql_weight", ranking.sql_weight),
		("ranking.vector_weight", ranking.vector_weight),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if weight < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if !ranking.weight_total.is_finite() || ranking.weight_total <= 0.0 {
		return Err(Error::Validation {
			message: "ranking.weight_total must be greater than zero.".to_string(),
		});
	}
	if (ranking.sql_weight + ranking.vector_weight - ranking.weight_total).abs() > WEIGHT_EPSILON {
		return Err(Error::Validation {
			message: "ranking.sql_weight and ranking.vector_weight must sum to ranking.weight_total."
				.to_string(),
		});
	}

	let bands = &ranking.bands;

	for (label, value) in [
		("ranking.bands.exact", bands.exact),
		("ranking.bands.within_tolerance", bands.within_tolerance),
		("ranking.bands.outside", bands.outside),
	] {
		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if !(bands.exact >= bands.within_tolerance && bands.within_tolerance >= bands.outside) {
		return Err(Error::Validation {
			message: "ranking.bands must satisfy exact >= within_tolerance >= outside.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let city = cfg.search.default_city.trim();

	if city.len() != cfg.search.default_city.len() {
		cfg.search.default_city = city.to_string();
	}
	if cfg.providers.embedding.api_base.ends_with('/') && cfg.providers.embedding.path.starts_with('/')
	{
		let trimmed = cfg.providers.embedding.api_base.trim_end_matches('/').to_string();

		cfg.providers.embedding.api_base = trimmed;
	}
}

//! Optional short-circuit for repeated searches and query embeddings.

use std::{collections::HashMap, sync::Mutex};

use serde::Serialize;
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::outcome::SearchMode;
use aqar_domain::{criteria::SearchCriteria, text};

const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKind {
	Search,
	Embedding,
}
impl CacheKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Search => "search",
			Self::Embedding => "embedding",
		}
	}
}

pub trait SearchCache
where
	Self: Send + Sync,
{
	fn get(&self, key: &str, now: OffsetDateTime) -> Option<Value>;

	fn put(&self, key: &str, payload: Value, ttl: Duration, now: OffsetDateTime);
}

struct Entry {
	payload: Value,
	expires_at: OffsetDateTime,
}

/// In-process TTL map. Expired entries are dropped on read and on write.
#[derive(Default)]
pub struct TtlCache {
	entries: Mutex<HashMap<String, Entry>>,
}
impl TtlCache {
	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
		self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}
impl SearchCache for TtlCache {
	fn get(&self, key: &str, now: OffsetDateTime) -> Option<Value> {
		let mut entries = self.lock();

		let expired = match entries.get(key) {
			Some(entry) if entry.expires_at > now => return Some(entry.payload.clone()),
			Some(_) => true,
			None => false,
		};

		if expired {
			entries.remove(key);
		}

		None
	}

	fn put(&self, key: &str, payload: Value, ttl: Duration, now: OffsetDateTime) {
		let mut entries = self.lock();

		entries.retain(|_, entry| entry.expires_at > now);
		entries.insert(key.to_string(), Entry { payload, expires_at: now + ttl });
	}
}

#[derive(Serialize)]
struct SearchKey<'a> {
	kind: &'static str,
	schema_version: u32,
	mode: &'static str,
	criteria: &'a SearchCriteria,
}

#[derive(Serialize)]
struct EmbeddingKey<'a> {
	kind: &'static str,
	schema_version: u32,
	provider_id: &'a str,
	model: &'a str,
	text: &'a str,
}

pub fn search_key(mode: SearchMode, criteria: &SearchCriteria) -> serde_json::Result<String> {
	let criteria = normalized_criteria(criteria);
	let payload = SearchKey {
		kind: CacheKind::Search.as_str(),
		schema_version: SCHEMA_VERSION,
		mode: mode.as_str(),
		criteria: &criteria,
	};

	hash_key(&payload)
}

pub fn embedding_key(provider_id: &str, model: &str, query: &str) -> serde_json::Result<String> {
	let text = text::normalize(query);
	let payload = EmbeddingKey {
		kind: CacheKind::Embedding.as_str(),
		schema_version: SCHEMA_VERSION,
		provider_id,
		model,
		text: &text,
	};

	hash_key(&payload)
}

pub fn key_prefix(key: &str) -> &str {
	let len = key.len().min(12);

	&key[..len]
}

fn hash_key<T>(payload: &T) -> serde_json::Result<String>
where
	T: Serialize,
{
	let raw = serde_json::to_vec(payload)?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

/// Text fields are normalized so spelling variants share an entry.
fn normalized_criteria(criteria: &SearchCriteria) -> SearchCriteria {
	let mut criteria = criteria.clone();
	let normalize = |value: &mut Option<String>| {
		*value = value.as_deref().map(text::normalize).filter(|value| !value.is_empty());
	};

	normalize(&mut criteria.city);
	normalize(&mut criteria.district);
	normalize(&mut criteria.query_text);
	normalize(&mut criteria.school.name);
	normalize(&mut criteria.university.name);
	normalize(&mut criteria.mosque.name);

	criteria
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use time::{Duration, OffsetDateTime};

	use super::{SearchCache, TtlCache, embedding_key, key_prefix, search_key};
	use crate::outcome::SearchMode;
	use aqar_domain::criteria::{PropertyType, Purpose, SearchCriteria};

	#[test]
	fn entries_expire_after_ttl() {
		let cache = TtlCache::default();
		let now = OffsetDateTime::UNIX_EPOCH;

		cache.put("k", json!({ "v": 1 }), Duration::seconds(300), now);

		assert_eq!(cache.get("k", now + Duration::seconds(299)), Some(json!({ "v": 1 })));
		assert_eq!(cache.get("k", now + Duration::seconds(300)), None);
		assert!(cache.lock().is_empty());
	}

	#[test]
	fn spelling_variants_share_a_search_key() {
		let mut left = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);
		let mut right = left.clone();

		left.university.name = Some("جامعة الأميرة نورة".to_string());
		right.university.name = Some("جامعه الاميره نوره".to_string());

		assert_eq!(
			search_key(SearchMode::Exact, &left).expect("key"),
			search_key(SearchMode::Exact, &right).expect("key")
		);
		assert_ne!(
			search_key(SearchMode::Exact, &left).expect("key"),
			search_key(SearchMode::Flexible, &left).expect("key")
		);
	}

	#[test]
	fn embedding_key_depends_on_model() {
		let a = embedding_key("local", "bge-m3", "شقة قريبة").expect("key");
		let b = embedding_key("local", "other", "شقة قريبة").expect("key");

		assert_ne!(a, b);
		assert_eq!(key_prefix(&a).len(), 12);
	}
}

// std
use std::time::Duration;

// crates.io
use reqwest::Client;
use serde_json::Value;
use tokio::sync::OnceCell;

// self
use crate::{Error, Result};
use aqar_config::EmbeddingProviderConfig;

/// Client for an OpenAI-compatible embedding endpoint.
///
/// The HTTP client is built on first use and reused for the lifetime of the value.
pub struct EmbeddingClient {
	cfg: EmbeddingProviderConfig,
	http: OnceCell<Client>,
}
impl EmbeddingClient {
	pub fn new(cfg: EmbeddingProviderConfig) -> Self {
		Self { cfg, http: OnceCell::new() }
	}

	pub fn dimensions(&self) -> usize {
		self.cfg.dimensions as usize
	}

	/// Embeds each text into a unit-length vector, in input order.
	pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let client = self.client().await?;
		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let body = serde_json::json!({
			"model": self.cfg.model,
			"input": texts,
			"dimensions": self.cfg.dimensions,
		});
		let res = client
			.post(url)
			.headers(crate::auth_headers(&self.cfg.api_key, &self.cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;
		let vectors = parse_embedding_response(json, self.dimensions())?;

		if vectors.len() != texts.len() {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding response returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		tracing::debug!(
			provider_id = %self.cfg.provider_id,
			count = vectors.len(),
			"Embedded texts."
		);

		Ok(vectors)
	}

	pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let mut vectors = self.embed(&[text.to_string()]).await?;

		vectors.pop().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding response is empty.".to_string(),
		})
	}

	async fn client(&self) -> Result<&Client> {
		self.http
			.get_or_try_init(|| async {
				tracing::info!(provider_id = %self.cfg.provider_id, "Initializing embedding client.");

				Client::builder()
					.timeout(Duration::from_millis(self.cfg.timeout_ms))
					.build()
					.map_err(Error::from)
			})
			.await
	}
}

fn parse_embedding_response(json: Value, dimensions: usize) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Embedding item missing embedding array.".to_string(),
			}
		})?;

		if embedding.len() != dimensions {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding has {} dimensions, expected {dimensions}.",
					embedding.len()
				),
			});
		}

		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, l2_normalize(vec)));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

fn l2_normalize(mut vec: Vec<f32>) -> Vec<f32> {
	let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm > 0.0 && norm.is_finite() {
		vec.iter_mut().for_each(|value| *value /= norm);
	}

	vec
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [0.0, 2.0] },
				{ "index": 0, "embedding": [3.0, 4.0] }
			]
		});
		let parsed = parse_embedding_response(json, 2).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.6, 0.8]);
		assert_eq!(parsed[1], vec![0.0, 1.0]);
	}

	#[test]
	fn rejects_wrong_dimensions() {
		let json = serde_json::json!({ "data": [{ "index": 0, "embedding": [1.0, 2.0, 3.0] }] });
		let err = parse_embedding_response(json, 2).expect_err("Expected dimension mismatch.");

		assert!(err.to_string().contains("expected 2"), "{err}");
	}

	#[test]
	fn zero_vector_is_left_unchanged() {
		assert_eq!(l2_normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
	}
}

use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use aqar_domain::{
	criteria::SearchCriteria,
	merge::{self, CriteriaUpdate},
};
use aqar_service::{Error as ServiceError, SearchOutcome, SearchRequest};
use aqar_storage::models::PropertyRow;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/search", post(search))
		.route("/api/properties/{id}", get(property))
		.route("/api/criteria/merge", post(merge_criteria))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
	#[serde(default)]
	pub previous: Option<SearchCriteria>,
	pub update: CriteriaUpdate,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
	pub criteria: SearchCriteria,
	/// Mandatory fields the merged criteria still lack.
	pub missing: Vec<&'static str>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

/// Always 200. Incomplete criteria come back as a `needs_more_input` outcome.
async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Json<SearchOutcome> {
	Json(state.service.search(payload).await)
}

async fn property(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<PropertyRow>, ApiError> {
	match state.service.property(&id).await? {
		Some(row) => Ok(Json(row)),
		None => Err(ApiError::new(
			StatusCode::NOT_FOUND,
			"not_found",
			format!("Property {id:?} does not exist."),
		)),
	}
}

async fn merge_criteria(Json(payload): Json<MergeRequest>) -> Json<MergeResponse> {
	let criteria = merge::apply_update(payload.previous.as_ref(), payload.update);
	let missing = criteria.missing_fields();

	Json(MergeResponse { criteria, missing })
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::Provider { message } | ServiceError::Storage { message } => {
				tracing::warn!(error = %message, "Upstream collaborator failed.");

				ApiError::new(StatusCode::BAD_GATEWAY, "upstream_error", message)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

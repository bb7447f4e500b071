use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use folio_service::{
	Error, Facet, FacetsResponse, RecordResponse, SearchRequest, SearchResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/search/facets", post(search_facets))
		.route("/v1/resource/{id}", get(resource))
		.route("/v1/filters", get(filters))
		.route("/v1/ping", get(ping))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(mut payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	payload.authenticated = state.is_authenticated(bearer(&headers));
	let response = state.service.search(payload).await?;
	Ok(Json(response))
}

async fn search_facets(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(mut payload): Json<SearchRequest>,
) -> Result<Json<FacetsResponse>, ApiError> {
	payload.authenticated = state.is_authenticated(bearer(&headers));
	let response = state.service.facets(payload).await?;
	Ok(Json(response))
}

async fn resource(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<RecordResponse>, ApiError> {
	let response = state.service.record(&id).await?;
	Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
struct FiltersQuery {
	/// Comma-separated facet ids; absent means every cached facet.
	ids: Option<String>,
}

#[derive(Debug, Serialize)]
struct FiltersResponse {
	facets: Vec<Facet>,
}

async fn filters(
	State(state): State<AppState>,
	Query(query): Query<FiltersQuery>,
) -> Result<Json<FiltersResponse>, ApiError> {
	let ids: Vec<String> = query
		.ids
		.as_deref()
		.unwrap_or_default()
		.split(',')
		.map(str::trim)
		.filter(|id| !id.is_empty())
		.map(str::to_string)
		.collect();
	let facets = state.service.presearch_facets(&ids)?;
	Ok(Json(FiltersResponse { facets }))
}

async fn ping(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
	state.service.ping().await?;
	Ok(StatusCode::OK)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
	headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::InvalidRequest { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::Translation { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "TRANSLATION_FAILED", message, Some(vec![
					"$.query".to_string(),
				])),
			Error::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			Error::MultipleRecords { .. } =>
				Self::new(StatusCode::CONFLICT, "MULTIPLE_RECORDS", message, None),
			Error::NotCached => Self::new(StatusCode::SERVICE_UNAVAILABLE, "NOT_CACHED", message, None),
			Error::Upstream { .. } => {
				tracing::error!(error = %message, "Upstream call failed.");

				Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message, None)
			},
			Error::Configuration { .. } => {
				tracing::error!(error = %message, "Service misconfigured.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR", message, None)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

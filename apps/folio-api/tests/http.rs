use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use folio_api::{routes, state::AppState};
use folio_service::FolioService;
use folio_testkit::{FakeEngine, FakeParser, buckets, grammar, response, response_with_facets};

fn app(engine: Arc<FakeEngine>) -> Router {
	let parser = FakeParser::table(vec![(
		"title: {bleak house}",
		grammar("title_t:(bleak house)", &[("title", &["bleak house"])]),
	)]);
	let service = FolioService::new(folio_testkit::test_config(), engine, Arc::new(parser))
		.expect("Failed to build service.");

	routes::router(AppState::from_service(service))
}

fn post_json(uri: &str, payload: Value, token: Option<&str>) -> Request<Body> {
	let mut builder =
		Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, "application/json");

	if let Some(token) = token {
		builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
	}

	builder.body(Body::from(payload.to_string())).expect("Failed to build request.")
}

fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> Value {
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&body).expect("Failed to parse response body.")
}

#[tokio::test]
async fn health_ok() {
	let engine = Arc::new(FakeEngine::fixed(response(json!([]), 0, 0.0)));
	let response = app(engine).oneshot(get("/health")).await.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_returns_confidence_and_records() {
	let engine = Arc::new(FakeEngine::fixed(response(
		json!([{ "id": "b1", "title_a": ["Bleak House"], "title_exact_s": "Bleak House" }]),
		1,
		12.0,
	)));
	let response = app(engine)
		.oneshot(post_json("/v1/search", json!({ "query": "title: {bleak house}" }), None))
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["confidence"], "exact");
	assert_eq!(json["pagination"]["total"], 1);
	assert_eq!(json["records"][0]["id"], "b1");
	assert!(json.get("groups").is_none());
}

#[tokio::test]
async fn bearer_tokens_switch_facets_to_auth_fields() {
	let engine = Arc::new(FakeEngine::fixed(response(json!([]), 0, 0.0)));
	let payload = json!({
		"query": "",
		"filters": [ { "facets": [ { "facet_id": "FacetLibrary", "value": "MAIN" } ] } ]
	});

	app(engine.clone())
		.oneshot(post_json("/v1/search", payload.clone(), Some("staff-token")))
		.await
		.expect("Failed to call /v1/search.");
	app(engine.clone())
		.oneshot(post_json("/v1/search", payload, Some("guess")))
		.await
		.expect("Failed to call /v1/search.");

	let requests = engine.requests();

	assert!(requests[0].filters.contains(&"library_f:\"MAIN\"".to_string()));
	assert!(requests[1].filters.contains(&"anon_library_f:\"MAIN\"".to_string()));
}

#[tokio::test]
async fn two_filter_groups_are_a_bad_request() {
	let engine = Arc::new(FakeEngine::fixed(response(json!([]), 0, 0.0)));
	let response = app(engine)
		.oneshot(post_json("/v1/search", json!({ "query": "", "filters": [{}, {}] }), None))
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = json_body(response).await;

	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn untranslatable_queries_are_a_bad_request() {
	let engine = Arc::new(FakeEngine::fixed(response(json!([]), 0, 0.0)));
	let response = app(engine)
		.oneshot(post_json("/v1/search", json!({ "query": "title: {" }), None))
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = json_body(response).await;

	assert_eq!(json["error_code"], "TRANSLATION_FAILED");
	assert_eq!(json["fields"][0], "$.query");
}

#[tokio::test]
async fn resource_lookup_maps_not_found() {
	let engine = Arc::new(FakeEngine::new(|req| {
		if req.query == "id:\"u1\"" {
			Ok(response(json!([{ "id": "u1", "subject_a": ["London"] }]), 1, 1.0))
		} else {
			Ok(response(json!([]), 0, 0.0))
		}
	}));
	let found = app(engine.clone())
		.oneshot(get("/v1/resource/u1"))
		.await
		.expect("Failed to call /v1/resource.");
	let missing = app(engine)
		.oneshot(get("/v1/resource/u2"))
		.await
		.expect("Failed to call /v1/resource.");

	assert_eq!(found.status(), StatusCode::OK);
	assert_eq!(missing.status(), StatusCode::NOT_FOUND);

	let json = json_body(found).await;

	assert_eq!(json["record"]["id"], "u1");
}

#[tokio::test]
async fn filters_are_unavailable_until_the_cache_fills() {
	let engine = Arc::new(FakeEngine::fixed(response_with_facets(
		json!([]),
		9,
		0.0,
		json!({ "FacetFormat": buckets(&[("book", 9)]) }),
	)));
	let parser = FakeParser::table(Vec::new());
	let service = Arc::new(
		FolioService::new(folio_testkit::test_config(), engine, Arc::new(parser))
			.expect("Failed to build service."),
	);
	let router = routes::router(AppState { service: service.clone() });
	let cold = router
		.clone()
		.oneshot(get("/v1/filters?ids=FacetFormat"))
		.await
		.expect("Failed to call /v1/filters.");

	assert_eq!(cold.status(), StatusCode::SERVICE_UNAVAILABLE);

	service.refresh_facet_cache().await.expect("Refresh failed.");

	let warm = router
		.oneshot(get("/v1/filters?ids=FacetFormat,FacetColor"))
		.await
		.expect("Failed to call /v1/filters.");

	assert_eq!(warm.status(), StatusCode::OK);

	let json = json_body(warm).await;

	assert_eq!(json["facets"].as_array().map(Vec::len), Some(1));
	assert_eq!(json["facets"][0]["id"], "FacetFormat");
}

#[tokio::test]
async fn ping_maps_engine_failures_to_bad_gateway() {
	let engine = Arc::new(FakeEngine::fixed(response(json!([]), 0, 0.0)));
	let router = app(engine.clone());
	let healthy = router.clone().oneshot(get("/v1/ping")).await.expect("Failed to call /v1/ping.");

	engine.set_healthy(false);

	let down = router.oneshot(get("/v1/ping")).await.expect("Failed to call /v1/ping.");

	assert_eq!(healthy.status(), StatusCode::OK);
	assert_eq!(down.status(), StatusCode::BAD_GATEWAY);
}

//! Scripted stand-ins for the search engine and grammar parser, plus the baseline config the
//! workspace tests run against.

use std::{
	collections::BTreeMap,
	sync::{
		Mutex,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use serde_json::Value;

use folio_config::Config;
use folio_engine::{
	BoxFuture, EngineRequest, EngineResponse, Error, FilterClause, ParsedGrammar, QueryParser,
	Result, SearchEngine,
};

pub const SAMPLE_CONFIG_TEMPLATE_TOML: &str =
	include_str!("../../folio-config/tests/fixtures/sample_config.template.toml");

type Responder = dyn Fn(&EngineRequest) -> Result<EngineResponse> + Send + Sync;
type Grammar = dyn Fn(&str) -> Result<ParsedGrammar> + Send + Sync;

/// The sample configuration, validated.
///
/// # Panics
///
/// Panics when the bundled fixture no longer parses or validates.
pub fn test_config() -> Config {
	let cfg: Config = toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML)
		.unwrap_or_else(|err| panic!("Sample config must parse: {err}."));

	folio_config::validate(&cfg).unwrap_or_else(|err| panic!("Sample config must validate: {err}."));

	cfg
}

/// Answers every select with a caller-supplied closure and records what it was asked.
pub struct FakeEngine {
	responder: Box<Responder>,
	requests: Mutex<Vec<EngineRequest>>,
	healthy: AtomicBool,
}
impl FakeEngine {
	pub fn new<F>(responder: F) -> Self
	where
		F: Fn(&EngineRequest) -> Result<EngineResponse> + Send + Sync + 'static,
	{
		Self {
			responder: Box::new(responder),
			requests: Mutex::new(Vec::new()),
			healthy: AtomicBool::new(true),
		}
	}

	/// Every select answers with the same response.
	pub fn fixed(response: EngineResponse) -> Self {
		Self::new(move |_| Ok(response.clone()))
	}

	pub fn set_healthy(&self, healthy: bool) {
		self.healthy.store(healthy, Ordering::SeqCst);
	}

	pub fn requests(&self) -> Vec<EngineRequest> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn calls(&self) -> usize {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}
impl SearchEngine for FakeEngine {
	fn select<'a>(&'a self, req: &'a EngineRequest) -> BoxFuture<'a, Result<EngineResponse>> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(req.clone());

		let result = (self.responder)(req);

		Box::pin(async move { result })
	}

	fn ping<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		let healthy = self.healthy.load(Ordering::SeqCst);

		Box::pin(async move {
			if healthy {
				Ok(())
			} else {
				Err(Error::Status { url: "fake://engine/admin/ping".to_string(), status: 503 })
			}
		})
	}
}

/// Parses by lookup: each domain query maps to a canned grammar.
pub struct FakeParser {
	grammar: Box<Grammar>,
}
impl FakeParser {
	pub fn new<F>(grammar: F) -> Self
	where
		F: Fn(&str) -> Result<ParsedGrammar> + Send + Sync + 'static,
	{
		Self { grammar: Box::new(grammar) }
	}

	/// Known queries parse to their grammar; anything else is rejected.
	pub fn table(entries: Vec<(&str, ParsedGrammar)>) -> Self {
		let table: BTreeMap<String, ParsedGrammar> =
			entries.into_iter().map(|(query, grammar)| (query.to_string(), grammar)).collect();

		Self::new(move |query| {
			table.get(query).cloned().ok_or_else(|| Error::Rejected {
				message: format!("Unparseable query: {query}."),
			})
		})
	}
}
impl QueryParser for FakeParser {
	fn parse<'a>(&'a self, query: &'a str, _timeout: Duration) -> BoxFuture<'a, Result<ParsedGrammar>> {
		let result = (self.grammar)(query);

		Box::pin(async move { result })
	}
}

pub fn grammar(query: &str, fields: &[(&str, &[&str])]) -> ParsedGrammar {
	grammar_with_filters(query, fields, &[])
}

pub fn grammar_with_filters(
	query: &str,
	fields: &[(&str, &[&str])],
	filters: &[(&str, &str)],
) -> ParsedGrammar {
	ParsedGrammar {
		query: query.to_string(),
		fields: fields
			.iter()
			.map(|(field, terms)| {
				(field.to_string(), terms.iter().map(|term| term.to_string()).collect())
			})
			.collect(),
		filters: filters
			.iter()
			.map(|(id, value)| FilterClause { id: id.to_string(), value: value.to_string() })
			.collect(),
	}
}

/// An engine response with the given documents, total and top score.
///
/// # Panics
///
/// Panics when `docs` is not an array of objects.
pub fn response(docs: Value, num_found: u64, max_score: f32) -> EngineResponse {
	response_with_facets(docs, num_found, max_score, Value::Object(Default::default()))
}

/// As [`response`], with a raw JSON facet section (`{"FacetFormat": {"buckets": [...]}}`).
///
/// # Panics
///
/// Panics when `docs` or `facets` have the wrong shape.
pub fn response_with_facets(docs: Value, num_found: u64, max_score: f32, facets: Value) -> EngineResponse {
	serde_json::from_value(serde_json::json!({
		"responseHeader": { "status": 0, "QTime": 1 },
		"response": { "numFound": num_found, "start": 0, "maxScore": max_score, "docs": docs },
		"facets": facets
	}))
	.unwrap_or_else(|err| panic!("Fake response must decode: {err}."))
}

/// `{"val": v, "count": n}` buckets for one facet.
pub fn buckets(values: &[(&str, u64)]) -> Value {
	let buckets: Vec<Value> = values
		.iter()
		.map(|(value, count)| serde_json::json!({ "val": value, "count": count }))
		.collect();

	serde_json::json!({ "buckets": buckets })
}

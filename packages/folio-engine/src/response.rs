use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineResponse {
	#[serde(rename = "responseHeader", default)]
	pub header: ResponseHeader,
	#[serde(default)]
	pub response: ResponseBody,
	/// Raw JSON facet output keyed by facet id; also carries a top-level `count`.
	#[serde(default)]
	pub facets: Map<String, Value>,
}
impl EngineResponse {
	pub fn max_score(&self) -> f32 {
		self.response.max_score.unwrap_or(0.0)
	}

	pub fn first_document(&self) -> Option<&Document> {
		self.response.docs.first()
	}

	/// Facets that came back with at least one bucket, in engine order.
	pub fn facet_buckets(&self) -> Vec<(String, Vec<Bucket>)> {
		let mut out = Vec::new();

		for (id, value) in &self.facets {
			let Some(buckets) = value.get("buckets").and_then(Value::as_array) else {
				continue;
			};
			let buckets: Vec<Bucket> = buckets.iter().filter_map(Bucket::from_value).collect();

			if !buckets.is_empty() {
				out.push((id.clone(), buckets));
			}
		}

		out
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseHeader {
	/// Zero on success; anything else is an engine-side failure.
	#[serde(default)]
	pub status: i32,
	#[serde(rename = "QTime", default)]
	pub qtime: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseBody {
	#[serde(rename = "numFound", default)]
	pub num_found: u64,
	#[serde(default)]
	pub start: i64,
	#[serde(rename = "maxScore")]
	pub max_score: Option<f32>,
	#[serde(default)]
	pub docs: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
	pub value: String,
	pub count: u64,
}
impl Bucket {
	fn from_value(raw: &Value) -> Option<Self> {
		let value = match raw.get("val")? {
			Value::String(value) => value.clone(),
			Value::Number(number) => number.to_string(),
			Value::Bool(flag) => flag.to_string(),
			_ => return None,
		};
		let count = raw.get("count").and_then(Value::as_u64).unwrap_or(0);

		Some(Self { value, count })
	}
}

/// One engine document. Field values may be scalars or arrays.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Document(pub Map<String, Value>);
impl Document {
	pub fn strings(&self, field: &str) -> Vec<String> {
		match self.0.get(field) {
			Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
			Some(value) => scalar_string(value).into_iter().collect(),
			None => Vec::new(),
		}
	}

	pub fn first(&self, field: &str) -> Option<String> {
		self.strings(field).into_iter().next()
	}
}

fn scalar_string(value: &Value) -> Option<String> {
	match value {
		Value::String(value) => Some(value.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

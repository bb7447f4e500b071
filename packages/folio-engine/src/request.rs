use std::collections::BTreeMap;

use serde::Serialize;

/// Body of a JSON request against the engine's select handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineRequest {
	pub query: String,
	#[serde(rename = "offset")]
	pub start: i64,
	#[serde(rename = "limit")]
	pub rows: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sort: Option<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub fields: Vec<String>,
	#[serde(rename = "filter", skip_serializing_if = "Vec::is_empty")]
	pub filters: Vec<String>,
	#[serde(rename = "facet", skip_serializing_if = "Option::is_none")]
	pub facets: Option<BTreeMap<String, FacetRequest>>,
}
impl EngineRequest {
	/// True when the filter list carries a collapse directive.
	pub fn is_collapsed(&self) -> bool {
		self.filters.iter().any(|filter| filter.starts_with(COLLAPSE_PREFIX))
	}
}

pub const COLLAPSE_PREFIX: &str = "{!collapse";

pub fn collapse_directive(field: &str) -> String {
	format!("{COLLAPSE_PREFIX} field={field}}}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetRequest {
	#[serde(rename = "type")]
	pub kind: &'static str,
	pub field: String,
	pub sort: String,
	pub limit: i64,
}
impl FacetRequest {
	pub fn terms(field: &str, sort: &str, limit: i64) -> Self {
		let sort = match sort {
			"index" => "index asc",
			_ => "count desc",
		};

		Self { kind: "terms", field: field.to_string(), sort: sort.to_string(), limit }
	}
}

/// Quotes a value for use inside a field clause.
pub fn quote(value: &str) -> String {
	let mut out = String::with_capacity(value.len() + 2);

	out.push('"');

	for ch in value.chars() {
		if ch == '"' || ch == '\\' {
			out.push('\\');
		}

		out.push(ch);
	}

	out.push('"');

	out
}

pub fn field_clause(field: &str, value: &str) -> String {
	format!("{field}:{}", quote(value))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serializes_json_request_shape() {
		let mut facets = BTreeMap::new();

		facets.insert("FacetFormat".to_string(), FacetRequest::terms("format_f", "count", -1));

		let req = EngineRequest {
			query: "*:*".to_string(),
			start: 0,
			rows: 0,
			sort: None,
			fields: Vec::new(),
			filters: vec!["pool_f:catalog".to_string()],
			facets: Some(facets),
		};
		let json = serde_json::to_value(&req).expect("serialize failed");

		assert_eq!(json["offset"], 0);
		assert_eq!(json["limit"], 0);
		assert_eq!(json["filter"][0], "pool_f:catalog");
		assert_eq!(json["facet"]["FacetFormat"]["type"], "terms");
		assert_eq!(json["facet"]["FacetFormat"]["sort"], "count desc");
		assert!(json.get("sort").is_none());
		assert!(json.get("fields").is_none());
	}

	#[test]
	fn quotes_embedded_quotes_and_backslashes() {
		assert_eq!(field_clause("work_key_s", r#"a "b" \c"#), r#"work_key_s:"a \"b\" \\c""#);
	}

	#[test]
	fn detects_collapse_directive() {
		let req = EngineRequest {
			filters: vec!["pool_f:catalog".to_string(), collapse_directive("work_key_s")],
			..Default::default()
		};

		assert!(req.is_collapsed());
		assert_eq!(req.filters[1], "{!collapse field=work_key_s}");
	}
}

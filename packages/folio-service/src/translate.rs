use std::time::Duration;

use folio_config::Config;
use folio_engine::{FilterClause, ParsedGrammar, QueryParser, field_clause, quote};

use crate::{Error, Result};

pub const MATCH_ALL: &str = "*:*";

const TITLE_FIELD: &str = "title";
const KEYWORD_FIELD: &str = "keyword";

/// Immutable result of translating one domain query.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
	pub domain_query: String,
	pub engine_query: String,
	pub titles: Vec<String>,
	pub keywords: Vec<String>,
	pub is_single_title_search: bool,
	pub is_single_keyword_search: bool,
	/// Set when an embedded filter names an unknown filter or an unmappable value.
	pub invalid_filter: bool,
	/// Embedded filters that were rewritten into `engine_query`, in query order.
	pub applied_filters: Vec<FilterClause>,
}
impl ParsedQuery {
	pub fn match_all() -> Self {
		Self {
			domain_query: MATCH_ALL.to_string(),
			engine_query: MATCH_ALL.to_string(),
			titles: Vec::new(),
			keywords: Vec::new(),
			is_single_title_search: false,
			is_single_keyword_search: false,
			invalid_filter: false,
			applied_filters: Vec::new(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct Translation {
	pub parsed: ParsedQuery,
	pub warnings: Vec<String>,
}

pub async fn translate(
	cfg: &Config,
	parser: &dyn QueryParser,
	domain_query: &str,
) -> Result<Translation> {
	let timeout = Duration::from_millis(cfg.parser.timeout_ms);
	let grammar = parser
		.parse(domain_query, timeout)
		.await
		.map_err(|err| Error::Translation { message: err.to_string() })?;

	Ok(translate_grammar(cfg, domain_query, grammar))
}

/// Rewrites embedded filter fragments to engine fields and values and classifies the query.
pub fn translate_grammar(cfg: &Config, domain_query: &str, grammar: ParsedGrammar) -> Translation {
	let mut engine_query = grammar.query.clone();
	let mut warnings = Vec::new();
	let mut invalid_filter = false;
	let mut applied_filters = Vec::new();

	for clause in &grammar.filters {
		let Some(def) = cfg.filter(&clause.id) else {
			invalid_filter = true;

			warnings.push(format!("Filter {} is not supported by this pool.", clause.id));

			continue;
		};
		let internal = if def.values.is_empty() {
			Some(clause.value.as_str())
		} else {
			def.values.get(&clause.value).map(String::as_str)
		};
		let Some(internal) = internal else {
			invalid_filter = true;

			warnings.push(format!(
				"Value {} is not supported for filter {}.",
				clause.value, clause.id
			));

			continue;
		};
		let fragment = format!("{}:{}", clause.id, quote(&clause.value));

		if !engine_query.contains(&fragment) {
			tracing::warn!(
				filter_id = %clause.id,
				fragment = %fragment,
				"Filter fragment missing from canonical query."
			);
			warnings.push(format!("Filter {} could not be applied and was dropped.", clause.id));

			continue;
		}

		engine_query = engine_query.replacen(&fragment, &field_clause(&def.field, internal), 1);

		applied_filters.push(clause.clone());
	}

	let populated = grammar.populated_fields();
	let single_term = |field: &str| populated == [field] && grammar.terms(field).len() == 1;
	let parsed = ParsedQuery {
		domain_query: domain_query.to_string(),
		engine_query,
		titles: grammar.terms(TITLE_FIELD).to_vec(),
		keywords: grammar.terms(KEYWORD_FIELD).to_vec(),
		is_single_title_search: single_term(TITLE_FIELD),
		is_single_keyword_search: single_term(KEYWORD_FIELD),
		invalid_filter,
		applied_filters,
	};

	Translation { parsed, warnings }
}

#[cfg(test)]
mod tests {
	use std::collections::{BTreeMap, HashMap};

	use folio_config::FilterDef;
	use folio_engine::FilterClause;

	use super::*;

	fn grammar(query: &str, fields: &[(&str, &[&str])], filters: &[(&str, &str)]) -> ParsedGrammar {
		ParsedGrammar {
			query: query.to_string(),
			fields: fields
				.iter()
				.map(|(field, terms)| {
					(field.to_string(), terms.iter().map(|term| term.to_string()).collect())
				})
				.collect::<BTreeMap<_, _>>(),
			filters: filters
				.iter()
				.map(|(id, value)| FilterClause { id: id.to_string(), value: value.to_string() })
				.collect(),
		}
	}

	fn config() -> Config {
		let mut cfg = folio_testkit::test_config();

		cfg.filters = vec![
			FilterDef {
				id: "FilterFormat".to_string(),
				field: "format_f".to_string(),
				values: HashMap::from([("Book".to_string(), "book".to_string())]),
			},
			FilterDef {
				id: "FilterYear".to_string(),
				field: "year_f".to_string(),
				values: HashMap::new(),
			},
		];

		cfg
	}

	#[test]
	fn rewrites_filter_fragments_to_engine_fields() {
		let translation = translate_grammar(
			&config(),
			"title: {bleak house} AND filter: {FilterFormat:\"Book\" FilterYear:\"1853\"}",
			grammar(
				"(title_t:(bleak house)) AND FilterFormat:\"Book\" AND FilterYear:\"1853\"",
				&[("title", &["bleak house"])],
				&[("FilterFormat", "Book"), ("FilterYear", "1853")],
			),
		);

		assert_eq!(
			translation.parsed.engine_query,
			"(title_t:(bleak house)) AND format_f:\"book\" AND year_f:\"1853\""
		);
		assert!(translation.warnings.is_empty());
		assert!(!translation.parsed.invalid_filter);
		assert!(translation.parsed.is_single_title_search);
		assert_eq!(translation.parsed.applied_filters.len(), 2);
	}

	#[test]
	fn unknown_filters_and_values_are_flagged_not_fatal() {
		let translation = translate_grammar(
			&config(),
			"q",
			grammar(
				"kw AND FilterColor:\"red\" AND FilterFormat:\"Scroll\"",
				&[("keyword", &["kw"])],
				&[("FilterColor", "red"), ("FilterFormat", "Scroll")],
			),
		);

		assert!(translation.parsed.invalid_filter);
		assert_eq!(translation.warnings.len(), 2);
		assert_eq!(translation.parsed.engine_query, "kw AND FilterColor:\"red\" AND FilterFormat:\"Scroll\"");
	}

	#[test]
	fn missing_fragment_drops_the_filter_without_touching_the_query() {
		let translation = translate_grammar(
			&config(),
			"q",
			grammar("kw", &[("keyword", &["kw"])], &[("FilterFormat", "Book")]),
		);

		assert_eq!(translation.parsed.engine_query, "kw");
		assert!(!translation.parsed.invalid_filter);
		assert!(translation.parsed.applied_filters.is_empty());
		assert_eq!(translation.warnings, vec!["Filter FilterFormat could not be applied and was dropped."]);
	}

	#[test]
	fn single_search_classification_requires_one_field_and_one_term() {
		let cfg = config();
		let keyword = translate_grammar(&cfg, "q", grammar("x", &[("keyword", &["dickens"])], &[]));
		let two_terms = translate_grammar(&cfg, "q", grammar("x", &[("title", &["a", "b"])], &[]));
		let two_fields = translate_grammar(
			&cfg,
			"q",
			grammar("x", &[("title", &["a"]), ("author", &["b"])], &[]),
		);
		let empty_sibling =
			translate_grammar(&cfg, "q", grammar("x", &[("title", &["a"]), ("author", &[])], &[]));

		assert!(keyword.parsed.is_single_keyword_search);
		assert!(!keyword.parsed.is_single_title_search);
		assert!(!two_terms.parsed.is_single_title_search);
		assert!(!two_fields.parsed.is_single_title_search);
		assert!(empty_sibling.parsed.is_single_title_search);
	}
}

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use folio_config::{Config, FacetDef, ParamBounds};
use folio_engine::{EngineRequest, FacetRequest, collapse_directive, field_clause};

use crate::{Error, Result, translate::ParsedQuery};

pub const SORT_ORDERS: [&str; 2] = ["asc", "desc"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
	pub start: Option<i64>,
	pub rows: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
	pub sort_id: String,
	pub order: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
	pub facet_id: String,
	pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
	#[serde(default)]
	pub facets: Vec<Selection>,
}

/// Facet values applied as filters, keyed by facet id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMap(BTreeMap<String, BTreeSet<String>>);
impl SelectionMap {
	pub fn insert(&mut self, facet_id: &str, value: &str) {
		self.0.entry(facet_id.to_string()).or_default().insert(value.to_string());
	}

	pub fn is_selected(&self, facet_id: &str, value: &str) -> bool {
		self.0.get(facet_id).map(|values| values.contains(value)).unwrap_or(false)
	}

	pub fn has_any(&self, facet_id: &str) -> bool {
		self.0.get(facet_id).map(|values| !values.is_empty()).unwrap_or(false)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

pub struct BuildArgs<'a> {
	pub parsed: &'a ParsedQuery,
	pub pagination: Pagination,
	pub sort: Option<&'a SortSpec>,
	pub filter_group: Option<&'a FilterGroup>,
	pub authenticated: bool,
	pub grouped: bool,
	pub facets: bool,
}

#[derive(Debug, Clone)]
pub struct BuiltRequest {
	pub request: EngineRequest,
	pub selections: SelectionMap,
	pub warnings: Vec<String>,
}

/// Clamps the pagination window, recording a warning for each value below its minimum.
pub fn resolve_window(cfg: &Config, pagination: Pagination, warnings: &mut Vec<String>) -> (i64, i64) {
	let start = clamp("start", pagination.start, cfg.engine.params.start, warnings);
	let rows = clamp("rows", pagination.rows, cfg.engine.params.rows, warnings);

	(start, rows)
}

pub fn build(cfg: &Config, args: BuildArgs<'_>) -> Result<BuiltRequest> {
	let mut warnings = Vec::new();
	let (start, rows) = resolve_window(cfg, args.pagination, &mut warnings);
	let sort = args.sort.and_then(|sort| resolve_sort(cfg, sort));
	let mut filters = vec![cfg.engine.scope_filter.clone()];

	if let Some(base) = cfg.engine.base_filter.as_ref() {
		filters.push(base.clone());
	}

	let mut selections = SelectionMap::default();

	if let Some(group) = args.filter_group {
		let mut resolved: Vec<(&FacetDef, &str)> = Vec::with_capacity(group.facets.len());

		for selection in &group.facets {
			let def = cfg.facet(&selection.facet_id).ok_or_else(|| Error::InvalidRequest {
				message: format!("Unknown facet id {}.", selection.facet_id),
			})?;

			selections.insert(&def.id, &selection.value);
			resolved.push((def, selection.value.as_str()));
		}

		for (def, value) in resolved {
			if !dependent_filter_allowed(def, &selections) {
				warnings.push(format!(
					"Filter on {} requires a selection in {} and was not applied.",
					def.id,
					def.dependent_facets.join(", ")
				));

				continue;
			}

			filters.push(field_clause(def.engine_field(args.authenticated), value));
		}
	}

	if args.grouped {
		filters.push(collapse_directive(&cfg.grouping.field));
	}

	let facets = args.facets.then(|| {
		cfg.facets
			.iter()
			.map(|def| {
				(
					def.id.clone(),
					FacetRequest::terms(def.engine_field(args.authenticated), &def.sort, def.limit),
				)
			})
			.collect::<BTreeMap<_, _>>()
	});
	let request = EngineRequest {
		query: args.parsed.engine_query.clone(),
		start,
		rows,
		sort,
		fields: field_list(cfg),
		filters,
		facets,
	};

	Ok(BuiltRequest { request, selections, warnings })
}

/// A dependent facet filters only once one of the facets it depends on has a selection.
pub fn dependent_filter_allowed(def: &FacetDef, selections: &SelectionMap) -> bool {
	def.dependent_facets.is_empty() || def.dependent_facets.iter().any(|id| selections.has_any(id))
}

fn clamp(label: &str, value: Option<i64>, bounds: ParamBounds, warnings: &mut Vec<String>) -> i64 {
	match value {
		None => bounds.default,
		Some(value) if value < bounds.min => {
			warnings.push(format!(
				"Requested {label} {value} is below the minimum {}; using {}.",
				bounds.min, bounds.default
			));

			bounds.default
		},
		Some(value) => value,
	}
}

fn resolve_sort(cfg: &Config, sort: &SortSpec) -> Option<String> {
	let def = cfg.sort(&sort.sort_id)?;

	SORT_ORDERS.contains(&sort.order.as_str()).then(|| format!("{} {}", def.field, sort.order))
}

pub(crate) fn field_list(cfg: &Config) -> Vec<String> {
	let mut fields: Vec<String> = Vec::new();
	let fixed = [
		Some(cfg.engine.id_field.as_str()),
		Some(cfg.engine.score_field.as_str()),
		Some(cfg.engine.exact_field.as_str()),
		Some(cfg.grouping.field.as_str()),
		cfg.grouping.cover_field.as_deref(),
	];

	for field in fixed.into_iter().flatten().chain(cfg.fields.iter().map(|field| field.source.as_str())) {
		if !fields.iter().any(|existing| existing == field) {
			fields.push(field.to_string());
		}
	}

	fields
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parsed() -> ParsedQuery {
		ParsedQuery {
			domain_query: "title: {bleak house}".to_string(),
			engine_query: "title_t:(bleak house)".to_string(),
			titles: vec!["bleak house".to_string()],
			keywords: Vec::new(),
			is_single_title_search: true,
			is_single_keyword_search: false,
			invalid_filter: false,
			applied_filters: Vec::new(),
		}
	}

	fn args<'a>(parsed: &'a ParsedQuery) -> BuildArgs<'a> {
		BuildArgs {
			parsed,
			pagination: Pagination::default(),
			sort: None,
			filter_group: None,
			authenticated: false,
			grouped: false,
			facets: false,
		}
	}

	fn group(selections: &[(&str, &str)]) -> FilterGroup {
		FilterGroup {
			facets: selections
				.iter()
				.map(|(facet_id, value)| Selection {
					facet_id: facet_id.to_string(),
					value: value.to_string(),
				})
				.collect(),
		}
	}

	#[test]
	fn clamps_values_below_minimum_to_defaults() {
		let mut cfg = folio_testkit::test_config();

		cfg.engine.params.start = ParamBounds { min: 0, default: 0 };
		cfg.engine.params.rows = ParamBounds { min: 0, default: 0 };

		let parsed = parsed();
		let built = build(
			&cfg,
			BuildArgs { pagination: Pagination { start: Some(-5), rows: Some(0) }, ..args(&parsed) },
		)
		.expect("build failed");

		assert_eq!(built.request.start, 0);
		assert_eq!(built.request.rows, 0);
		assert_eq!(built.warnings.len(), 1);
		assert!(built.warnings[0].contains("start -5"));
	}

	#[test]
	fn missing_pagination_uses_defaults_silently() {
		let cfg = folio_testkit::test_config();
		let parsed = parsed();
		let built = build(&cfg, args(&parsed)).expect("build failed");

		assert_eq!(built.request.start, cfg.engine.params.start.default);
		assert_eq!(built.request.rows, cfg.engine.params.rows.default);
		assert!(built.warnings.is_empty());
	}

	#[test]
	fn unrecognized_sorts_are_omitted() {
		let cfg = folio_testkit::test_config();
		let parsed = parsed();
		let known = SortSpec { sort_id: "SortTitle".to_string(), order: "desc".to_string() };
		let bad_order = SortSpec { sort_id: "SortTitle".to_string(), order: "sideways".to_string() };
		let bad_id = SortSpec { sort_id: "SortShoeSize".to_string(), order: "asc".to_string() };

		let sorted = build(&cfg, BuildArgs { sort: Some(&known), ..args(&parsed) }).expect("build");
		let no_order = build(&cfg, BuildArgs { sort: Some(&bad_order), ..args(&parsed) }).expect("build");
		let no_id = build(&cfg, BuildArgs { sort: Some(&bad_id), ..args(&parsed) }).expect("build");

		assert_eq!(sorted.request.sort.as_deref(), Some("title_sort_s desc"));
		assert!(no_order.request.sort.is_none());
		assert!(no_id.request.sort.is_none());
		assert!(no_order.warnings.is_empty());
	}

	#[test]
	fn scope_and_base_filters_lead_the_filter_list() {
		let cfg = folio_testkit::test_config();
		let parsed = parsed();
		let built = build(&cfg, BuildArgs { grouped: true, ..args(&parsed) }).expect("build");

		assert_eq!(built.request.filters[0], cfg.engine.scope_filter);
		assert_eq!(built.request.filters[1], "-shadowed_location_f:HIDDEN");
		assert_eq!(built.request.filters.last().map(String::as_str), Some("{!collapse field=work_key_s}"));
		assert!(built.request.facets.is_none());
		assert!(built.request.fields.contains(&"title_exact_s".to_string()));
	}

	#[test]
	fn selections_use_auth_field_for_authenticated_sessions() {
		let cfg = folio_testkit::test_config();
		let parsed = parsed();
		let filter_group = group(&[("FacetLibrary", "MAIN")]);
		let anon = build(&cfg, BuildArgs { filter_group: Some(&filter_group), ..args(&parsed) })
			.expect("build");
		let authed = build(
			&cfg,
			BuildArgs { filter_group: Some(&filter_group), authenticated: true, ..args(&parsed) },
		)
		.expect("build");

		assert!(anon.request.filters.contains(&"anon_library_f:\"MAIN\"".to_string()));
		assert!(authed.request.filters.contains(&"library_f:\"MAIN\"".to_string()));
		assert!(anon.selections.is_selected("FacetLibrary", "MAIN"));
	}

	#[test]
	fn dependent_facet_filters_wait_for_a_dependency_selection() {
		let cfg = folio_testkit::test_config();
		let parsed = parsed();
		let alone = group(&[("FacetSubject", "Fiction")]);
		let with_format = group(&[("FacetSubject", "Fiction"), ("FacetFormat", "book")]);
		let suppressed =
			build(&cfg, BuildArgs { filter_group: Some(&alone), ..args(&parsed) }).expect("build");
		let applied = build(&cfg, BuildArgs { filter_group: Some(&with_format), ..args(&parsed) })
			.expect("build");

		assert!(!suppressed.request.filters.iter().any(|filter| filter.starts_with("subject_f:")));
		assert_eq!(suppressed.warnings.len(), 1);
		assert!(applied.request.filters.contains(&"subject_f:\"Fiction\"".to_string()));
		assert!(applied.request.filters.contains(&"format_f:\"book\"".to_string()));
	}

	#[test]
	fn unknown_facet_ids_are_rejected() {
		let cfg = folio_testkit::test_config();
		let parsed = parsed();
		let filter_group = group(&[("FacetShoeSize", "11")]);
		let err = build(&cfg, BuildArgs { filter_group: Some(&filter_group), ..args(&parsed) })
			.expect_err("Expected unknown facet error.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
	}

	#[test]
	fn facet_directive_covers_every_definition() {
		let cfg = folio_testkit::test_config();
		let parsed = parsed();
		let built = build(&cfg, BuildArgs { facets: true, ..args(&parsed) }).expect("build");
		let facets = built.request.facets.expect("facets requested");

		assert_eq!(facets.len(), cfg.facets.len());
		assert_eq!(facets["FacetLibrary"].sort, "index asc");
		assert_eq!(facets["FacetSubject"].limit, 500);
	}
}

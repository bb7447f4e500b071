use folio_config::{Config, Visibility};
use folio_engine::EngineResponse;

use crate::{
	confidence::{Assessment, Confidence, ExactRule, assess},
	facets::{self, Facet},
	fields::{FieldTable, Record},
	grouping::Group,
	request::SelectionMap,
	translate::ParsedQuery,
};

/// Accounting derived from one primary response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMeta {
	/// Documents on this page; groups when the request was collapsed.
	pub rows_returned: usize,
	/// Matches across all pages; groups when the request was collapsed.
	pub total_rows: u64,
	/// Member documents the grouping second phase distributed into groups.
	pub members_fetched: Option<usize>,
	pub max_score: f32,
	pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Aggregate {
	pub confidence: Confidence,
	pub records: Vec<Record>,
	pub groups: Option<Vec<Group>>,
	pub facets: Option<Vec<Facet>>,
	pub meta: ResponseMeta,
}

pub struct AggregateArgs<'a> {
	pub parsed: &'a ParsedQuery,
	pub start: i64,
	pub selections: &'a SelectionMap,
	pub facets: bool,
	/// Facet cache population: keep dependent facets, there are no selections to honor.
	pub populating_cache: bool,
	pub rule: ExactRule,
}

/// Shapes records, assigns confidence and presents facets. Grouping is layered on afterwards.
pub fn aggregate(
	cfg: &Config,
	fields: &FieldTable,
	response: &EngineResponse,
	args: AggregateArgs<'_>,
	warnings: Vec<String>,
) -> Aggregate {
	let records: Vec<Record> = response
		.response
		.docs
		.iter()
		.map(|doc| fields.record(cfg, doc, Visibility::Basic))
		.collect();
	let meta = ResponseMeta {
		rows_returned: records.len(),
		total_rows: response.response.num_found,
		members_fetched: None,
		max_score: response.max_score(),
		warnings,
	};
	let confidence = assess(
		cfg,
		&Assessment {
			parsed: args.parsed,
			start: args.start,
			rows_returned: meta.rows_returned,
			max_score: meta.max_score,
			first_document: response.first_document(),
		},
		args.rule,
	);
	let facets = args.facets.then(|| {
		if args.populating_cache {
			facets::catalogue(cfg, response.facet_buckets())
		} else {
			facets::present(cfg, response.facet_buckets(), args.selections)
		}
	});

	Aggregate { confidence, records, groups: None, facets, meta }
}

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use folio_config::Visibility;
use folio_engine::{EngineRequest, field_clause};

use crate::{
	Error, FolioService, Result,
	aggregate::{self, Aggregate, AggregateArgs},
	confidence::{Confidence, ExactRule},
	facets::Facet,
	fields::Record,
	grouping::{self, Group, GroupKeys},
	request::{self, BuildArgs, FilterGroup, Pagination, SortSpec},
	speculate::{self, Plan, ProbeContext},
	translate::{self, ParsedQuery, Translation},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
	pub query: String,
	pub pagination: Pagination,
	pub sort: Option<SortSpec>,
	/// At most one group is accepted.
	pub filters: Vec<FilterGroup>,
	/// Try title and author readings of a single keyword before settling confidence.
	pub intuit: bool,
	pub grouped: bool,
	pub facets: bool,
	/// Set by the transport layer from the caller's credentials, never from the body.
	#[serde(skip)]
	pub authenticated: bool,
}
impl SearchRequest {
	fn filter_group(&self) -> Result<Option<&FilterGroup>> {
		match self.filters.as_slice() {
			[] => Ok(None),
			[group] => Ok(Some(group)),
			groups => Err(Error::InvalidRequest {
				message: format!("At most one filter group is allowed; got {}.", groups.len()),
			}),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
	pub start: i64,
	pub rows: i64,
	/// Rows on this page; groups when grouped.
	pub returned: usize,
	/// Matches across all pages; groups when grouped.
	pub total: u64,
	/// Member records distributed into the page's groups.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub members: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub request_id: Uuid,
	pub confidence: Confidence,
	/// The domain query that actually ran, after any intuition rewrite.
	pub query: String,
	pub pagination: PageInfo,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub records: Option<Vec<Record>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub groups: Option<Vec<Group>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub facets: Option<Vec<Facet>>,
	pub warnings: Vec<String>,
	pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetsResponse {
	pub request_id: Uuid,
	pub total: u64,
	pub facets: Vec<Facet>,
	pub warnings: Vec<String>,
	pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResponse {
	pub record: Record,
}

pub(crate) struct PrimaryArgs<'a> {
	pub(crate) request_id: Uuid,
	pub(crate) parsed: &'a ParsedQuery,
	pub(crate) pagination: Pagination,
	pub(crate) sort: Option<&'a SortSpec>,
	pub(crate) filter_group: Option<&'a FilterGroup>,
	pub(crate) authenticated: bool,
	pub(crate) grouped: bool,
	pub(crate) facets: bool,
	/// First page, zero rows: only the total and facets are wanted.
	pub(crate) count_only: bool,
	/// Facet cache population: never grouped, dependent facets kept.
	pub(crate) populating_cache: bool,
}

impl FolioService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let request_id = Uuid::new_v4();
		let filter_group = req.filter_group()?;
		let Translation { mut parsed, mut warnings } = self.translate(&req.query).await?;

		if parsed.invalid_filter {
			tracing::info!(
				request_id = %request_id,
				query = %req.query,
				"Query carries filters this pool cannot apply. Returning an empty result."
			);

			return Ok(self.empty_response(request_id, &req, parsed, warnings, started));
		}

		let (start, rows) = request::resolve_window(&self.cfg, req.pagination, &mut Vec::new());
		let ctx = ProbeContext::new(request_id, filter_group, req.authenticated);
		let adopted = match speculate::plan(&parsed, start, req.intuit) {
			Plan::Direct => None,
			Plan::ConfidenceProbe => self.confidence_probe(&ctx, &parsed).await,
			Plan::Intuition { term } => match self.intuit(&ctx, &parsed, &term).await {
				Some(winner) => {
					parsed = winner.parsed;

					Some(winner.confidence)
				},
				None => None,
			},
		};
		let aggregate = self
			.run_primary(PrimaryArgs {
				request_id,
				parsed: &parsed,
				pagination: req.pagination,
				sort: req.sort.as_ref(),
				filter_group,
				authenticated: req.authenticated,
				grouped: req.grouped,
				facets: req.facets,
				count_only: false,
				populating_cache: false,
			})
			.await?;
		let Aggregate { confidence, records, groups, facets, meta } = aggregate;
		let confidence = if meta.total_rows == 0 {
			Confidence::Low
		} else {
			adopted.unwrap_or(confidence)
		};

		warnings.extend(meta.warnings);

		let response = SearchResponse {
			request_id,
			confidence,
			query: parsed.domain_query,
			pagination: PageInfo {
				start,
				rows,
				returned: meta.rows_returned,
				total: meta.total_rows,
				members: meta.members_fetched,
			},
			records: if groups.is_some() { None } else { Some(records) },
			groups,
			facets,
			warnings,
			elapsed_ms: elapsed_ms(started),
		};

		tracing::info!(
			request_id = %request_id,
			confidence = confidence.as_str(),
			returned = response.pagination.returned,
			total = response.pagination.total,
			elapsed_ms = response.elapsed_ms,
			"Search completed."
		);

		Ok(response)
	}

	/// Facets for a query and its selections: zero rows, ungrouped, no speculation.
	pub async fn facets(&self, req: SearchRequest) -> Result<FacetsResponse> {
		let started = Instant::now();
		let request_id = Uuid::new_v4();
		let filter_group = req.filter_group()?;
		let Translation { parsed, mut warnings } = self.translate(&req.query).await?;

		if parsed.invalid_filter {
			return Ok(FacetsResponse {
				request_id,
				total: 0,
				facets: Vec::new(),
				warnings,
				elapsed_ms: elapsed_ms(started),
			});
		}

		let aggregate = self
			.run_primary(PrimaryArgs {
				request_id,
				parsed: &parsed,
				pagination: Pagination::default(),
				sort: None,
				filter_group,
				authenticated: req.authenticated,
				grouped: false,
				facets: true,
				count_only: true,
				populating_cache: false,
			})
			.await?;

		warnings.extend(aggregate.meta.warnings);

		Ok(FacetsResponse {
			request_id,
			total: aggregate.meta.total_rows,
			facets: aggregate.facets.unwrap_or_default(),
			warnings,
			elapsed_ms: elapsed_ms(started),
		})
	}

	/// Single-record lookup with detailed fields.
	pub async fn record(&self, id: &str) -> Result<RecordResponse> {
		let id = id.trim();

		if id.is_empty() {
			return Err(Error::InvalidRequest { message: "Record id must be non-empty.".to_string() });
		}

		let mut filters = vec![self.cfg.engine.scope_filter.clone()];

		filters.extend(self.cfg.engine.base_filter.iter().cloned());

		let request = EngineRequest {
			query: field_clause(&self.cfg.engine.id_field, id),
			start: 0,
			rows: 2,
			fields: request::field_list(&self.cfg),
			filters,
			..Default::default()
		};
		let response = self.engine.select(&request).await?;

		match response.response.docs.as_slice() {
			[] => Err(Error::NotFound { message: format!("No record with id {id}.") }),
			[doc] => Ok(RecordResponse {
				record: self.fields.record(&self.cfg, doc, Visibility::Detailed),
			}),
			docs => Err(Error::MultipleRecords {
				message: format!("{} records share id {id}.", docs.len()),
			}),
		}
	}

	pub async fn ping(&self) -> Result<()> {
		Ok(self.engine.ping().await?)
	}

	async fn translate(&self, query: &str) -> Result<Translation> {
		if query.trim().is_empty() || query.trim() == translate::MATCH_ALL {
			return Ok(Translation { parsed: ParsedQuery::match_all(), warnings: Vec::new() });
		}

		translate::translate(&self.cfg, self.parser.as_ref(), query).await
	}

	pub(crate) async fn run_primary(&self, args: PrimaryArgs<'_>) -> Result<Aggregate> {
		let grouped = args.grouped && !args.populating_cache;
		let mut built = request::build(
			&self.cfg,
			BuildArgs {
				parsed: args.parsed,
				pagination: args.pagination,
				sort: args.sort,
				filter_group: args.filter_group,
				authenticated: args.authenticated,
				grouped,
				facets: args.facets,
			},
		)?;

		if args.count_only {
			built.request.start = 0;
			built.request.rows = 0;
		}

		let response = self.engine.select(&built.request).await?;

		tracing::debug!(
			request_id = %args.request_id,
			query = %built.request.query,
			num_found = response.response.num_found,
			qtime = response.header.qtime,
			"Primary query completed."
		);

		let mut aggregate = aggregate::aggregate(
			&self.cfg,
			&self.fields,
			&response,
			AggregateArgs {
				parsed: args.parsed,
				start: built.request.start,
				selections: &built.selections,
				facets: args.facets,
				populating_cache: args.populating_cache,
				rule: ExactRule::DocumentAndRequest,
			},
			built.warnings,
		);

		if grouped && response.response.num_found > 0 {
			let keys = GroupKeys::collect(&aggregate.records);

			if !keys.is_empty() {
				let members_request = grouping::members_request(&self.cfg, &built.request, &keys);
				let members = self.engine.select(&members_request).await?;
				let records: Vec<Record> = members
					.response
					.docs
					.iter()
					.map(|doc| self.fields.record(&self.cfg, doc, Visibility::Basic))
					.collect();

				tracing::debug!(
					request_id = %args.request_id,
					groups = keys.len(),
					members = records.len(),
					"Group members fetched."
				);

				let fetched = records.len();
				let groups = grouping::assemble(&self.cfg, &keys, records);
				let distributed: usize = groups.iter().map(|group| group.count).sum();

				if distributed < fetched {
					tracing::warn!(
						request_id = %args.request_id,
						dropped = fetched - distributed,
						"Group members without a collected key were dropped."
					);
				}

				aggregate.meta.members_fetched = Some(distributed);
				aggregate.groups = Some(groups);
				aggregate.records = Vec::new();
			}
		}

		Ok(aggregate)
	}

	fn empty_response(
		&self,
		request_id: Uuid,
		req: &SearchRequest,
		parsed: ParsedQuery,
		mut warnings: Vec<String>,
		started: Instant,
	) -> SearchResponse {
		let (start, rows) = request::resolve_window(&self.cfg, req.pagination, &mut warnings);

		SearchResponse {
			request_id,
			confidence: Confidence::Low,
			query: parsed.domain_query,
			pagination: PageInfo { start, rows, returned: 0, total: 0, members: None },
			records: (!req.grouped).then(Vec::new),
			groups: req.grouped.then(Vec::new),
			facets: req.facets.then(Vec::new),
			warnings,
			elapsed_ms: elapsed_ms(started),
		}
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

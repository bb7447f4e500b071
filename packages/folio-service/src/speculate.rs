use regex::Regex;
use uuid::Uuid;

use folio_engine::{FilterClause, quote};

use crate::{
	FolioService,
	confidence::{Assessment, Confidence, ExactRule, assess},
	request::{self, BuildArgs, FilterGroup, Pagination},
	translate::{self, ParsedQuery},
};

/// Grammar fields a single keyword is reinterpreted as, after the keyword query itself.
pub const INTUITION_FIELDS: [&str; 2] = ["title", "author"];

/// What, if anything, must run before the primary query to settle confidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
	Direct,
	/// A later page of a single-title search; confidence comes from a first-page probe.
	ConfidenceProbe,
	/// A single keyword with intuition enabled; the term is already unescaped.
	Intuition { term: String },
}

pub fn plan(parsed: &ParsedQuery, start: i64, intuit: bool) -> Plan {
	if parsed.is_single_title_search {
		return if start != 0 { Plan::ConfidenceProbe } else { Plan::Direct };
	}
	if parsed.is_single_keyword_search
		&& intuit
		&& let Some(term) = parsed.keywords.first()
	{
		return Plan::Intuition { term: unescape(term) };
	}

	Plan::Direct
}

/// Removes grammar escapes: `\x` becomes `x`.
pub fn unescape(term: &str) -> String {
	Regex::new(r"\\(.)")
		.map(|re| re.replace_all(term, "$1").into_owned())
		.unwrap_or_else(|_| term.to_string())
}

/// Domain query reading `term` as `field`, restricted by the same embedded filters as the
/// query it was derived from.
pub fn reinterpretation(field: &str, term: &str, filters: &[FilterClause]) -> String {
	let mut query = format!("{field}: {{{term}}}");

	if !filters.is_empty() {
		let clauses: Vec<String> =
			filters.iter().map(|clause| format!("{}:{}", clause.id, quote(&clause.value))).collect();

		query.push_str(&format!(" AND filter: {{{}}}", clauses.join(" ")));
	}

	query
}

/// The parts of a caller's request a probe may read. Owned, so a probe can never touch the
/// caller's request; the window is always one row on the first page, ungrouped, without facets.
#[derive(Debug, Clone)]
pub struct ProbeContext {
	pub request_id: Uuid,
	pub filter_group: Option<FilterGroup>,
	pub authenticated: bool,
}
impl ProbeContext {
	pub fn new(request_id: Uuid, filter_group: Option<&FilterGroup>, authenticated: bool) -> Self {
		Self { request_id, filter_group: filter_group.cloned(), authenticated }
	}

	fn build_args<'a>(&'a self, parsed: &'a ParsedQuery) -> BuildArgs<'a> {
		BuildArgs {
			parsed,
			pagination: Pagination { start: Some(0), rows: Some(1) },
			sort: None,
			filter_group: self.filter_group.as_ref(),
			authenticated: self.authenticated,
			grouped: false,
			facets: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
	pub parsed: ParsedQuery,
	pub confidence: Confidence,
	pub score: f32,
}

/// Highest confidence wins, then highest score; a full tie keeps the earlier probe.
pub fn pick_winner(outcomes: impl IntoIterator<Item = ProbeOutcome>) -> Option<ProbeOutcome> {
	let mut best: Option<ProbeOutcome> = None;

	for outcome in outcomes {
		let better = match best.as_ref() {
			None => true,
			Some(current) =>
				outcome.confidence > current.confidence
					|| (outcome.confidence == current.confidence && outcome.score > current.score),
		};

		if better {
			best = Some(outcome);
		}
	}

	best
}

impl FolioService {
	/// First-page, one-row run of the same query; its confidence is authoritative for the page.
	pub(crate) async fn confidence_probe(
		&self,
		ctx: &ProbeContext,
		parsed: &ParsedQuery,
	) -> Option<Confidence> {
		self.run_probe(ctx, parsed.clone(), ExactRule::DocumentAndRequest)
			.await
			.map(|outcome| outcome.confidence)
	}

	/// Runs the keyword query and its title and author reinterpretations concurrently.
	pub(crate) async fn intuit(
		&self,
		ctx: &ProbeContext,
		parsed: &ParsedQuery,
		term: &str,
	) -> Option<ProbeOutcome> {
		let keyword = self.run_probe(ctx, parsed.clone(), ExactRule::DocumentOnly);
		let title = self.reinterpreted_probe(ctx, parsed, INTUITION_FIELDS[0], term);
		let author = self.reinterpreted_probe(ctx, parsed, INTUITION_FIELDS[1], term);
		let (keyword, title, author) = tokio::join!(keyword, title, author);
		let winner = pick_winner([keyword, title, author].into_iter().flatten());

		if let Some(winner) = winner.as_ref() {
			tracing::info!(
				request_id = %ctx.request_id,
				query = %winner.parsed.domain_query,
				confidence = winner.confidence.as_str(),
				score = winner.score,
				"Intuition probe selected."
			);
		}

		winner
	}

	async fn reinterpreted_probe(
		&self,
		ctx: &ProbeContext,
		original: &ParsedQuery,
		field: &str,
		term: &str,
	) -> Option<ProbeOutcome> {
		let query = reinterpretation(field, term, &original.applied_filters);
		let translation = match translate::translate(&self.cfg, self.parser.as_ref(), &query).await {
			Ok(translation) => translation,
			Err(err) => {
				tracing::warn!(
					request_id = %ctx.request_id,
					error = %err,
					query = %query,
					"Probe query translation failed."
				);

				return None;
			},
		};

		// A reading must keep every filter the caller applied.
		if translation.parsed.applied_filters != original.applied_filters {
			tracing::warn!(
				request_id = %ctx.request_id,
				query = %query,
				"Probe query did not keep the original filters. Skipping it."
			);

			return None;
		}

		self.run_probe(ctx, translation.parsed, ExactRule::DocumentOnly).await
	}

	async fn run_probe(
		&self,
		ctx: &ProbeContext,
		parsed: ParsedQuery,
		rule: ExactRule,
	) -> Option<ProbeOutcome> {
		if parsed.invalid_filter {
			return None;
		}

		let mut built = match request::build(&self.cfg, ctx.build_args(&parsed)) {
			Ok(built) => built,
			Err(err) => {
				tracing::warn!(request_id = %ctx.request_id, error = %err, "Probe request rejected.");

				return None;
			},
		};

		built.request.start = 0;
		built.request.rows = 1;

		let response = match self.engine.select(&built.request).await {
			Ok(response) => response,
			Err(err) => {
				tracing::warn!(
					request_id = %ctx.request_id,
					error = %err,
					kind = err.kind(),
					query = %parsed.engine_query,
					"Probe query failed."
				);

				return None;
			},
		};
		let score = response.max_score();
		let confidence = assess(
			&self.cfg,
			&Assessment {
				parsed: &parsed,
				start: 0,
				rows_returned: response.response.docs.len(),
				max_score: score,
				first_document: response.first_document(),
			},
			rule,
		);

		tracing::debug!(
			request_id = %ctx.request_id,
			query = %parsed.engine_query,
			confidence = confidence.as_str(),
			score,
			"Probe completed."
		);

		Some(ProbeOutcome { parsed, confidence, score })
	}
}

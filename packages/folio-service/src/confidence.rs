use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use folio_config::Config;
use folio_engine::Document;

use crate::translate::ParsedQuery;

/// Ordinal estimate of how well a result set matches the caller's intent.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
	#[default]
	Low,
	Medium,
	High,
	Exact,
}
impl Confidence {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
			Self::Exact => "exact",
		}
	}
}

/// Which checks an `exact` verdict must pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExactRule {
	/// The top document's exact-match field equals the queried title.
	DocumentOnly,
	/// As `DocumentOnly`, and the queried title has more than one word.
	DocumentAndRequest,
}

pub struct Assessment<'a> {
	pub parsed: &'a ParsedQuery,
	pub start: i64,
	pub rows_returned: usize,
	pub max_score: f32,
	pub first_document: Option<&'a Document>,
}

pub fn assess(cfg: &Config, input: &Assessment<'_>, rule: ExactRule) -> Confidence {
	if input.rows_returned == 0 {
		return Confidence::Low;
	}
	if document_is_exact(cfg, input) && (rule == ExactRule::DocumentOnly || request_is_exact(input)) {
		return Confidence::Exact;
	}

	let thresholds = cfg.confidence;

	if input.max_score > thresholds.high_threshold {
		Confidence::High
	} else if input.max_score > thresholds.medium_threshold {
		Confidence::Medium
	} else {
		Confidence::Low
	}
}

fn document_is_exact(cfg: &Config, input: &Assessment<'_>) -> bool {
	if !input.parsed.is_single_title_search || input.start != 0 {
		return false;
	}

	let (Some(title), Some(document)) = (input.parsed.titles.first(), input.first_document) else {
		return false;
	};
	let title = fold(title);

	document.strings(&cfg.engine.exact_field).iter().any(|value| fold(value) == title)
}

fn request_is_exact(input: &Assessment<'_>) -> bool {
	input.parsed.titles.first().map(|title| title.unicode_words().count() > 1).unwrap_or(false)
}

fn fold(value: &str) -> String {
	value.trim().trim_matches('"').trim().nfkc().collect::<String>().to_lowercase()
}

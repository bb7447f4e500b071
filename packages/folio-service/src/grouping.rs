use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use folio_config::Config;
use folio_engine::{COLLAPSE_PREFIX, EngineRequest, quote};

use crate::fields::Record;

/// Records sharing one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
	pub value: String,
	pub count: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub author: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub format: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cover_image: Option<String>,
	pub records: Vec<Record>,
}

/// Grouping keys of the collapsed representatives, in engine order.
#[derive(Debug, Clone, Default)]
pub struct GroupKeys {
	keys: Vec<String>,
	positions: HashMap<String, usize>,
}
impl GroupKeys {
	pub fn collect(representatives: &[Record]) -> Self {
		let mut out = Self::default();

		for key in representatives.iter().filter_map(|record| record.group_key.as_deref()) {
			if out.positions.contains_key(key) {
				continue;
			}

			out.positions.insert(key.to_string(), out.keys.len());
			out.keys.push(key.to_string());
		}

		out
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn position(&self, key: &str) -> Option<usize> {
		self.positions.get(key).copied()
	}

	/// `field:("k1" OR "k2" ...)`
	pub fn members_query(&self, field: &str) -> String {
		let keys: Vec<String> = self.keys.iter().map(|key| quote(key)).collect();

		format!("{field}:({})", keys.join(" OR "))
	}
}

/// Second-phase request: every member of the collected groups in one ungrouped batch.
pub fn members_request(cfg: &Config, primary: &EngineRequest, keys: &GroupKeys) -> EngineRequest {
	let mut request = primary.clone();

	request.query = keys.members_query(&cfg.grouping.field);
	request.start = 0;
	request.rows = i64::from(cfg.grouping.max_members);
	request.filters.retain(|filter| !filter.starts_with(COLLAPSE_PREFIX));
	request.facets = None;

	request
}

/// Distributes member records into their groups. Members whose key was not collected are
/// ignored, as are groups that end up with no members.
pub fn assemble(cfg: &Config, keys: &GroupKeys, members: Vec<Record>) -> Vec<Group> {
	let mut groups: Vec<Group> =
		keys.keys.iter().map(|key| empty_group(key, &cfg.grouping.key_separator)).collect();

	for record in members {
		let Some(position) = record.group_key.as_deref().and_then(|key| keys.position(key)) else {
			tracing::debug!(record_id = %record.id, "Member record without a collected group key.");

			continue;
		};
		let group = &mut groups[position];

		if group.cover_image.is_none() {
			group.cover_image = record.cover_image.clone();
		}

		group.records.push(record);
	}

	groups.retain(|group| !group.records.is_empty());

	for group in &mut groups {
		group.count = group.records.len();
	}

	groups
}

/// Splits a `title/author/format` key; the title may itself contain the separator.
pub fn describe(key: &str, separator: &str) -> (Option<String>, Option<String>, Option<String>) {
	let mut parts: Vec<&str> = key.rsplitn(3, separator).collect();

	parts.reverse();

	let part = |index: usize| {
		parts.get(index).map(|value| value.trim()).filter(|value| !value.is_empty()).map(str::to_string)
	};

	(part(0), part(1), part(2))
}

fn empty_group(key: &str, separator: &str) -> Group {
	let (title, author, format) = describe(key, separator);

	Group {
		value: key.to_string(),
		count: 0,
		title,
		author,
		format,
		cover_image: None,
		records: Vec::new(),
	}
}

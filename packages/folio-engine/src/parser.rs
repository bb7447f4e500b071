use std::{collections::BTreeMap, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{BoxFuture, Error, QueryParser, Result, http};

/// Output of the grammar parser for one domain query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedGrammar {
	/// Canonical engine query string.
	#[serde(default)]
	pub query: String,
	/// Terms per grammar field (`title`, `author`, `keyword`, ...).
	#[serde(default)]
	pub fields: BTreeMap<String, Vec<String>>,
	/// Filter clauses embedded in the domain query, in query order.
	#[serde(default)]
	pub filters: Vec<FilterClause>,
}
impl ParsedGrammar {
	pub fn terms(&self, field: &str) -> &[String] {
		self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Grammar fields that carry at least one term.
	pub fn populated_fields(&self) -> Vec<&str> {
		self.fields
			.iter()
			.filter(|(_, terms)| !terms.is_empty())
			.map(|(field, _)| field.as_str())
			.collect()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
	pub id: String,
	pub value: String,
}

#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
	query: &'a str,
	timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
	#[serde(flatten)]
	parsed: ParsedGrammar,
	error: Option<String>,
}

/// Grammar parser reached over HTTP.
pub struct HttpParser {
	client: Client,
	url: String,
}
impl HttpParser {
	pub fn new(cfg: &folio_config::Parser) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, url: format!("{}/parse", cfg.url) })
	}

	async fn parse_inner(&self, query: &str, timeout: Duration) -> Result<ParsedGrammar> {
		let body = ParseRequest { query, timeout_ms: timeout.as_millis() as u64 };
		let request = self.client.post(&self.url).timeout(timeout).json(&body);
		let response: ParseResponse =
			match tokio::time::timeout(timeout, http::send_json(request, "POST", &self.url)).await {
				Ok(result) => result?,
				Err(_) => {
					tracing::warn!(
						method = "POST",
						url = %self.url,
						classification = "timeout",
						elapsed_ms = timeout.as_millis() as u64,
						"Parser request timed out."
					);

					return Err(Error::Timeout { url: self.url.clone() });
				},
			};

		if let Some(message) = response.error.filter(|message| !message.trim().is_empty()) {
			return Err(Error::Rejected { message });
		}

		Ok(response.parsed)
	}
}
impl QueryParser for HttpParser {
	fn parse<'a>(&'a self, query: &'a str, timeout: Duration) -> BoxFuture<'a, Result<ParsedGrammar>> {
		Box::pin(self.parse_inner(query, timeout))
	}
}

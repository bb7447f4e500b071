use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub security: Security,
	pub engine: Engine,
	pub parser: Parser,
	pub confidence: Confidence,
	pub grouping: Grouping,
	#[serde(default)]
	pub facet_cache: FacetCache,
	#[serde(default)]
	pub sorts: Vec<SortDef>,
	#[serde(default)]
	pub filters: Vec<FilterDef>,
	#[serde(default)]
	pub facets: Vec<FacetDef>,
	#[serde(default)]
	pub fields: Vec<FieldDef>,
	/// Localisation table: message id to display string.
	#[serde(default)]
	pub labels: HashMap<String, String>,
	#[serde(default)]
	pub links: Links,
}
impl Config {
	pub fn facet(&self, id: &str) -> Option<&FacetDef> {
		self.facets.iter().find(|facet| facet.id == id)
	}

	pub fn filter(&self, id: &str) -> Option<&FilterDef> {
		self.filters.iter().find(|filter| filter.id == id)
	}

	pub fn sort(&self, id: &str) -> Option<&SortDef> {
		self.sorts.iter().find(|sort| sort.id == id)
	}

	/// Falls back to the message id itself when no translation is configured.
	pub fn localize(&self, message_id: &str) -> String {
		self.labels.get(message_id).cloned().unwrap_or_else(|| message_id.to_string())
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Security {
	#[serde(default)]
	pub bind_localhost_only: bool,
	/// Bearer tokens that mark a session as authenticated.
	#[serde(default)]
	pub auth_tokens: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Engine {
	pub url: String,
	pub core: String,
	#[serde(default = "default_select_path")]
	pub select_path: String,
	#[serde(default = "default_ping_path")]
	pub ping_path: String,
	pub connect_timeout_ms: u64,
	pub read_timeout_ms: u64,
	/// Fixed filter that confines every query to this pool's documents.
	pub scope_filter: String,
	pub base_filter: Option<String>,
	#[serde(default = "default_id_field")]
	pub id_field: String,
	#[serde(default = "default_score_field")]
	pub score_field: String,
	/// Field compared case-insensitively against a queried title.
	pub exact_field: String,
	pub params: EngineParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineParams {
	pub start: ParamBounds,
	pub rows: ParamBounds,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ParamBounds {
	pub min: i64,
	pub default: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parser {
	pub url: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Confidence {
	pub high_threshold: f32,
	pub medium_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Grouping {
	pub field: String,
	#[serde(default = "default_key_separator")]
	pub key_separator: String,
	#[serde(default = "default_max_members")]
	pub max_members: u32,
	pub cover_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FacetCache {
	pub startup_delay_ms: u64,
	pub refresh_interval_ms: u64,
}
impl Default for FacetCache {
	fn default() -> Self {
		Self { startup_delay_ms: 0, refresh_interval_ms: 300_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct SortDef {
	pub id: String,
	pub field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterDef {
	pub id: String,
	pub field: String,
	/// External value to internal engine value.
	#[serde(default)]
	pub values: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacetDef {
	pub id: String,
	/// Message id resolved through `[labels]`.
	pub label: String,
	pub field: String,
	/// Used instead of `field` when the session is authenticated.
	pub field_auth: Option<String>,
	#[serde(default = "default_facet_sort")]
	pub sort: String,
	#[serde(default = "default_facet_limit")]
	pub limit: i64,
	/// This facet only filters and displays once one of these has a selection.
	#[serde(default)]
	pub dependent_facets: Vec<String>,
	#[serde(default)]
	pub hidden: bool,
}
impl FacetDef {
	pub fn engine_field(&self, authenticated: bool) -> &str {
		match (authenticated, self.field_auth.as_deref()) {
			(true, Some(field)) => field,
			_ => self.field.as_str(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
	pub name: String,
	pub source: String,
	#[serde(default = "default_field_kind")]
	pub kind: String,
	#[serde(default)]
	pub visibility: Visibility,
	#[serde(default)]
	pub limit: usize,
	pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
	#[default]
	Basic,
	Detailed,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
	pub cover_image_url: Option<String>,
	pub catalog_url: Option<String>,
}

fn default_select_path() -> String {
	"/select".to_string()
}

fn default_ping_path() -> String {
	"/admin/ping".to_string()
}

fn default_id_field() -> String {
	"id".to_string()
}

fn default_score_field() -> String {
	"score".to_string()
}

fn default_key_separator() -> String {
	"/".to_string()
}

fn default_max_members() -> u32 {
	100_000
}

fn default_facet_sort() -> String {
	"count".to_string()
}

fn default_facet_limit() -> i64 {
	-1
}

fn default_field_kind() -> String {
	"plain".to_string()
}

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Confidence, Engine, EngineParams, FacetCache, FacetDef, FieldDef, FilterDef, Grouping,
	Links, ParamBounds, Parser, Security, Service, SortDef, Visibility,
};

use std::{collections::HashSet, fs, path::Path};

pub const FACET_SORTS: [&str; 2] = ["count", "index"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("engine.url", &cfg.engine.url),
		("engine.core", &cfg.engine.core),
		("engine.scope_filter", &cfg.engine.scope_filter),
		("engine.exact_field", &cfg.engine.exact_field),
		("engine.id_field", &cfg.engine.id_field),
		("parser.url", &cfg.parser.url),
		("grouping.field", &cfg.grouping.field),
		("grouping.key_separator", &cfg.grouping.key_separator),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	for (label, value) in [
		("engine.connect_timeout_ms", cfg.engine.connect_timeout_ms),
		("engine.read_timeout_ms", cfg.engine.read_timeout_ms),
		("parser.timeout_ms", cfg.parser.timeout_ms),
		("facet_cache.refresh_interval_ms", cfg.facet_cache.refresh_interval_ms),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	for (label, bounds) in
		[("engine.params.start", cfg.engine.params.start), ("engine.params.rows", cfg.engine.params.rows)]
	{
		if bounds.min < 0 {
			return Err(Error::Validation {
				message: format!("{label}.min must be zero or greater."),
			});
		}
		if bounds.default < bounds.min {
			return Err(Error::Validation {
				message: format!("{label}.default must be at least {label}.min."),
			});
		}
	}

	let confidence = cfg.confidence;

	if !confidence.high_threshold.is_finite() || !confidence.medium_threshold.is_finite() {
		return Err(Error::Validation {
			message: "confidence thresholds must be finite numbers.".to_string(),
		});
	}
	if confidence.high_threshold <= confidence.medium_threshold {
		return Err(Error::Validation {
			message: "confidence.high_threshold must be greater than confidence.medium_threshold."
				.to_string(),
		});
	}
	if cfg.grouping.max_members == 0 {
		return Err(Error::Validation {
			message: "grouping.max_members must be greater than zero.".to_string(),
		});
	}

	ensure_unique("sorts", cfg.sorts.iter().map(|sort| sort.id.as_str()))?;
	ensure_unique("filters", cfg.filters.iter().map(|filter| filter.id.as_str()))?;
	ensure_unique("facets", cfg.facets.iter().map(|facet| facet.id.as_str()))?;
	ensure_unique("fields", cfg.fields.iter().map(|field| field.name.as_str()))?;

	for sort in &cfg.sorts {
		if sort.field.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("sorts.{}.field must be non-empty.", sort.id),
			});
		}
	}
	for filter in &cfg.filters {
		if filter.field.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("filters.{}.field must be non-empty.", filter.id),
			});
		}
	}
	for facet in &cfg.facets {
		if facet.field.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("facets.{}.field must be non-empty.", facet.id),
			});
		}
		if !FACET_SORTS.contains(&facet.sort.as_str()) {
			return Err(Error::Validation {
				message: format!("facets.{}.sort must be one of count or index.", facet.id),
			});
		}
		if facet.limit == 0 || facet.limit < -1 {
			return Err(Error::Validation {
				message: format!("facets.{}.limit must be -1 or greater than zero.", facet.id),
			});
		}

		for dependent in &facet.dependent_facets {
			if dependent == &facet.id {
				return Err(Error::Validation {
					message: format!("facets.{}.dependent_facets must not name itself.", facet.id),
				});
			}
			if cfg.facet(dependent).is_none() {
				return Err(Error::Validation {
					message: format!(
						"facets.{}.dependent_facets names unknown facet {dependent}.",
						facet.id
					),
				});
			}
		}
	}
	for field in &cfg.fields {
		if field.source.trim().is_empty() || field.kind.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("fields.{} must have a non-empty source and kind.", field.name),
			});
		}
	}

	Ok(())
}

fn ensure_unique<'a>(label: &str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
	let mut seen = HashSet::new();

	for id in ids {
		if id.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} ids must be non-empty.") });
		}
		if !seen.insert(id) {
			return Err(Error::Validation {
				message: format!("{label} contains duplicate id {id}."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.engine.base_filter.as_deref().map(|filter| filter.trim().is_empty()).unwrap_or(false) {
		cfg.engine.base_filter = None;
	}
	if cfg.grouping.cover_field.as_deref().map(|field| field.trim().is_empty()).unwrap_or(false) {
		cfg.grouping.cover_field = None;
	}

	for facet in &mut cfg.facets {
		if facet.field_auth.as_deref().map(|field| field.trim().is_empty()).unwrap_or(false) {
			facet.field_auth = None;
		}
	}

	cfg.security.auth_tokens.retain(|token| !token.trim().is_empty());
	cfg.engine.url = cfg.engine.url.trim_end_matches('/').to_string();
	cfg.parser.url = cfg.parser.url.trim_end_matches('/').to_string();
}

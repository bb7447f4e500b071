use serde::{Deserialize, Serialize};

use folio_config::{Config, FacetDef};
use folio_engine::Bucket;

use crate::request::SelectionMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
	pub id: String,
	pub name: String,
	pub buckets: Vec<FacetBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
	pub value: String,
	pub count: u64,
	pub selected: bool,
}

/// Turns engine facet output into the client-facing facet list.
///
/// Unknown and hidden facets are dropped, dependent facets are suppressed until one of their
/// dependencies has a selection, buckets are ordered by value and facets by display name.
pub fn present(cfg: &Config, raw: Vec<(String, Vec<Bucket>)>, selections: &SelectionMap) -> Vec<Facet> {
	collect(cfg, raw, selections, true)
}

/// Every known, visible facet regardless of dependencies; the facet cache universe.
pub fn catalogue(cfg: &Config, raw: Vec<(String, Vec<Bucket>)>) -> Vec<Facet> {
	collect(cfg, raw, &SelectionMap::default(), false)
}

fn collect(
	cfg: &Config,
	raw: Vec<(String, Vec<Bucket>)>,
	selections: &SelectionMap,
	suppress_dependent: bool,
) -> Vec<Facet> {
	let mut facets = Vec::with_capacity(raw.len());

	for (id, buckets) in raw {
		let Some(def) = cfg.facet(&id) else {
			continue;
		};

		if def.hidden || buckets.is_empty() {
			continue;
		}
		if suppress_dependent && !dependent_facet_visible(def, selections) {
			continue;
		}

		let mut buckets: Vec<FacetBucket> = buckets
			.into_iter()
			.map(|bucket| FacetBucket {
				selected: selections.is_selected(&def.id, &bucket.value),
				value: bucket.value,
				count: bucket.count,
			})
			.collect();

		buckets.sort_by(|a, b| a.value.cmp(&b.value));
		facets.push(Facet { id: def.id.clone(), name: cfg.localize(&def.label), buckets });
	}

	facets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

	facets
}

/// Presentation-side dependency rule; checked independently of the filter-side rule.
pub fn dependent_facet_visible(def: &FacetDef, selections: &SelectionMap) -> bool {
	if def.dependent_facets.is_empty() {
		return true;
	}

	def.dependent_facets.iter().any(|id| selections.has_any(id))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn bucket(value: &str, count: u64) -> Bucket {
		Bucket { value: value.to_string(), count }
	}

	#[test]
	fn sorts_buckets_by_value_and_facets_by_name() {
		let cfg = folio_testkit::test_config();
		let raw = vec![
			("FacetLibrary".to_string(), vec![bucket("MUSIC", 9), bucket("ART", 3)]),
			("FacetFormat".to_string(), vec![bucket("video", 7), bucket("book", 2)]),
		];
		let facets = present(&cfg, raw, &SelectionMap::default());
		let names: Vec<&str> = facets.iter().map(|facet| facet.name.as_str()).collect();

		assert_eq!(names, vec!["Format", "Library"]);
		assert_eq!(facets[0].buckets[0].value, "book");
		assert_eq!(facets[1].buckets[0].value, "ART");
	}

	#[test]
	fn marks_selected_buckets() {
		let cfg = folio_testkit::test_config();
		let mut selections = SelectionMap::default();

		selections.insert("FacetFormat", "book");

		let raw = vec![("FacetFormat".to_string(), vec![bucket("book", 2), bucket("video", 1)])];
		let facets = present(&cfg, raw, &selections);

		assert!(facets[0].buckets[0].selected);
		assert!(!facets[0].buckets[1].selected);
	}

	#[test]
	fn suppresses_dependent_facets_without_a_dependency_selection() {
		let cfg = folio_testkit::test_config();
		let raw = || vec![("FacetSubject".to_string(), vec![bucket("Fiction", 4)])];
		let mut selections = SelectionMap::default();

		assert!(present(&cfg, raw(), &selections).is_empty());

		selections.insert("FacetLibrary", "MAIN");

		assert_eq!(present(&cfg, raw(), &selections).len(), 1);
	}

	#[test]
	fn catalogue_keeps_dependent_facets() {
		let cfg = folio_testkit::test_config();
		let raw = vec![("FacetSubject".to_string(), vec![bucket("Fiction", 4)])];
		let facets = catalogue(&cfg, raw);

		assert_eq!(facets.len(), 1);
		assert!(!facets[0].buckets[0].selected);
	}

	#[test]
	fn drops_unknown_and_hidden_facets() {
		let mut cfg = folio_testkit::test_config();

		cfg.facets[0].hidden = true;

		let raw = vec![
			("count".to_string(), vec![bucket("x", 1)]),
			("FacetFormat".to_string(), vec![bucket("book", 2)]),
		];

		assert!(present(&cfg, raw, &SelectionMap::default()).is_empty());
	}
}

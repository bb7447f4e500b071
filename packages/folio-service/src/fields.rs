use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use folio_config::{Config, FieldDef, Links, Visibility};
use folio_engine::Document;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	pub value: String,
	pub visibility: Visibility,
}

/// One engine document mapped to output fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
	pub id: String,
	pub fields: Vec<RecordField>,
	#[serde(skip)]
	pub group_key: Option<String>,
	#[serde(skip)]
	pub cover_image: Option<String>,
}
impl Record {
	pub fn field(&self, name: &str) -> Option<&str> {
		self.fields.iter().find(|field| field.name == name).map(|field| field.value.as_str())
	}
}

pub struct ShapeContext<'a> {
	pub id: &'a str,
	pub label: Option<String>,
	pub links: &'a Links,
}

/// Produces output fields for one configured field of one document.
pub trait FieldShaper
where
	Self: Send + Sync,
{
	fn shape(&self, doc: &Document, field: &FieldDef, ctx: &ShapeContext<'_>) -> Vec<RecordField>;
}

struct Plain;
impl FieldShaper for Plain {
	fn shape(&self, doc: &Document, field: &FieldDef, ctx: &ShapeContext<'_>) -> Vec<RecordField> {
		let mut values = doc.strings(&field.source);

		if field.limit > 0 {
			values.truncate(field.limit);
		}

		values.into_iter().map(|value| output(field, ctx, value)).collect()
	}
}

struct First;
impl FieldShaper for First {
	fn shape(&self, doc: &Document, field: &FieldDef, ctx: &ShapeContext<'_>) -> Vec<RecordField> {
		doc.first(&field.source).map(|value| output(field, ctx, value)).into_iter().collect()
	}
}

struct LinkTemplate {
	template: fn(&Links) -> Option<&str>,
}
impl FieldShaper for LinkTemplate {
	fn shape(&self, doc: &Document, field: &FieldDef, ctx: &ShapeContext<'_>) -> Vec<RecordField> {
		let Some(template) = (self.template)(ctx.links) else {
			return Vec::new();
		};
		let key = doc.first(&field.source).unwrap_or_else(|| ctx.id.to_string());

		if key.is_empty() {
			return Vec::new();
		}

		vec![output(field, ctx, template.replace("{id}", &key))]
	}
}

fn output(field: &FieldDef, ctx: &ShapeContext<'_>, value: String) -> RecordField {
	RecordField {
		name: field.name.clone(),
		label: ctx.label.clone(),
		value,
		visibility: field.visibility,
	}
}

/// Field kind name to shaper.
#[derive(Clone)]
pub struct ShaperRegistry {
	shapers: HashMap<String, Arc<dyn FieldShaper>>,
}
impl ShaperRegistry {
	pub fn builtin() -> Self {
		let mut registry = Self { shapers: HashMap::new() };

		registry.register("plain", Arc::new(Plain));
		registry.register("first", Arc::new(First));
		registry.register(
			"cover_image_url",
			Arc::new(LinkTemplate { template: |links| links.cover_image_url.as_deref() }),
		);
		registry.register(
			"catalog_url",
			Arc::new(LinkTemplate { template: |links| links.catalog_url.as_deref() }),
		);

		registry
	}

	pub fn register(&mut self, kind: &str, shaper: Arc<dyn FieldShaper>) {
		self.shapers.insert(kind.to_string(), shaper);
	}

	pub fn get(&self, kind: &str) -> Option<Arc<dyn FieldShaper>> {
		self.shapers.get(kind).cloned()
	}
}
impl Default for ShaperRegistry {
	fn default() -> Self {
		Self::builtin()
	}
}

/// Configured fields bound to their shapers, built once when the service starts.
#[derive(Clone)]
pub struct FieldTable {
	entries: Vec<(FieldDef, Arc<dyn FieldShaper>)>,
}
impl FieldTable {
	pub fn build(fields: &[FieldDef], registry: &ShaperRegistry) -> Result<Self> {
		let mut entries = Vec::with_capacity(fields.len());

		for field in fields {
			let shaper = registry.get(&field.kind).ok_or_else(|| Error::Configuration {
				message: format!("fields.{} uses unknown kind {}.", field.name, field.kind),
			})?;

			entries.push((field.clone(), shaper));
		}

		Ok(Self { entries })
	}

	/// Shapes a document, keeping fields up to the given visibility.
	pub fn record(&self, cfg: &Config, doc: &Document, visibility: Visibility) -> Record {
		let id = doc.first(&cfg.engine.id_field).unwrap_or_default();
		let mut fields = Vec::new();

		for (field, shaper) in &self.entries {
			if visibility == Visibility::Basic && field.visibility == Visibility::Detailed {
				continue;
			}

			let ctx = ShapeContext {
				id: &id,
				label: field.label.as_deref().map(|label| cfg.localize(label)),
				links: &cfg.links,
			};

			fields.extend(shaper.shape(doc, field, &ctx));
		}

		Record {
			group_key: doc.first(&cfg.grouping.field),
			cover_image: cfg.grouping.cover_field.as_deref().and_then(|field| doc.first(field)),
			id,
			fields,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn doc() -> Document {
		serde_json::from_value(serde_json::json!({
			"id": "u42",
			"title_a": ["Bleak House", "Bleak House: A Novel"],
			"author_a": ["Dickens, Charles", "Browne, Hablot", "Cruikshank, George", "Extra"],
			"subject_a": ["London"],
			"work_key_s": "bleak house/dickens, charles/book",
			"thumbnail_url_a": ["https://img.example.org/u42.jpg"]
		}))
		.expect("decode failed")
	}

	#[test]
	fn unknown_kinds_fail_table_construction() {
		let mut cfg = folio_testkit::test_config();

		cfg.fields[0].kind = "marc_magic".to_string();

		let err = FieldTable::build(&cfg.fields, &ShaperRegistry::builtin())
			.err()
			.expect("Expected unknown kind error.");

		assert!(err.to_string().contains("unknown kind marc_magic"), "Unexpected error: {err}");
	}

	#[test]
	fn basic_records_omit_detailed_fields() {
		let cfg = folio_testkit::test_config();
		let table = FieldTable::build(&cfg.fields, &ShaperRegistry::builtin()).expect("table");
		let basic = table.record(&cfg, &doc(), Visibility::Basic);
		let detailed = table.record(&cfg, &doc(), Visibility::Detailed);

		assert_eq!(basic.id, "u42");
		assert_eq!(basic.field("title"), Some("Bleak House"));
		assert_eq!(basic.fields.iter().filter(|field| field.name == "author").count(), 3);
		assert!(basic.field("subject").is_none());
		assert_eq!(detailed.field("subject"), Some("London"));
		assert_eq!(
			detailed.field("catalog_link"),
			Some("https://catalog.example.org/record/u42")
		);
		assert_eq!(basic.field("cover_image"), Some("https://covers.example.org/u42.jpg"));
		assert_eq!(basic.group_key.as_deref(), Some("bleak house/dickens, charles/book"));
		assert_eq!(basic.cover_image.as_deref(), Some("https://img.example.org/u42.jpg"));
	}

	#[test]
	fn labels_are_localized() {
		let cfg = folio_testkit::test_config();
		let table = FieldTable::build(&cfg.fields, &ShaperRegistry::builtin()).expect("table");
		let record = table.record(&cfg, &doc(), Visibility::Basic);
		let title = record.fields.iter().find(|field| field.name == "title").expect("title");

		assert_eq!(title.label.as_deref(), Some("Title"));
	}
}

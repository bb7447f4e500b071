pub mod aggregate;
pub mod confidence;
pub mod facet_cache;
pub mod facets;
pub mod fields;
pub mod grouping;
pub mod request;
pub mod search;
pub mod speculate;
pub mod translate;

mod error;

pub use confidence::Confidence;
pub use error::{Error, Result};
pub use facet_cache::{FacetCache, FacetSnapshot, run_facet_cache};
pub use facets::{Facet, FacetBucket};
pub use fields::{FieldShaper, FieldTable, Record, RecordField, ShaperRegistry};
pub use grouping::Group;
pub use request::{FilterGroup, Pagination, Selection, SortSpec};
pub use search::{FacetsResponse, PageInfo, RecordResponse, SearchRequest, SearchResponse};

use std::sync::Arc;

use folio_config::Config;
use folio_engine::{HttpEngine, HttpParser, QueryParser, SearchEngine};

pub struct FolioService {
	pub cfg: Config,
	pub engine: Arc<dyn SearchEngine>,
	pub parser: Arc<dyn QueryParser>,
	pub fields: FieldTable,
	pub facet_cache: FacetCache,
}
impl FolioService {
	pub fn new(
		cfg: Config,
		engine: Arc<dyn SearchEngine>,
		parser: Arc<dyn QueryParser>,
	) -> Result<Self> {
		Self::with_shapers(cfg, engine, parser, &ShaperRegistry::builtin())
	}

	/// Binds every configured field to its shaper; an unknown kind fails here, not per request.
	pub fn with_shapers(
		cfg: Config,
		engine: Arc<dyn SearchEngine>,
		parser: Arc<dyn QueryParser>,
		shapers: &ShaperRegistry,
	) -> Result<Self> {
		let fields = FieldTable::build(&cfg.fields, shapers)?;

		Ok(Self { cfg, engine, parser, fields, facet_cache: FacetCache::new() })
	}

	pub fn from_config(cfg: Config) -> Result<Self> {
		let engine = HttpEngine::new(&cfg.engine).map_err(configuration)?;
		let parser = HttpParser::new(&cfg.parser).map_err(configuration)?;

		Self::new(cfg, Arc::new(engine), Arc::new(parser))
	}
}

fn configuration(err: folio_engine::Error) -> Error {
	Error::Configuration { message: err.to_string() }
}

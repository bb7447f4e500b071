pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Query translation failed: {message}")]
	Translation { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Multiple records: {message}")]
	MultipleRecords { message: String },
	#[error("Facets are not yet cached.")]
	NotCached,
	#[error("Upstream error: {message}")]
	Upstream { message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
}
impl From<folio_engine::Error> for Error {
	fn from(err: folio_engine::Error) -> Self {
		Self::Upstream { message: err.to_string() }
	}
}

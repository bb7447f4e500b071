mod error;
mod http;
mod parser;
mod request;
mod response;

pub use error::{Error, Result};
pub use http::HttpEngine;
pub use parser::{FilterClause, HttpParser, ParsedGrammar};
pub use request::{
	COLLAPSE_PREFIX, EngineRequest, FacetRequest, collapse_directive, field_clause, quote,
};
pub use response::{Bucket, Document, EngineResponse, ResponseBody, ResponseHeader};

use std::{future::Future, pin::Pin, time::Duration};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SearchEngine
where
	Self: Send + Sync,
{
	fn select<'a>(&'a self, req: &'a EngineRequest) -> BoxFuture<'a, Result<EngineResponse>>;

	fn ping<'a>(&'a self) -> BoxFuture<'a, Result<()>>;
}

pub trait QueryParser
where
	Self: Send + Sync,
{
	fn parse<'a>(&'a self, query: &'a str, timeout: Duration) -> BoxFuture<'a, Result<ParsedGrammar>>;
}

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::{BoxFuture, EngineRequest, EngineResponse, Error, Result, SearchEngine};

/// Sends a request and decodes a JSON body, logging the outcome with its classification.
pub(crate) async fn send_json<T>(request: RequestBuilder, method: &str, url: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	let started = Instant::now();
	let result = async {
		let response = request.send().await.map_err(|err| Error::classify(err, url))?;
		let status = response.status();

		if !status.is_success() {
			return Err(Error::Status { url: url.to_string(), status: status.as_u16() });
		}

		response.json::<T>().await.map_err(|err| Error::Decode {
			url: url.to_string(),
			message: err.to_string(),
		})
	}
	.await;
	let elapsed_ms = started.elapsed().as_millis() as u64;

	match &result {
		Ok(_) => {
			tracing::debug!(method, url, elapsed_ms, "Upstream request completed.");
		},
		Err(err) => {
			let status = match err {
				Error::Status { status, .. } => Some(*status),
				_ => None,
			};

			tracing::error!(
				method,
				url,
				status,
				classification = err.kind(),
				elapsed_ms,
				error = %err,
				"Upstream request failed."
			);
		},
	}

	result
}

#[derive(Debug, serde::Deserialize)]
struct PingResponse {
	status: Option<String>,
}

/// Search engine reached over its HTTP JSON request API.
pub struct HttpEngine {
	client: Client,
	select_url: String,
	ping_url: String,
}
impl HttpEngine {
	pub fn new(cfg: &folio_config::Engine) -> Result<Self> {
		let client = Client::builder()
			.connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
			.timeout(Duration::from_millis(cfg.read_timeout_ms))
			.build()?;
		let base = format!("{}/{}", cfg.url, cfg.core);

		Ok(Self {
			client,
			select_url: format!("{base}{}", cfg.select_path),
			ping_url: format!("{base}{}", cfg.ping_path),
		})
	}

	async fn select_inner(&self, req: &EngineRequest) -> Result<EngineResponse> {
		let request = self.client.post(&self.select_url).json(req);
		let response: EngineResponse = send_json(request, "POST", &self.select_url).await?;

		if response.header.status != 0 {
			tracing::error!(
				url = %self.select_url,
				status = response.header.status,
				classification = "engine_status",
				"Engine reported a failed select."
			);

			return Err(Error::Engine {
				url: self.select_url.clone(),
				status: response.header.status,
			});
		}

		Ok(response)
	}

	async fn ping_inner(&self) -> Result<()> {
		let request = self.client.get(&self.ping_url);
		let response: PingResponse = send_json(request, "GET", &self.ping_url).await?;

		match response.status.as_deref() {
			Some(status) if status.eq_ignore_ascii_case("ok") => Ok(()),
			other => Err(Error::Decode {
				url: self.ping_url.clone(),
				message: format!("ping status was {}", other.unwrap_or("missing")),
			}),
		}
	}
}
impl SearchEngine for HttpEngine {
	fn select<'a>(&'a self, req: &'a EngineRequest) -> BoxFuture<'a, Result<EngineResponse>> {
		Box::pin(self.select_inner(req))
	}

	fn ping<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.ping_inner())
	}
}

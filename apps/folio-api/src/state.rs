use std::sync::Arc;

use folio_service::FolioService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<FolioService>,
}
impl AppState {
	pub fn new(config: folio_config::Config) -> color_eyre::Result<Self> {
		let service = FolioService::from_config(config)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: FolioService) -> Self {
		Self { service: Arc::new(service) }
	}

	/// A bearer token listed in `security.auth_tokens` marks the caller as authenticated.
	pub fn is_authenticated(&self, bearer: Option<&str>) -> bool {
		let Some(token) = bearer.map(str::trim).filter(|token| !token.is_empty()) else {
			return false;
		};

		self.service.cfg.security.auth_tokens.iter().any(|allowed| allowed == token)
	}
}

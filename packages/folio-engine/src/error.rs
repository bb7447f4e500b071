pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Request to {url} timed out.")]
	Timeout { url: String },
	#[error("Connection to {url} was refused.")]
	ConnectionRefused { url: String },
	#[error("Request to {url} returned unexpected status {status}.")]
	Status { url: String, status: u16 },
	#[error("Engine at {url} reported status {status}.")]
	Engine { url: String, status: i32 },
	#[error("Response from {url} could not be decoded: {message}")]
	Decode { url: String, message: String },
	#[error("Request to {url} failed: {message}")]
	Transport { url: String, message: String },
	#[error("Query was rejected by the parser: {message}")]
	Rejected { message: String },
	#[error(transparent)]
	Client(#[from] reqwest::Error),
}
impl Error {
	pub fn classify(err: reqwest::Error, url: &str) -> Self {
		let url = url.to_string();

		if err.is_timeout() {
			Self::Timeout { url }
		} else if err.is_connect() {
			Self::ConnectionRefused { url }
		} else if let Some(status) = err.status() {
			Self::Status { url, status: status.as_u16() }
		} else if err.is_decode() {
			Self::Decode { url, message: err.to_string() }
		} else {
			Self::Transport { url, message: err.to_string() }
		}
	}

	/// Short classification label used in log fields.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Timeout { .. } => "timeout",
			Self::ConnectionRefused { .. } => "connection_refused",
			Self::Status { .. } => "unexpected_status",
			Self::Engine { .. } => "engine_status",
			Self::Decode { .. } => "decode",
			Self::Transport { .. } => "transport",
			Self::Rejected { .. } => "rejected",
			Self::Client(_) => "client",
		}
	}
}

//! Client-level error types shared across the request pipeline, refresh coordinator, and
//! transports.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Server answered with a non-success status that was not recovered locally.
	#[error("Request to {url} failed with HTTP {status}.")]
	Status {
		/// HTTP status code returned by the server.
		status: u16,
		/// URL of the failing request.
		url: Url,
		/// Response body, when it decoded as UTF-8.
		body: Option<String>,
	},
	/// Request was rejected with 401 even after one refresh-and-replay cycle.
	#[error("Authentication expired for {url}; the request was already retried once.")]
	AuthExpired {
		/// URL of the request that was rejected.
		url: Url,
	},
	/// Refresh endpoint failed; every request queued on that refresh receives this error.
	#[error("Authentication expired: {reason}.")]
	RefreshFailed {
		/// Human-readable summary of the refresh failure.
		reason: String,
		/// HTTP status of the refresh call, when one was received.
		status: Option<u16>,
	},
	/// In-flight refresh was dropped before it settled.
	#[error("The in-flight token refresh was abandoned before it settled.")]
	RefreshAbandoned,
	/// Session was signed out or replaced while the request waited on a refresh.
	#[error("The session ended while the request waited for a token refresh.")]
	SessionEnded,
	/// Response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
}
impl Error {
	/// Returns the HTTP status associated with the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::AuthExpired { .. } => Some(401),
			Self::RefreshFailed { status, .. } => *status,
			_ => None,
		}
	}

	/// Returns `true` when the failure means the session can no longer be used.
	pub fn is_auth_expired(&self) -> bool {
		matches!(self, Self::AuthExpired { .. } | Self::RefreshFailed { .. } | Self::SessionEnded)
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL parsed but cannot anchor relative paths.
	#[error("Base URL `{url}` must be an http(s) URL that can anchor relative paths.")]
	UnsupportedBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint path must be absolute.
	#[error("The {endpoint} path must start with `/`: {path}.")]
	RelativeEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending path.
		path: String,
	},
	/// Session event channel needs room for at least one event.
	#[error("Session event capacity must be greater than zero.")]
	ZeroEventCapacity,
	/// Exempt route set is invalid.
	#[error(transparent)]
	Route(#[from] crate::auth::RouteError),
	/// JSON request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// URL of the failing request.
		url: Url,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for the server.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// URL of the failing request.
		url: Url,
	},
	/// Descriptor could not be converted into a transport request.
	#[error("Request to {url} could not be built: {message}.")]
	Build {
		/// URL of the failing request.
		url: Url,
		/// Human-readable description of the conversion failure.
		message: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url, source: Box::new(src) }
	}
}

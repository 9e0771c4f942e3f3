//! Client configuration and its validating builder.

// crates.io
use ::http::header::CONTENT_TYPE;
// self
use crate::{_prelude::*, auth::ExemptRoutes, error::ConfigError};

/// Validated client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Base URL every relative path is appended to.
	pub base_url: Url,
	/// Path of the refresh endpoint.
	pub refresh_path: String,
	/// Path of the login endpoint; always part of the exempt routes.
	pub login_path: String,
	/// Routes that never enter refresh handling.
	pub exempt_routes: ExemptRoutes,
	/// Headers applied to every request that does not set them itself.
	pub default_headers: HeaderMap,
	/// Buffer size of the session event channel.
	pub event_capacity: usize,
}
impl ClientConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh-token";
	/// Default session event buffer size.
	pub const DEFAULT_EVENT_CAPACITY: usize = 16;

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves `path` against the base URL.
	///
	/// Relative paths are appended to the base path (so `/api/v1` + `/properties` yields
	/// `/api/v1/properties`); absolute `http(s)://` URLs are used as-is.
	pub fn join(&self, path: &str) -> Result<Url, ConfigError> {
		let raw = if path.starts_with("http://") || path.starts_with("https://") {
			path.to_owned()
		} else {
			let base = self.base_url.as_str().trim_end_matches('/');

			if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") }
		};

		Url::parse(&raw).map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.join(&self.refresh_path)
	}

	/// Absolute URL of the login endpoint.
	pub fn login_url(&self) -> Result<Url, ConfigError> {
		self.join(&self.login_path)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Unparsed base URL.
	pub base_url: String,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Login endpoint path.
	pub login_path: String,
	/// Exempt route set.
	pub exempt_routes: ExemptRoutes,
	/// Default headers.
	pub default_headers: HeaderMap,
	/// Session event buffer size.
	pub event_capacity: usize,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided base URL and the default endpoints.
	pub fn new(base_url: impl Into<String>) -> Self {
		let mut default_headers = HeaderMap::new();

		default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Self {
			base_url: base_url.into(),
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			login_path: ExemptRoutes::LOGIN.into(),
			exempt_routes: ExemptRoutes::default(),
			default_headers,
			event_capacity: ClientConfig::DEFAULT_EVENT_CAPACITY,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Replaces the exempt route set.
	pub fn exempt_routes(mut self, routes: ExemptRoutes) -> Self {
		self.exempt_routes = routes;

		self
	}

	/// Sets (or replaces) a default header.
	pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.default_headers.insert(name, value);

		self
	}

	/// Removes a default header, including the built-in JSON content type.
	pub fn without_default_header(mut self, name: HeaderName) -> Self {
		self.default_headers.remove(name);

		self
	}

	/// Overrides the session event buffer size.
	pub fn event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url =
			Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		validate_base_url(&base_url)?;
		validate_path("refresh", &self.refresh_path)?;
		validate_path("login", &self.login_path)?;

		if self.event_capacity == 0 {
			return Err(ConfigError::ZeroEventCapacity);
		}

		let mut exempt_routes = self.exempt_routes;

		exempt_routes.insert(self.login_path.clone())?;

		Ok(ClientConfig {
			base_url,
			refresh_path: self.refresh_path,
			login_path: self.login_path,
			exempt_routes,
			default_headers: self.default_headers,
			event_capacity: self.event_capacity,
		})
	}
}

fn validate_base_url(url: &Url) -> Result<(), ConfigError> {
	let supported = matches!(url.scheme(), "http" | "https")
		&& !url.cannot_be_a_base()
		&& url.query().is_none()
		&& url.fragment().is_none();

	if supported { Ok(()) } else { Err(ConfigError::UnsupportedBaseUrl { url: url.to_string() }) }
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::RelativeEndpoint { endpoint, path: path.to_owned() })
	}
}

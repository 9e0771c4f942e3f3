//! Replayable outgoing request value.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	request::body::{MultipartPayload, RequestBody},
};

/// Outgoing call: method, URL, headers, optional body, and the single-use retry marker.
///
/// Descriptors are cloned into the retry queue and re-sent verbatim after a refresh. The retry
/// marker is private so only the refresh coordinator can set it.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Request headers; names are unique.
	pub headers: HeaderMap,
	/// Optional body.
	pub body: Option<RequestBody>,
	retried: bool,
}
impl RequestDescriptor {
	/// Creates a descriptor without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None, retried: false }
	}

	/// Sets (or replaces) a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `value` as the JSON body.
	pub fn with_json<T>(self, value: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		Ok(self.with_json_value(serde_json::to_value(value)?))
	}

	/// Uses an already-built JSON value as the body.
	pub fn with_json_value(mut self, value: serde_json::Value) -> Self {
		self.body = Some(RequestBody::Json(value));

		self
	}

	/// Uses a multipart payload as the body.
	pub fn with_multipart(mut self, payload: MultipartPayload) -> Self {
		self.body = Some(RequestBody::Multipart(payload));

		self
	}

	/// Returns `true` when the body is multipart.
	pub fn is_multipart(&self) -> bool {
		self.body.as_ref().is_some_and(RequestBody::is_multipart)
	}

	/// Returns `true` once the request went through a refresh-and-replay cycle.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}
}

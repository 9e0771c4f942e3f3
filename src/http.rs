//! Transport primitives for executing annotated requests.
//!
//! The module exposes [`Transport`] alongside [`HttpResponse`] so downstream crates can plug in
//! custom HTTP stacks (or scripted fakes in tests) without touching the refresh pipeline. A
//! transport reports every HTTP status as a successful outcome; the client decides what counts as
//! a failure. Only failures without a response (DNS, TCP, TLS, timeouts) surface as
//! [`TransportError`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use ::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::TransportError, request::RequestDescriptor};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	request::{MultipartPayload, PartValue, RequestBody},
};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a [`RequestDescriptor`].
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every clone
/// of a client, and must be callable any number of times with different descriptors (queued
/// requests are replayed through the same transport after a refresh).
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes the request and returns the response, whatever its status.
	fn send(&self, request: RequestDescriptor) -> TransportFuture<'_>;
}

/// Buffered HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Final request URL.
	pub url: Url,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with no headers.
	pub fn new(status: u16, url: Url, body: impl Into<Vec<u8>>) -> Self {
		Self { status, url, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the body as UTF-8 text, if it is valid UTF-8.
	pub fn text(&self) -> Option<&str> {
		std::str::from_utf8(&self.body).ok()
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Converts a non-2xx response into [`Error::Status`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() { Ok(self) } else { Err(self.into_status_error()) }
	}

	pub(crate) fn into_status_error(self) -> Error {
		let body = String::from_utf8(self.body).ok().filter(|body| !body.is_empty());

		Error::Status { status: self.status, url: self.url, body }
	}
}

/// Thin wrapper around [`reqwest::Client`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub reqwest::Client);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest client.
	pub fn with_client(client: reqwest::Client) -> Self {
		Self(client)
	}

	/// Builds a transport with a per-request timeout.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ConfigError> {
		Ok(Self(reqwest::Client::builder().timeout(timeout).build()?))
	}

	async fn execute(
		client: reqwest::Client,
		request: RequestDescriptor,
	) -> Result<HttpResponse, TransportError> {
		let url = request.url.clone();
		let typed = request.headers.contains_key(CONTENT_TYPE);
		let mut builder = client.request(request.method, request.url).headers(request.headers);

		match request.body {
			Some(RequestBody::Json(value)) => {
				let bytes = serde_json::to_vec(&value).map_err(|e| TransportError::Build {
					url: url.clone(),
					message: e.to_string(),
				})?;

				// JSON bodies stay typed even when the default header was removed.
				if !typed {
					builder = builder.header(CONTENT_TYPE, "application/json");
				}

				builder = builder.body(bytes);
			},
			Some(RequestBody::Multipart(payload)) => {
				builder = builder.multipart(multipart_form(&url, payload)?);
			},
			None => {},
		}

		let response = builder.send().await.map_err(|e| map_reqwest_error(&url, e))?;
		let status = response.status().as_u16();
		let final_url = response.url().clone();
		let headers = response.headers().to_owned();
		let body = response.bytes().await.map_err(|e| map_reqwest_error(&url, e))?.to_vec();

		Ok(HttpResponse { status, url: final_url, headers, body })
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = reqwest::Client;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: RequestDescriptor) -> TransportFuture<'_> {
		Box::pin(Self::execute(self.0.clone(), request))
	}
}

#[cfg(feature = "reqwest")]
fn multipart_form(
	url: &Url,
	payload: MultipartPayload,
) -> Result<reqwest::multipart::Form, TransportError> {
	use reqwest::multipart::{Form, Part};

	let mut form = Form::new();

	for part in payload.parts {
		let mut built = match part.value {
			PartValue::Text(text) => Part::text(text),
			PartValue::Bytes(bytes) => Part::bytes(bytes),
		};

		if let Some(file_name) = part.file_name {
			built = built.file_name(file_name);
		}
		if let Some(mime) = part.mime.as_deref() {
			built = built.mime_str(mime).map_err(|e| TransportError::Build {
				url: url.clone(),
				message: format!("invalid MIME type `{mime}`: {e}"),
			})?;
		}

		form = form.part(part.name, built);
	}

	Ok(form)
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(url: &Url, e: reqwest::Error) -> TransportError {
	if e.is_timeout() {
		TransportError::Timeout { url: url.clone() }
	} else if e.is_builder() {
		TransportError::Build { url: url.clone(), message: e.to_string() }
	} else {
		TransportError::network(url.clone(), e)
	}
}

//! Bearer credential wrapper that redacts sensitive material.

// self
use crate::_prelude::*;

/// Opaque bearer token issued by the login or refresh endpoint.
///
/// Formatting never reveals the token; use [`Credential::expose`] or [`Credential::bearer`] at
/// the single point where the value is written into a request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);
impl Credential {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Renders the `Authorization` header value for this credential.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for Credential {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Credential").field(&"<redacted>").finish()
	}
}
impl Display for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// `{ "token": ... }` payload returned by the login and refresh endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPayload {
	/// Newly issued credential.
	pub token: Credential,
}

//! Per-call header rules applied before every dispatch (initial sends and replays alike).

// crates.io
use ::http::header::{AUTHORIZATION, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	obs::flow_event,
	request::descriptor::RequestDescriptor,
	store::CredentialStore,
};

/// Header set shared by a client's annotator and its session terminator.
pub type SharedHeaders = Arc<RwLock<HeaderMap>>;

/// Applies default headers, the bearer credential, and multipart content-type rules.
///
/// The annotator only reads the credential store; it never writes to it.
#[derive(Clone)]
pub struct RequestAnnotator {
	store: Arc<dyn CredentialStore>,
	defaults: SharedHeaders,
}
impl RequestAnnotator {
	/// Creates an annotator over the provided store and default header set.
	pub fn new(store: Arc<dyn CredentialStore>, defaults: SharedHeaders) -> Self {
		Self { store, defaults }
	}

	/// Returns the augmented descriptor.
	///
	/// - Defaults fill headers the descriptor does not set itself.
	/// - `Authorization: Bearer <credential>` is set when a credential is stored.
	/// - Every `Content-Type` header is removed when the body is multipart, so the transport
	///   can compute the boundary.
	pub fn annotate(&self, mut request: RequestDescriptor) -> RequestDescriptor {
		{
			let defaults = self.defaults.read();

			for (name, value) in defaults.iter() {
				if !request.headers.contains_key(name) {
					request.headers.insert(name.clone(), value.clone());
				}
			}
		}

		if let Some(credential) = self.store.load() {
			match HeaderValue::from_str(&credential.bearer()) {
				Ok(mut value) => {
					value.set_sensitive(true);
					request.headers.insert(AUTHORIZATION, value);
				},
				Err(_) => {
					flow_event!(
						warn,
						url = %request.url,
						"Stored credential is not a valid header value; sending unauthenticated."
					);
				},
			}
		}
		if request.is_multipart() {
			request.headers.remove(CONTENT_TYPE);
		}

		request
	}
}
impl Debug for RequestAnnotator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestAnnotator")
			.field("credential_set", &self.store.contains())
			.field("defaults", &self.defaults.read().len())
			.finish()
	}
}

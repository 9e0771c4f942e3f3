//! Auth-failure classification hooks.
//!
//! The classifier decides whether a failed call is recovered through the refresh coordinator,
//! surfaced untouched, or treated as a terminal authentication failure. Implementations only see
//! crate-owned context data so they stay independent of any HTTP client.

// self
use crate::{_prelude::*, auth::ExemptRoutes};

/// HTTP status that signals a missing, invalid, or expired credential.
pub const UNAUTHORIZED: u16 = 401;

/// Classification of a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthFailure {
	/// Any other status or a network failure; propagated untouched.
	NotAuthRelated,
	/// The request targets an authentication endpoint; never refreshed, never redirected.
	Exempt,
	/// First 401 on a protected request; recover through the refresh coordinator.
	RetryNeeded,
	/// 401 on a request that was already replayed once; terminal.
	AlreadyRetried,
}

/// Context passed to classifiers for one failed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureContext {
	/// URL of the failed request.
	pub url: Url,
	/// HTTP status code, when a response was received.
	pub status: Option<u16>,
	/// Whether the request already carries the retry marker.
	pub retried: bool,
	/// Indicates whether the failure originated from the network/transport layer.
	pub network_error: bool,
}
impl FailureContext {
	/// Creates a new context for the provided request URL.
	pub fn new(url: Url) -> Self {
		Self { url, status: None, retried: false, network_error: false }
	}

	/// Convenience constructor for transport-level/network failures.
	pub fn network_failure(url: Url) -> Self {
		let mut ctx = Self::new(url);

		ctx.network_error = true;

		ctx
	}

	/// Adds an HTTP status code (e.g., 401, 404, 500).
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Overrides the retry marker.
	pub fn with_retried(mut self, retried: bool) -> Self {
		self.retried = retried;

		self
	}
}

/// Strategy hook that maps failed calls into [`AuthFailure`] classes.
pub trait FailureClassifier: Send + Sync {
	/// Classifies one failed call.
	fn classify(&self, ctx: &FailureContext) -> AuthFailure;

	/// Returns `true` when the URL belongs to an authentication endpoint.
	fn is_exempt(&self, url: &Url) -> bool;
}

/// Default classifier over an [`ExemptRoutes`] set.
///
/// Exempt routes win over every other rule, then a 401 is split by the retry marker, and
/// everything else (including network failures) is not auth related.
#[derive(Clone, Debug, Default)]
pub struct DefaultFailureClassifier {
	exempt: ExemptRoutes,
}
impl DefaultFailureClassifier {
	/// Creates a classifier over the provided exempt routes.
	pub fn new(exempt: ExemptRoutes) -> Self {
		Self { exempt }
	}

	/// Returns the exempt route set.
	pub fn exempt_routes(&self) -> &ExemptRoutes {
		&self.exempt
	}
}
impl FailureClassifier for DefaultFailureClassifier {
	fn classify(&self, ctx: &FailureContext) -> AuthFailure {
		if self.exempt.matches(&ctx.url) {
			return AuthFailure::Exempt;
		}
		if ctx.network_error || ctx.status != Some(UNAUTHORIZED) {
			return AuthFailure::NotAuthRelated;
		}
		if ctx.retried {
			return AuthFailure::AlreadyRetried;
		}

		AuthFailure::RetryNeeded
	}

	fn is_exempt(&self, url: &Url) -> bool {
		self.exempt.matches(url)
	}
}

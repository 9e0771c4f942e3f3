//! Authenticated client: the interceptor pipeline every call goes through.
//!
//! A call is annotated (default headers, bearer credential, multipart rules), handed to the
//! [`Transport`], and judged. Successes pass through unchanged. Failures are classified: most are
//! returned as-is, a first 401 is recovered through the single-flight [`RefreshCoordinator`], and
//! a 401 on an already replayed request ends the session.

pub mod refresh;

mod login;

pub use refresh::*;

// crates.io
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
// self
use crate::{
	_prelude::*,
	classify::{AuthFailure, DefaultFailureClassifier, FailureClassifier, FailureContext},
	config::ClientConfig,
	error::TransportError,
	http::{HttpResponse, Transport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::{MultipartPayload, RequestAnnotator, RequestDescriptor, SharedHeaders},
	session::{SessionEvent, SessionTerminator, UnauthenticatedReason},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestClient = Client<ReqwestTransport>;

/// HTTP client that attaches credentials and transparently recovers from expired tokens.
///
/// Each constructed client owns its own refresh coordinator, default headers, and event channel;
/// clones share them, separately constructed clients never do.
pub struct Client<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request, including refreshes and replays.
	pub transport: Arc<T>,
	/// Session-scoped credential store.
	pub store: Arc<dyn CredentialStore>,
	/// Classifier deciding which failures enter refresh handling.
	pub classifier: Arc<dyn FailureClassifier>,
	/// Validated configuration.
	pub config: Arc<ClientConfig>,
	/// Shared counters for refresh coordination.
	pub refresh_metrics: Arc<RefreshMetrics>,
	defaults: SharedHeaders,
	annotator: RequestAnnotator,
	terminator: SessionTerminator,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> Client<T>
where
	T: ?Sized + Transport,
{
	/// Creates a client over the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let classifier: Arc<dyn FailureClassifier> = Arc::new(DefaultFailureClassifier::new(
			config.exempt_routes.mount(config.base_url.path()),
		));
		let defaults: SharedHeaders = Arc::new(RwLock::new(config.default_headers.clone()));
		let (events, _) = broadcast::channel(config.event_capacity);
		let annotator = RequestAnnotator::new(store.clone(), defaults.clone());
		let terminator =
			SessionTerminator::new(store.clone(), defaults.clone(), classifier.clone(), events);

		Self {
			transport: transport.into(),
			store,
			classifier,
			config: Arc::new(config),
			refresh_metrics: Default::default(),
			defaults,
			annotator,
			terminator,
			coordinator: Default::default(),
		}
	}

	/// Replaces the failure classifier (the terminator uses it for its exemption check too).
	pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
		self.terminator = self.terminator.with_classifier(classifier.clone());
		self.classifier = classifier;

		self
	}

	/// Subscribes to session events (sign-in, refresh, termination).
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.terminator.subscribe()
	}

	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.coordinator.is_refreshing()
	}

	/// Number of requests waiting on the in-flight refresh.
	pub fn queued_requests(&self) -> usize {
		self.coordinator.queued()
	}

	/// Returns a snapshot of the default headers.
	pub fn default_headers(&self) -> HeaderMap {
		self.defaults.read().clone()
	}

	/// Builds a descriptor for `path` resolved against the base URL.
	pub fn request(&self, method: Method, path: &str) -> Result<RequestDescriptor> {
		Ok(RequestDescriptor::new(method, self.config.join(path)?))
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: &str) -> Result<HttpResponse> {
		self.send(self.request(Method::GET, path)?).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: &str) -> Result<HttpResponse> {
		self.send(self.request(Method::DELETE, path)?).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<HttpResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::POST, path)?.with_json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put_json<B>(&self, path: &str, body: &B) -> Result<HttpResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::PUT, path)?.with_json(body)?).await
	}

	/// Sends a `PATCH` request with a JSON body.
	pub async fn patch_json<B>(&self, path: &str, body: &B) -> Result<HttpResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::PATCH, path)?.with_json(body)?).await
	}

	/// Sends a `POST` request with a multipart body.
	pub async fn post_multipart(
		&self,
		path: &str,
		payload: MultipartPayload,
	) -> Result<HttpResponse> {
		self.send(self.request(Method::POST, path)?.with_multipart(payload)).await
	}

	/// Sends the request and decodes a successful JSON response.
	pub async fn send_json<R>(&self, request: RequestDescriptor) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send(request).await?.json()
	}

	/// Sends a request through the full pipeline.
	///
	/// Returns the response for 2xx statuses. A first 401 on a protected route is recovered
	/// through the refresh coordinator and is invisible to the caller when the replay succeeds.
	pub async fn send(&self, request: RequestDescriptor) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::dispatch(KIND, &request);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let outcome =
			span.instrument(self.transport.send(self.annotator.annotate(request.clone()))).await;
		let result = match self.judge(&request, outcome) {
			Verdict::Done(result) => result,
			Verdict::Refresh => self.recover(request).await,
			Verdict::Reject => Err(self.reject_retried(&request, self.terminator.epoch())),
		};

		span.record_result(&result);
		obs::record_result(KIND, &result);

		result
	}

	/// Classifies a transport outcome for `request`.
	fn judge(
		&self,
		request: &RequestDescriptor,
		outcome: Result<HttpResponse, TransportError>,
	) -> Verdict {
		let (ctx, failure) = match outcome {
			Ok(response) if response.is_success() => return Verdict::Done(Ok(response)),
			Ok(response) => (
				FailureContext::new(request.url.clone()).with_status(response.status),
				response.into_status_error(),
			),
			Err(e) => (FailureContext::network_failure(request.url.clone()), Error::from(e)),
		};
		let ctx = ctx.with_retried(request.is_retried());

		match self.classifier.classify(&ctx) {
			AuthFailure::NotAuthRelated | AuthFailure::Exempt => Verdict::Done(Err(failure)),
			AuthFailure::RetryNeeded if !request.is_retried() => Verdict::Refresh,
			AuthFailure::RetryNeeded | AuthFailure::AlreadyRetried => Verdict::Reject,
		}
	}

	/// Ends the session from `epoch` for a request that failed authentication after its replay.
	///
	/// The caller always gets [`Error::AuthExpired`]; the session is only terminated (and the
	/// event emitted) by the first rejection of that epoch.
	fn reject_retried(&self, request: &RequestDescriptor, epoch: u64) -> Error {
		self.terminator.terminate(&request.url, UnauthenticatedReason::RetryRejected, epoch);

		Error::AuthExpired { url: request.url.clone() }
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			classifier: self.classifier.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			defaults: self.defaults.clone(),
			annotator: self.annotator.clone(),
			terminator: self.terminator.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.config.base_url.as_str())
			.field("credential_set", &self.store.contains())
			.field("refreshing", &self.coordinator.is_refreshing())
			.finish()
	}
}

/// What the pipeline does with a transport outcome.
enum Verdict {
	/// Hand the result to the caller.
	Done(Result<HttpResponse>),
	/// Recover through the refresh coordinator.
	Refresh,
	/// Authentication failed for good; end the session.
	Reject,
}

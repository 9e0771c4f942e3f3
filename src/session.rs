//! Session lifecycle events and the terminator that ends an unrecoverable session.
//!
//! The client never navigates anywhere itself. Hosts call [`Client::subscribe`] and react to
//! [`SessionEvent::Unauthenticated`] (typically by routing to the login screen).
//!
//! [`Client::subscribe`]: crate::client::Client::subscribe

// crates.io
use ::http::header::AUTHORIZATION;
use tokio::sync::broadcast;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	classify::FailureClassifier,
	obs::{self, flow_event},
	request::SharedHeaders,
	store::CredentialStore,
};

/// Why a session was terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthenticatedReason {
	/// The refresh endpoint rejected the refresh or could not be reached.
	RefreshFailed,
	/// A refresh was needed but no credential was stored to refresh with.
	MissingCredential,
	/// A replayed request was rejected with 401 again.
	RetryRejected,
}
impl UnauthenticatedReason {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::RefreshFailed => "refresh_failed",
			Self::MissingCredential => "missing_credential",
			Self::RetryRejected => "retry_rejected",
		}
	}
}
impl Display for UnauthenticatedReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Events broadcast to the host application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
	/// The session ended; the host should send the user back to authentication.
	Unauthenticated {
		/// Why the session ended.
		reason: UnauthenticatedReason,
		/// URL of the request whose failure ended the session.
		url: Url,
		/// When the session ended.
		at: OffsetDateTime,
	},
	/// The refresh endpoint issued a new credential.
	CredentialRefreshed {
		/// When the credential was stored.
		at: OffsetDateTime,
	},
	/// The login flow stored a credential.
	SignedIn {
		/// When the credential was stored.
		at: OffsetDateTime,
	},
	/// The host signed out explicitly.
	SignedOut {
		/// When the credential was cleared.
		at: OffsetDateTime,
	},
}

/// Owner of the session lifecycle: sign-in, refreshed credentials, sign-out, and termination.
///
/// Every transition that starts or ends a session bumps the session epoch under one lock. Work
/// that began in an older epoch (an in-flight refresh, a replay) can no longer write a
/// credential or announce a termination, so an explicit sign-out stays signed out and one
/// expiry event is announced at most once.
#[derive(Clone)]
pub struct SessionTerminator {
	store: Arc<dyn CredentialStore>,
	defaults: SharedHeaders,
	classifier: Arc<dyn FailureClassifier>,
	events: broadcast::Sender<SessionEvent>,
	epoch: Arc<Mutex<u64>>,
}
impl SessionTerminator {
	/// Creates a terminator over the client's store, default headers, and event channel.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		defaults: SharedHeaders,
		classifier: Arc<dyn FailureClassifier>,
		events: broadcast::Sender<SessionEvent>,
	) -> Self {
		Self { store, defaults, classifier, events, epoch: Default::default() }
	}

	/// Returns a terminator that uses `classifier` for its exemption check.
	pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
		self.classifier = classifier;

		self
	}

	/// Current session epoch.
	pub fn epoch(&self) -> u64 {
		*self.epoch.lock()
	}

	/// Starts a new session with a credential issued by the login endpoint.
	pub fn sign_in(&self, credential: Credential) {
		{
			let mut epoch = self.epoch.lock();

			*epoch += 1;
			self.store.save(credential);
		}

		self.emit(SessionEvent::SignedIn { at: OffsetDateTime::now_utc() });
	}

	/// Stores a refreshed credential if the session from `epoch` is still current.
	///
	/// Returns `false` (and stores nothing) when the session was signed out, signed in again,
	/// or terminated while the refresh was in flight.
	pub fn store_refreshed(&self, credential: Credential, epoch: u64) -> bool {
		{
			let current = self.epoch.lock();

			if *current != epoch {
				flow_event!(info, "Session changed during refresh; discarding the new credential.");

				return false;
			}

			self.store.save(credential);
		}

		self.emit(SessionEvent::CredentialRefreshed { at: OffsetDateTime::now_utc() });

		true
	}

	/// Ends the session on explicit request of the host.
	pub fn sign_out(&self) {
		self.clear();
		self.emit(SessionEvent::SignedOut { at: OffsetDateTime::now_utc() });

		flow_event!(info, "Signed out.");
	}

	/// Ends the session that was current at `epoch`.
	///
	/// Clears the credential store and any default `Authorization` header, then emits
	/// [`SessionEvent::Unauthenticated`] unless `url` is an exempt authentication route (a failed
	/// login must not redirect to the login screen it is already on). Nothing happens when the
	/// session already moved past `epoch`. Returns whether the event was emitted.
	pub fn terminate(&self, url: &Url, reason: UnauthenticatedReason, epoch: u64) -> bool {
		{
			let mut current = self.epoch.lock();

			if *current != epoch {
				flow_event!(debug, %url, %reason, "Session already ended; nothing to terminate.");

				return false;
			}

			*current += 1;
			self.store.clear();
			self.defaults.write().remove(AUTHORIZATION);
		}

		obs::record_session_terminated(reason);

		if self.classifier.is_exempt(url) {
			flow_event!(debug, %url, %reason, "Session cleared on an exempt route; no redirect.");

			return false;
		}

		flow_event!(warn, %url, %reason, "Session terminated; re-authentication required.");

		self.emit(SessionEvent::Unauthenticated {
			reason,
			url: url.clone(),
			at: OffsetDateTime::now_utc(),
		});

		true
	}

	/// Broadcasts an event; having no subscribers is not an error.
	pub fn emit(&self, event: SessionEvent) {
		let _ = self.events.send(event);
	}

	/// Subscribes to future session events.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.events.subscribe()
	}

	fn clear(&self) {
		let mut epoch = self.epoch.lock();

		*epoch += 1;
		self.store.clear();
		self.defaults.write().remove(AUTHORIZATION);
	}
}
impl Debug for SessionTerminator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionTerminator")
			.field("epoch", &self.epoch())
			.field("subscribers", &self.events.receiver_count())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{classify::DefaultFailureClassifier, store::MemoryStore};

	fn terminator(store: Arc<MemoryStore>, defaults: SharedHeaders) -> SessionTerminator {
		let (events, _) = broadcast::channel(4);

		SessionTerminator::new(
			store,
			defaults,
			Arc::new(DefaultFailureClassifier::default()),
			events,
		)
	}

	fn url(path: &str) -> Url {
		Url::parse("https://api.example.com")
			.and_then(|base| base.join(path))
			.expect("Fixture URL should parse.")
	}

	#[test]
	fn terminate_clears_credentials_and_notifies() {
		let store = Arc::new(MemoryStore::with_credential(Credential::new("stale")));
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer static"));

		let defaults = Arc::new(RwLock::new(headers));
		let terminator = terminator(store.clone(), defaults.clone());
		let mut events = terminator.subscribe();
		let epoch = terminator.epoch();

		assert!(terminator.terminate(&url("/properties"), UnauthenticatedReason::RefreshFailed, epoch));
		assert!(!store.contains());
		assert!(defaults.read().get(AUTHORIZATION).is_none());
		assert_eq!(terminator.epoch(), epoch + 1);

		match events.try_recv().expect("An unauthenticated event should be queued.") {
			SessionEvent::Unauthenticated { reason, url, .. } => {
				assert_eq!(reason, UnauthenticatedReason::RefreshFailed);
				assert_eq!(url.path(), "/properties");
			},
			other => panic!("Unexpected event: {other:?}."),
		}
	}

	#[test]
	fn one_epoch_is_terminated_once() {
		let store = Arc::new(MemoryStore::with_credential(Credential::new("stale")));
		let terminator = terminator(store, Default::default());
		let mut events = terminator.subscribe();
		let epoch = terminator.epoch();

		assert!(terminator.terminate(&url("/brokers"), UnauthenticatedReason::RetryRejected, epoch));
		assert!(!terminator.terminate(&url("/commissions"), UnauthenticatedReason::RetryRejected, epoch));
		assert!(events.try_recv().is_ok());
		assert!(events.try_recv().is_err());
	}

	#[test]
	fn exempt_routes_clear_without_redirect() {
		let store = Arc::new(MemoryStore::with_credential(Credential::new("stale")));
		let terminator = terminator(store.clone(), Default::default());
		let mut events = terminator.subscribe();
		let epoch = terminator.epoch();

		assert!(!terminator.terminate(&url("/auth/login"), UnauthenticatedReason::RetryRejected, epoch));
		assert!(!store.contains());
		assert!(events.try_recv().is_err());
	}

	#[test]
	fn refreshed_credential_is_dropped_after_sign_out() {
		let store = Arc::new(MemoryStore::with_credential(Credential::new("stale")));
		let terminator = terminator(store.clone(), Default::default());
		let mut events = terminator.subscribe();
		let epoch = terminator.epoch();

		terminator.sign_out();

		assert!(!terminator.store_refreshed(Credential::new("fresh"), epoch));
		assert!(!store.contains());
		assert!(matches!(events.try_recv(), Ok(SessionEvent::SignedOut { .. })));
		assert!(events.try_recv().is_err());

		terminator.sign_in(Credential::new("issued"));

		let epoch = terminator.epoch();

		assert!(terminator.store_refreshed(Credential::new("renewed"), epoch));
		assert_eq!(store.load().map(|c| c.expose().to_owned()), Some("renewed".into()));
	}

	#[test]
	fn emitting_without_subscribers_is_fine() {
		let terminator = terminator(Arc::new(MemoryStore::default()), Default::default());
		let epoch = terminator.epoch();

		terminator.emit(SessionEvent::SignedOut { at: OffsetDateTime::now_utc() });
		assert!(terminator.terminate(
			&url("/brokers"),
			UnauthenticatedReason::MissingCredential,
			epoch
		));
	}
}

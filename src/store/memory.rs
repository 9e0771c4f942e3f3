//! Thread-safe in-memory [`CredentialStore`] scoped to the lifetime of the process.

// self
use crate::{_prelude::*, auth::Credential, store::CredentialStore};

/// Storage backend that keeps the credential in-process; clones share one session scope.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<Credential>>>);
impl MemoryStore {
	/// Creates a store seeded with an existing credential.
	pub fn with_credential(credential: Credential) -> Self {
		Self(Arc::new(RwLock::new(Some(credential))))
	}
}
impl CredentialStore for MemoryStore {
	fn load(&self) -> Option<Credential> {
		self.0.read().clone()
	}

	fn save(&self, credential: Credential) {
		*self.0.write() = Some(credential);
	}

	fn clear(&self) {
		self.0.write().take();
	}
}

//! Session-scoped credential storage contract and the built-in in-memory store.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::auth::Credential;

/// Session-scoped holder of the current bearer credential.
///
/// The store is the only owner of the credential. The request pipeline reads it on every call;
/// only the refresh coordinator, the login flow, and the session terminator replace or clear it.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the current credential, if one is stored.
	fn load(&self) -> Option<Credential>;

	/// Stores or replaces the current credential.
	fn save(&self, credential: Credential);

	/// Removes the current credential.
	fn clear(&self);

	/// Returns `true` when a credential is stored.
	fn contains(&self) -> bool {
		self.load().is_some()
	}
}

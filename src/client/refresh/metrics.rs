// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh coordination.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	queued: AtomicU64,
	replays: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh cycles started (one per single-flight leader).
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh cycles that stored a new credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh cycles that ended the session.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of requests that waited on a refresh (leaders included).
	pub fn queued(&self) -> u64 {
		self.queued.load(Ordering::Relaxed)
	}

	/// Returns the number of queued requests replayed after a successful refresh.
	pub fn replays(&self) -> u64 {
		self.replays.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_queued(&self) {
		self.queued.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_replay(&self) {
		self.replays.fetch_add(1, Ordering::Relaxed);
	}
}

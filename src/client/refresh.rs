//! Single-flight credential refresh with a FIFO retry queue.
//!
//! Every request that fails with a first 401 is marked as retried and appended to the queue of
//! the client's [`RefreshCoordinator`]. The append and the "is anyone refreshing" check happen in
//! one critical section, so exactly one caller per expiry event becomes the leader and calls the
//! refresh endpoint while the rest wait on their completion handles. When the refresh settles the
//! leader drains the queue exactly once and resolves the handles in FIFO order: on success each
//! caller receives its request back and replays it itself with the new credential, on failure
//! every caller is rejected with the same [`Error::RefreshFailed`] and the session is terminated.
//!
//! Replays run on the callers' own futures, so a leader dropped after settlement never takes the
//! other callers' replays down with it. Only a leader dropped before settlement abandons the
//! queue.
//!
//! The refresh call has no timeout of its own; a hung call keeps the flag set until the
//! transport gives up.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenPayload},
	client::{Client, Verdict},
	http::{HttpResponse, Transport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, flow_event},
	request::RequestDescriptor,
	session::UnauthenticatedReason,
};

type Completion = oneshot::Sender<Result<Replay>>;

/// Request blocked on the in-flight refresh, paired with the handle that resolves its caller.
struct QueueEntry {
	request: RequestDescriptor,
	completion: Completion,
}

/// Permission to replay a queued request, handed back by a successful refresh.
#[derive(Debug)]
struct Replay {
	request: RequestDescriptor,
	/// Session epoch the refreshed credential was stored in.
	epoch: u64,
}

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	queue: Vec<QueueEntry>,
}

/// Owner of the `refreshing` flag and the retry queue for one client.
///
/// Invariant: `refreshing` is `true` exactly while one leader holds an unsettled
/// [`RefreshCycle`]; the queue is only ever emptied by [`RefreshCoordinator::drain`].
#[derive(Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
}
impl RefreshCoordinator {
	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Number of requests waiting on the in-flight refresh.
	pub fn queued(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Appends `request` and reserves the refresh slot if it is free.
	///
	/// Returns the cycle handle when the caller became the leader. Followers never hold a cycle,
	/// so only the leader's drop can abandon the queue.
	fn enqueue(
		&self,
		request: RequestDescriptor,
	) -> (Option<RefreshCycle<'_>>, oneshot::Receiver<Result<Replay>>) {
		let (completion, receiver) = oneshot::channel();
		let lead = {
			let mut state = self.state.lock();

			state.queue.push(QueueEntry { request, completion });

			!std::mem::replace(&mut state.refreshing, true)
		};

		(lead.then(|| RefreshCycle { coordinator: self, settled: false }), receiver)
	}

	/// Takes every queued entry and clears the flag in one step.
	fn drain(&self) -> Vec<QueueEntry> {
		let mut state = self.state.lock();

		state.refreshing = false;

		std::mem::take(&mut state.queue)
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &state.refreshing)
			.field("queued", &state.queue.len())
			.finish()
	}
}

/// Leadership of one refresh cycle.
///
/// Dropping an unsettled cycle (the leader's future was cancelled mid-refresh) clears the flag
/// and rejects the queued callers with [`Error::RefreshAbandoned`].
struct RefreshCycle<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl RefreshCycle<'_> {
	fn settle(mut self) -> Vec<QueueEntry> {
		self.settled = true;

		self.coordinator.drain()
	}
}
impl Drop for RefreshCycle<'_> {
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		for entry in self.coordinator.drain() {
			let _ = entry.completion.send(Err(Error::RefreshAbandoned));
		}
	}
}

/// Why the refresh endpoint did not yield a credential.
#[derive(Clone, Debug)]
struct RefreshFailure {
	cause: UnauthenticatedReason,
	reason: String,
	status: Option<u16>,
}
impl RefreshFailure {
	fn missing_credential() -> Self {
		Self {
			cause: UnauthenticatedReason::MissingCredential,
			reason: "no credential is stored to refresh with".into(),
			status: None,
		}
	}

	fn failed(reason: impl Display, status: Option<u16>) -> Self {
		let reason = reason.to_string().trim_end_matches('.').to_owned();

		Self { cause: UnauthenticatedReason::RefreshFailed, reason, status }
	}

	fn to_error(&self) -> Error {
		Error::RefreshFailed { reason: self.reason.clone(), status: self.status }
	}
}

impl<T> Client<T>
where
	T: ?Sized + Transport,
{
	/// Recovers a request that failed with a first 401.
	///
	/// The request is marked as retried before it is queued, so a 401 on its replay is terminal.
	pub(crate) async fn recover(&self, mut request: RequestDescriptor) -> Result<HttpResponse> {
		request.mark_retried();

		let trigger = request.url.clone();
		let (cycle, receiver) = self.coordinator.enqueue(request);

		self.refresh_metrics.record_queued();

		if let Some(cycle) = cycle {
			self.lead(cycle, &trigger).await;
		} else {
			flow_event!(debug, url = %trigger, "Queued behind the in-flight refresh.");
		}

		let Replay { request, epoch } =
			receiver.await.unwrap_or_else(|_| Err(Error::RefreshAbandoned))?;

		self.replay(request, epoch).await
	}

	/// Runs one refresh cycle as its leader and settles the queue.
	async fn lead(&self, cycle: RefreshCycle<'_>, trigger: &Url) {
		const KIND: FlowKind = FlowKind::Refresh;

		let epoch = self.terminator.epoch();
		let span = FlowSpan::session(KIND, epoch);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		span.instrument(async {
			flow_event!(info, url = %trigger, "Refreshing credential.");

			// Store before settling so late 401s still join this cycle.
			let stored = self
				.call_refresh()
				.await
				.map(|credential| self.terminator.store_refreshed(credential, epoch));

			match stored {
				Ok(true) => {
					let entries = cycle.settle();

					self.settled(FlowOutcome::Success, entries.len());

					flow_event!(info, replays = entries.len(), "Credential refreshed.");

					for QueueEntry { request, completion } in entries {
						let _ = completion.send(Ok(Replay { request, epoch }));
					}
				},
				Ok(false) => {
					let entries = cycle.settle();

					self.settled(FlowOutcome::Failure, entries.len());

					flow_event!(
						info,
						rejected = entries.len(),
						"Session ended during refresh; queued requests rejected."
					);

					for entry in entries {
						let _ = entry.completion.send(Err(Error::SessionEnded));
					}
				},
				Err(failure) => {
					self.terminator.terminate(trigger, failure.cause, epoch);

					let entries = cycle.settle();

					self.settled(FlowOutcome::Failure, entries.len());
					span.record_status(failure.status);

					flow_event!(
						warn,
						rejected = entries.len(),
						status = ?failure.status,
						reason = %failure.reason,
						"Credential refresh failed."
					);

					for entry in entries {
						let _ = entry.completion.send(Err(failure.to_error()));
					}
				},
			}
		})
		.await;
	}

	fn settled(&self, outcome: FlowOutcome, waiters: usize) {
		match outcome {
			FlowOutcome::Success => self.refresh_metrics.record_success(),
			_ => self.refresh_metrics.record_failure(),
		}

		obs::record_flow_outcome(FlowKind::Refresh, outcome);
		obs::record_refresh_settled(outcome, waiters);
	}

	/// Calls the refresh endpoint with the stored credential as refresh material.
	async fn call_refresh(&self) -> Result<Credential, RefreshFailure> {
		let Some(current) = self.store.load() else {
			return Err(RefreshFailure::missing_credential());
		};
		let url = self.config.refresh_url().map_err(|e| RefreshFailure::failed(e, None))?;
		let request = RequestDescriptor::new(Method::POST, url)
			.with_json_value(serde_json::json!({ "token": current.expose() }));
		let response = self
			.transport
			.send(self.annotator.annotate(request))
			.await
			.map_err(|e| RefreshFailure::failed(e, None))?;
		let status = response.status;

		if !response.is_success() {
			return Err(RefreshFailure::failed(
				format!("refresh endpoint returned HTTP {status}"),
				Some(status),
			));
		}

		let payload: TokenPayload =
			response.json().map_err(|e| RefreshFailure::failed(e, Some(status)))?;

		if payload.token.expose().is_empty() {
			return Err(RefreshFailure::failed("refresh endpoint returned an empty token", Some(status)));
		}

		Ok(payload.token)
	}

	/// Re-sends a released request with the current credential.
	///
	/// A second authentication failure ends the session refreshed in `epoch`; only the first
	/// rejected replay of a cycle announces it.
	async fn replay(&self, request: RequestDescriptor, epoch: u64) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Replay;

		let span = FlowSpan::dispatch(KIND, &request);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_replay();

		let outcome =
			span.instrument(self.transport.send(self.annotator.annotate(request.clone()))).await;
		let result = match self.judge(&request, outcome) {
			Verdict::Done(result) => result,
			Verdict::Refresh | Verdict::Reject => Err(self.reject_retried(&request, epoch)),
		};

		span.record_result(&result);
		obs::record_result(KIND, &result);

		result
	}
}

// self
use crate::{
	obs::{FlowKind, FlowOutcome},
	session::UnauthenticatedReason,
};

/// Counts one pipeline step (`backoffice_http_flow_total{flow,outcome}`).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"backoffice_http_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts the success or failure of a finished step.
pub(crate) fn record_result<T, E>(kind: FlowKind, result: &Result<T, E>) {
	let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

	record_flow_outcome(kind, outcome);
}

/// Records how many queued requests one refresh cycle settled
/// (`backoffice_http_refresh_waiters{outcome}`).
pub fn record_refresh_settled(outcome: FlowOutcome, waiters: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("backoffice_http_refresh_waiters", "outcome" => outcome.as_str())
			.record(waiters as f64);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (outcome, waiters);
	}
}

/// Counts ended sessions by cause (`backoffice_http_session_terminated_total{reason}`).
pub fn record_session_terminated(reason: UnauthenticatedReason) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("backoffice_http_session_terminated_total", "reason" => reason.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = reason;
	}
}

//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `backoffice_http.flow`. Dispatch spans (first sends
//!   and replays) carry `flow`, `method`, `path`, `retried`, and the final `status`; session
//!   spans (refresh cycles, login) carry `flow` and the session `epoch`. Refresh coordination
//!   and session termination also emit events.
//! - Enable `metrics` to record:
//!   - `backoffice_http_flow_total{flow,outcome}` for every attempt/success/failure;
//!   - `backoffice_http_refresh_waiters{outcome}`, the queue depth each refresh cycle settled;
//!   - `backoffice_http_session_terminated_total{reason}`, ended sessions by cause.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event when the feature is enabled; compiles to nothing otherwise.
macro_rules! flow_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	};
}
pub(crate) use flow_event;

/// Pipeline flows observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// First dispatch of a caller's request.
	Request,
	/// Single-flight call to the refresh endpoint.
	Refresh,
	/// Re-dispatch of a queued request after a refresh.
	Replay,
	/// Login call that seeds the credential.
	Login,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Request => "request",
			FlowKind::Refresh => "refresh",
			FlowKind::Replay => "replay",
			FlowKind::Login => "login",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a pipeline stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

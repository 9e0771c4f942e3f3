// self
use crate::{_prelude::*, http::HttpResponse, obs::FlowKind, request::RequestDescriptor};

/// Span around one pipeline stage; a zero-sized no-op without the `tracing` feature.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Span for dispatching `request`, either its first send or its replay.
	///
	/// Records the method, the URL path (never the query, which may carry personal data), and
	/// the retry marker. The final HTTP status is filled in by [`FlowSpan::record_result`].
	pub fn dispatch(kind: FlowKind, request: &RequestDescriptor) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"backoffice_http.flow",
				flow = kind.as_str(),
				method = %request.method,
				path = request.url.path(),
				retried = request.is_retried(),
				status = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, request);

			Self {}
		}
	}

	/// Span for a session-level stage (refresh cycle, login) started in session `epoch`.
	pub fn session(kind: FlowKind, epoch: u64) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"backoffice_http.flow",
				flow = kind.as_str(),
				epoch,
				status = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, epoch);

			Self {}
		}
	}

	/// Records the HTTP status carried by a finished dispatch, when there is one.
	pub fn record_result(&self, result: &Result<HttpResponse>) {
		let status = match result {
			Ok(response) => Some(response.status),
			Err(e) => e.status(),
		};

		self.record_status(status);
	}

	/// Records an HTTP status on the span.
	pub fn record_status(&self, status: Option<u16>) {
		#[cfg(feature = "tracing")]
		{
			if let Some(status) = status {
				self.span.record("status", status);
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = status;
		}
	}

	/// Runs `fut` inside the span without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> impl Future<Output = Fut::Output>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

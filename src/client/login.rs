// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenPayload},
	client::Client,
	http::Transport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, flow_event},
	request::RequestDescriptor,
};

impl<T> Client<T>
where
	T: ?Sized + Transport,
{
	/// Posts `body` to the login endpoint and stores the issued credential.
	///
	/// The login route is exempt from refresh handling, so a 401 here surfaces as
	/// [`Error::Status`] and never terminates anything beyond what the caller decides.
	pub async fn login<B>(&self, body: &B) -> Result<Credential>
	where
		B: ?Sized + Serialize,
	{
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::session(KIND, self.terminator.epoch());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let request =
					RequestDescriptor::new(Method::POST, self.config.login_url()?).with_json(body)?;
				let payload: TokenPayload = self.send(request).await?.json()?;

				self.terminator.sign_in(payload.token.clone());

				flow_event!(info, "Signed in.");

				Ok::<_, Error>(payload.token)
			})
			.await;

		span.record_status(result.as_ref().err().and_then(Error::status));
		obs::record_result(KIND, &result);

		result
	}

	/// Clears the stored credential and notifies subscribers.
	///
	/// Requests already waiting on a refresh are rejected with [`Error::SessionEnded`] once it
	/// settles; the credential it obtains is discarded.
	pub fn sign_out(&self) {
		self.terminator.sign_out();
	}
}

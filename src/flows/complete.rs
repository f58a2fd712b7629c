// self
use crate::{
	_prelude::*,
	auth::{AttemptStatus, CredentialRecord, StateToken},
	error::ValidationError,
	exchange::{ClientSecret, ExchangeRequest, TransportErrorMapper},
	flows::{CallbackParams, FlowEngine},
	http::TokenHttpClient,
	normalize,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{AttemptStore, TransitionOutcome},
};

// Marks a claimed attempt as failed if the exchange future is dropped before it settles.
struct ExchangeGuard<'a> {
	attempts: &'a dyn AttemptStore,
	state: &'a StateToken,
	armed: bool,
}
impl<'a> ExchangeGuard<'a> {
	fn arm(attempts: &'a dyn AttemptStore, state: &'a StateToken) -> Self {
		Self { attempts, state, armed: true }
	}

	fn disarm(mut self) {
		self.armed = false;
	}
}
impl Drop for ExchangeGuard<'_> {
	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	fn drop(&mut self) {
		if !self.armed {
			return;
		}

		match self.attempts.abandon_exchange(self.state.as_str()) {
			Ok(TransitionOutcome::Updated(attempt)) => obs::flow_event!(
				warn,
				provider = %attempt.provider,
				"exchange dropped before settling; attempt marked failed"
			),
			Ok(_) => {},
			Err(err) => obs::flow_event!(
				error,
				error = %err,
				"dropped exchange could not be marked failed"
			),
		}
	}
}

impl<C, M> FlowEngine<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Validates the callback, exchanges its code, and normalizes the provider response.
	///
	/// The attempt is consumed before the provider is contacted, so a failed exchange cannot
	/// be repeated through this method. Callers that want to retry a
	/// [`TransportFailure`](crate::error::ExchangeError::TransportFailure) drive
	/// [`FlowEngine::validate_callback`], [`TokenExchanger::exchange`], and
	/// [`normalize::normalize`] themselves.
	///
	/// Dropping the returned future mid-exchange moves the attempt to
	/// [`AttemptStatus::ExchangeFailed`] through [`AttemptStore::abandon_exchange`].
	///
	/// [`TokenExchanger::exchange`]: crate::exchange::TokenExchanger::exchange
	pub async fn complete_authorization(
		&self,
		issued: &StateToken,
		callback: &CallbackParams,
		client_secret: &ClientSecret,
	) -> Result<CredentialRecord> {
		const KIND: FlowKind = FlowKind::CompleteAuthorization;

		let span = FlowSpan::without_provider(KIND, "complete_authorization");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let now = OffsetDateTime::now_utc();
				let attempt = self.consume(issued, &callback.state, now).await?;
				let config = self.registry.resolve(attempt.provider.as_str())?;
				let claimed = self
					.attempts
					.compare_and_transition(
						issued.as_str(),
						AttemptStatus::Validated,
						AttemptStatus::Exchanging,
					)
					.await?;

				if !claimed.is_updated() {
					return Err(ValidationError::StateAlreadyUsed.into());
				}

				let guard = ExchangeGuard::arm(&*self.attempts, issued);

				let request = ExchangeRequest {
					code: &callback.code,
					redirect_uri: &attempt.redirect_uri,
					client_id: &attempt.client_id,
					client_secret,
					pkce_verifier: attempt.pkce_verifier(),
				};
				let record = match self.exchanger.exchange(&config, request).await {
					Ok(raw) => normalize::normalize(&config, raw).map_err(Error::from),
					Err(err) => Err(err.into()),
				};
				let next = if record.is_ok() {
					AttemptStatus::Succeeded
				} else {
					AttemptStatus::ExchangeFailed
				};

				self.settle(issued, next).await;
				guard.disarm();

				if record.is_ok() {
					obs::flow_event!(info, provider = %config.id, "authorization completed");
				}

				record
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	// The exchange outcome is returned even when bookkeeping fails.
	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	async fn settle(&self, issued: &StateToken, next: AttemptStatus) {
		match self
			.attempts
			.compare_and_transition(issued.as_str(), AttemptStatus::Exchanging, next)
			.await
		{
			Ok(TransitionOutcome::Updated(_)) => {},
			Ok(outcome) => obs::flow_event!(
				warn,
				?outcome,
				status = next.as_str(),
				"attempt left the exchanging state before the exchange settled"
			),
			Err(err) => obs::flow_event!(
				error,
				error = %err,
				status = next.as_str(),
				"attempt outcome could not be recorded"
			),
		}
	}
}

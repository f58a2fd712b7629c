//! Callback parsing and one-shot state validation.

// crates.io
use oauth2::AuthorizationCode;
// self
use crate::{
	_prelude::*,
	auth::{AttemptStatus, AuthAttempt, ProviderId, StateToken},
	error::{CallbackError, ValidationError},
	exchange::TransportErrorMapper,
	flows::FlowEngine,
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TransitionOutcome,
};

/// Query parameters delivered to the redirect URI.
#[derive(Debug)]
pub struct CallbackParams {
	/// Authorization code; redacted in `Debug` output.
	pub code: AuthorizationCode,
	/// State echoed back by the provider.
	pub state: String,
}
impl CallbackParams {
	/// Wraps already-extracted callback values.
	pub fn new(code: impl Into<String>, state: impl Into<String>) -> Self {
		Self { code: AuthorizationCode::new(code.into()), state: state.into() }
	}

	/// Parses a raw query string, with or without the leading `?`.
	///
	/// A provider `error` wins over any other parameter. Empty values count as missing.
	pub fn from_query(query: &str) -> Result<Self, CallbackError> {
		let query = query.strip_prefix('?').unwrap_or(query);
		let mut code = None;
		let mut state = None;
		let mut error = None;
		let mut description = None;

		for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
			if value.is_empty() {
				continue;
			}

			let slot = match name.as_ref() {
				"code" => &mut code,
				"state" => &mut state,
				"error" => &mut error,
				"error_description" => &mut description,
				_ => continue,
			};

			slot.get_or_insert_with(|| value.into_owned());
		}

		if let Some(error) = error {
			return Err(CallbackError::ProviderDenied { error, description });
		}

		let state = state.ok_or(CallbackError::MissingState)?;
		let code = code.ok_or(CallbackError::MissingCode)?;

		Ok(Self::new(code, state))
	}

	/// Parses the query component of a full callback URL.
	pub fn from_url(url: &Url) -> Result<Self, CallbackError> {
		Self::from_query(url.query().unwrap_or_default())
	}
}

impl<C, M> FlowEngine<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Validates `returned` against the attempt registered under `issued` and consumes it.
	///
	/// `issued` is the token the caller stored when the flow started; `returned` is the value
	/// the provider echoed back. Succeeds at most once per attempt.
	pub async fn validate_callback(
		&self,
		issued: &StateToken,
		returned: &str,
	) -> Result<AuthAttempt> {
		self.validate_callback_at(issued, returned, OffsetDateTime::now_utc()).await
	}

	/// Same as [`FlowEngine::validate_callback`] with an explicit clock reading.
	pub async fn validate_callback_at(
		&self,
		issued: &StateToken,
		returned: &str,
		now: OffsetDateTime,
	) -> Result<AuthAttempt> {
		const KIND: FlowKind = FlowKind::ValidateCallback;

		let span = FlowSpan::without_provider(KIND, "validate_callback");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.consume(issued, returned, now)).await;

		obs::record_flow_result(KIND, &result);

		result
	}

	pub(super) async fn consume(
		&self,
		issued: &StateToken,
		returned: &str,
		now: OffsetDateTime,
	) -> Result<AuthAttempt> {
		let Some(attempt) = self.attempts.get(issued.as_str()).await? else {
			return Err(reject(ValidationError::StateUnknown, None));
		};
		let provider = Some(&attempt.provider);

		FlowSpan::record_provider(attempt.provider.as_str());

		if attempt.status.is_consumed() {
			return Err(reject(ValidationError::StateAlreadyUsed, provider));
		}

		let (next, failure) = if attempt.is_expired_at(now, self.settings.attempt_ttl) {
			(AttemptStatus::Expired, Some(ValidationError::StateExpired))
		} else if !states_match(issued.as_str(), returned) {
			(AttemptStatus::Mismatched, Some(ValidationError::StateMismatch))
		} else {
			(AttemptStatus::Validated, None)
		};
		let outcome = self
			.attempts
			.compare_and_transition(issued.as_str(), AttemptStatus::AwaitingCallback, next)
			.await?;

		match (outcome, failure) {
			(TransitionOutcome::Updated(attempt), None) => {
				obs::flow_event!(info, provider = %attempt.provider, "callback state validated");

				Ok(attempt)
			},
			(TransitionOutcome::Updated(_), Some(err)) => Err(reject(err, provider)),
			// A concurrent callback landed on the same terminal verdict first.
			(TransitionOutcome::StatusMismatch(status), Some(err)) if status == next =>
				Err(reject(err, provider)),
			(TransitionOutcome::StatusMismatch(_), _) =>
				Err(reject(ValidationError::StateAlreadyUsed, provider)),
			(TransitionOutcome::Missing, _) => Err(reject(ValidationError::StateUnknown, provider)),
		}
	}
}

fn reject(err: ValidationError, provider: Option<&ProviderId>) -> Error {
	let provider = provider.map(|id| id.as_str()).unwrap_or_default();

	match err {
		ValidationError::StateMismatch =>
			obs::flow_event!(warn, provider, "callback state does not match the issued state"),
		ValidationError::StateExpired =>
			obs::flow_event!(warn, provider, "callback arrived after the attempt expired"),
		ValidationError::StateAlreadyUsed =>
			obs::flow_event!(warn, provider, "callback replayed a consumed attempt"),
		ValidationError::StateUnknown =>
			obs::flow_event!(warn, provider, "callback references an unknown attempt"),
	}

	#[cfg(not(feature = "tracing"))]
	let _ = provider;

	err.into()
}

// Timing does not depend on where the inputs first differ.
fn states_match(issued: &str, returned: &str) -> bool {
	let (issued, returned) = (issued.as_bytes(), returned.as_bytes());

	issued.len() == returned.len()
		&& issued.iter().zip(returned).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

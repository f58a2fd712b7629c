//! Consent URL construction and attempt registration.

// self
use crate::{
	_prelude::*,
	auth::{AttemptStatus, AuthAttempt, ClientId, PkcePair, ProviderId, RedirectUri, StateToken},
	error::ConfigError,
	exchange::TransportErrorMapper,
	flows::FlowEngine,
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ConsentValues, ProviderConfig},
};

/// Handshake data returned by [`FlowEngine::start_authorization`].
///
/// Keep [`AuthorizationSession::state`] in the user's session; it is the key that
/// [`FlowEngine::complete_authorization`] validates the callback against.
#[derive(Clone, Debug)]
pub struct AuthorizationSession {
	/// Provider the consent URL targets.
	pub provider: ProviderId,
	/// State token embedded in the consent URL.
	pub state: StateToken,
	/// Fully encoded consent URL to redirect the user to.
	pub consent_url: Url,
	/// Instant after which the callback is rejected as expired.
	pub expires_at: OffsetDateTime,
}

/// Renders the consent URL for `config`.
///
/// Providers that require PKCE must receive `pkce`; its challenge is appended after the
/// templated parameters. Identical inputs always produce the identical URL.
pub fn build_consent_url(
	config: &ProviderConfig,
	client_id: &ClientId,
	redirect_uri: &RedirectUri,
	state: &StateToken,
	pkce: Option<&PkcePair>,
) -> Result<Url, ConfigError> {
	let scope = config.scope_param();
	let values = ConsentValues {
		client_id: client_id.as_str(),
		redirect_uri: redirect_uri.as_str(),
		state: state.as_str(),
		scope: scope.as_deref(),
	};
	let url = match (pkce, config.quirks.pkce_required) {
		(Some(pkce), _) => config.authorization.render(
			&values,
			&[("code_challenge", pkce.challenge()), ("code_challenge_method", pkce.method().as_str())],
		)?,
		(None, true) =>
			return Err(ConfigError::PkceRequired { provider: config.id.as_str().to_owned() }),
		(None, false) => config.authorization.render(&values, &[])?,
	};

	Ok(url)
}

impl<C, M> FlowEngine<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Mints a state token, renders the consent URL, and registers the attempt.
	pub async fn start_authorization(
		&self,
		provider: &str,
		client_id: &ClientId,
		redirect_uri: &RedirectUri,
	) -> Result<AuthorizationSession> {
		const KIND: FlowKind = FlowKind::StartAuthorization;

		let span = FlowSpan::new(KIND, "start_authorization", provider);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let config = self.registry.resolve(provider)?;
				let state = self.state_generator.generate();
				let pkce = config.quirks.pkce_required.then(PkcePair::generate);
				let consent_url =
					build_consent_url(&config, client_id, redirect_uri, &state, pkce.as_ref())?;
				let created_at = OffsetDateTime::now_utc();
				let ttl = self.settings.attempt_ttl;
				let expires_at = created_at
					.checked_add(ttl)
					.ok_or(ConfigError::AttemptTtlOutOfRange { ttl })?;
				let mut attempt = AuthAttempt::new(
					state.clone(),
					config.id.clone(),
					client_id.clone(),
					redirect_uri.clone(),
					created_at,
				);

				if let Some(pkce) = &pkce {
					attempt = attempt.with_pkce(pkce);
				}

				attempt.status = AttemptStatus::AwaitingCallback;

				self.attempts.put(attempt).await?;

				obs::flow_event!(info, provider = %config.id, "authorization attempt registered");

				Ok(AuthorizationSession {
					provider: config.id.clone(),
					state,
					consent_url,
					expires_at,
				})
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}
}

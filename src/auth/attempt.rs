//! Authorization attempts and their lifecycle state machine.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, PkcePair, ProviderId, RedirectUri, StateToken, TokenSecret},
};

/// Lifecycle of one authorization attempt.
///
/// ```text
/// Created -> AwaitingCallback -> Validated -> Exchanging -> Succeeded | ExchangeFailed
///                             -> Expired | Mismatched | Replayed
/// ```
///
/// Terminal states never transition again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
	/// Attempt minted but not yet registered with the store.
	Created,
	/// Consent URL handed out; waiting for the provider redirect.
	AwaitingCallback,
	/// Callback state matched; the attempt is consumed.
	Validated,
	/// Token exchange in flight.
	Exchanging,
	/// Token exchange produced a credential record.
	Succeeded,
	/// Token exchange or normalization failed.
	ExchangeFailed,
	/// Callback arrived after the attempt TTL.
	Expired,
	/// Callback carried a different state value.
	Mismatched,
	/// Callback replayed a state that was already consumed.
	///
	/// Reserved for external stores that track replays. [`FlowEngine`] and [`MemoryStore`]
	/// never enter it; they report a replay as
	/// [`ValidationError::StateAlreadyUsed`](crate::error::ValidationError::StateAlreadyUsed)
	/// and leave the consumed attempt untouched.
	///
	/// [`FlowEngine`]: crate::flows::FlowEngine
	/// [`MemoryStore`]: crate::store::MemoryStore
	Replayed,
}
impl AttemptStatus {
	/// Returns a stable label suitable for logs and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			AttemptStatus::Created => "created",
			AttemptStatus::AwaitingCallback => "awaiting_callback",
			AttemptStatus::Validated => "validated",
			AttemptStatus::Exchanging => "exchanging",
			AttemptStatus::Succeeded => "succeeded",
			AttemptStatus::ExchangeFailed => "exchange_failed",
			AttemptStatus::Expired => "expired",
			AttemptStatus::Mismatched => "mismatched",
			AttemptStatus::Replayed => "replayed",
		}
	}

	/// Returns `true` for states that admit no further transitions.
	pub const fn is_terminal(self) -> bool {
		matches!(
			self,
			AttemptStatus::Succeeded
				| AttemptStatus::ExchangeFailed
				| AttemptStatus::Expired
				| AttemptStatus::Mismatched
				| AttemptStatus::Replayed
		)
	}

	/// Returns `true` once a callback has claimed the attempt, successfully or not.
	pub const fn is_consumed(self) -> bool {
		!matches!(self, AttemptStatus::Created | AttemptStatus::AwaitingCallback)
	}

	/// Checks whether the state machine permits moving from `self` to `next`.
	///
	/// `AwaitingCallback -> Replayed` is permitted for external stores only; see
	/// [`AttemptStatus::Replayed`].
	pub const fn can_transition_to(self, next: AttemptStatus) -> bool {
		matches!(
			(self, next),
			(AttemptStatus::Created, AttemptStatus::AwaitingCallback)
				| (
					AttemptStatus::AwaitingCallback,
					AttemptStatus::Validated
						| AttemptStatus::Expired
						| AttemptStatus::Mismatched
						| AttemptStatus::Replayed
				) | (AttemptStatus::Validated, AttemptStatus::Exchanging)
				| (AttemptStatus::Exchanging, AttemptStatus::Succeeded | AttemptStatus::ExchangeFailed)
		)
	}
}
impl Display for AttemptStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One outstanding authorization-code attempt, keyed by its state token.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthAttempt {
	/// Anti-forgery token issued in the consent URL.
	pub state: StateToken,
	/// Provider the attempt targets.
	pub provider: ProviderId,
	/// Client identifier used in the consent URL.
	pub client_id: ClientId,
	/// Redirect URI used in the consent URL; the exchange must repeat it verbatim.
	pub redirect_uri: RedirectUri,
	/// Instant the attempt was created.
	pub created_at: OffsetDateTime,
	/// Current lifecycle status.
	pub status: AttemptStatus,
	pkce_verifier: Option<TokenSecret>,
}
impl AuthAttempt {
	/// Creates an attempt in the [`AttemptStatus::Created`] state.
	pub fn new(
		state: StateToken,
		provider: ProviderId,
		client_id: ClientId,
		redirect_uri: RedirectUri,
		created_at: OffsetDateTime,
	) -> Self {
		Self {
			state,
			provider,
			client_id,
			redirect_uri,
			created_at,
			status: AttemptStatus::Created,
			pkce_verifier: None,
		}
	}

	/// Attaches the PKCE verifier that must accompany the code exchange.
	pub fn with_pkce(mut self, pkce: &PkcePair) -> Self {
		self.pkce_verifier = Some(TokenSecret::new(pkce.verifier()));

		self
	}

	/// PKCE verifier for the exchange, when the provider requires one.
	pub fn pkce_verifier(&self) -> Option<&TokenSecret> {
		self.pkce_verifier.as_ref()
	}

	/// Instant after which callbacks for this attempt are rejected.
	///
	/// Returns `None` when `created_at + ttl` falls outside the representable date range.
	pub fn expires_at(&self, ttl: Duration) -> Option<OffsetDateTime> {
		self.created_at.checked_add(ttl)
	}

	/// Returns `true` when `ttl` has elapsed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime, ttl: Duration) -> bool {
		self.expires_at(ttl).is_some_and(|expires_at| instant >= expires_at)
	}
}
impl Debug for AuthAttempt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthAttempt")
			.field("state", &self.state)
			.field("provider", &self.provider)
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("created_at", &self.created_at)
			.field("status", &self.status)
			.field("pkce", &self.pkce_verifier.is_some())
			.finish()
	}
}

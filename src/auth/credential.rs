//! Normalized credential records and the redacting secret wrapper they carry.

// self
use crate::{_prelude::*, auth::ProviderId};

/// Opaque provider fields carried alongside the canonical credential values.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Provider-independent credentials produced by a successful authorization-code exchange.
///
/// Records are only minted by [`normalize`](crate::normalize::normalize) and never change
/// afterwards; ownership moves to whichever credential store the caller uses.
#[derive(Clone, Serialize)]
pub struct CredentialRecord {
	provider: ProviderId,
	access_token: TokenSecret,
	refresh_token: Option<TokenSecret>,
	issued_at: OffsetDateTime,
	expires_at: Option<OffsetDateTime>,
	extra_fields: ExtraFields,
}
impl CredentialRecord {
	pub(crate) fn new(
		provider: ProviderId,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
		issued_at: OffsetDateTime,
		expires_at: Option<OffsetDateTime>,
		extra_fields: ExtraFields,
	) -> Self {
		Self { provider, access_token, refresh_token, issued_at, expires_at, extra_fields }
	}

	/// Provider that issued the credentials.
	pub fn provider(&self) -> &ProviderId {
		&self.provider
	}

	/// Access token secret.
	pub fn access_token(&self) -> &TokenSecret {
		&self.access_token
	}

	/// Refresh token secret, when the provider issued one.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref()
	}

	/// Instant the token response was normalized.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// Access token expiry, when the provider reported one.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_at
	}

	/// Provider fields that were not projected into canonical values.
	pub fn extra_fields(&self) -> &ExtraFields {
		&self.extra_fields
	}

	/// Returns `true` when an expiry is known and `instant` is at or past it.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expiry| instant >= expiry)
	}
}
impl Debug for CredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialRecord")
			.field("provider", &self.provider)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("extra_fields", &self.extra_fields.keys().collect::<Vec<_>>())
			.finish()
	}
}

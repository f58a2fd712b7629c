//! Error taxonomy shared by the consent builder, callback validator, exchanger, and normalizer.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, ScopeValidationError},
	provider::{CanonicalField, JsonPathError, ProviderConfigError, TemplateError},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by the flow engine.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Attempt store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem; fatal at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Callback state did not validate; the user must restart the flow.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Callback query could not be interpreted.
	#[error(transparent)]
	Callback(#[from] CallbackError),
	/// Token endpoint call failed.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	/// Token endpoint response could not be mapped into a credential record.
	#[error(transparent)]
	Normalization(#[from] NormalizationError),
}
impl Error {
	/// Returns `true` when the caller may retry the same operation once.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Error::Exchange(err) if err.is_retryable())
	}
}

/// Configuration and validation failures; these indicate a deployment bug, not user error.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Consent URL template is malformed or lacks a required placeholder.
	#[error(transparent)]
	Template(#[from] TemplateError),
	/// Provider configuration failed validation.
	#[error(transparent)]
	Provider(#[from] ProviderConfigError),
	/// Registry source could not be parsed.
	#[error("Provider registry is invalid.")]
	InvalidRegistry {
		/// Structured parsing failure including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// No provider is registered under the requested identifier.
	#[error("Provider `{provider}` is not registered.")]
	UnknownProvider {
		/// Requested provider identifier.
		provider: String,
	},
	/// Two registry entries share one identifier.
	#[error("Provider `{provider}` is registered more than once.")]
	DuplicateProvider {
		/// Duplicated provider identifier.
		provider: String,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint URL cannot be parsed.
	#[error("Endpoint `{url}` is invalid.")]
	InvalidEndpoint {
		/// Offending URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Client or provider identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// Scope entry failed validation.
	#[error(transparent)]
	InvalidScope(#[from] ScopeValidationError),
	/// Response field path failed validation.
	#[error(transparent)]
	InvalidFieldPath(#[from] JsonPathError),
	/// Provider requires PKCE but no challenge was supplied.
	#[error("Provider `{provider}` requires a PKCE challenge.")]
	PkceRequired {
		/// Provider identifier.
		provider: String,
	},
	/// The attempt lifetime pushes expiry outside the representable date range.
	#[error("Attempt lifetime of {ttl} overflows the supported date range.")]
	AttemptTtlOutOfRange {
		/// Configured lifetime.
		ttl: Duration,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Reasons a callback's `state` is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Returned state differs from the one issued for the attempt.
	#[error("Callback state does not match the issued state.")]
	StateMismatch,
	/// Attempt TTL elapsed before the callback arrived.
	#[error("Authorization attempt expired before the callback arrived.")]
	StateExpired,
	/// Attempt was already consumed by an earlier callback.
	#[error("Authorization attempt was already used.")]
	StateAlreadyUsed,
	/// No outstanding attempt exists for the issued state.
	#[error("No authorization attempt exists for the issued state.")]
	StateUnknown,
}

/// Problems with the redirect query delivered by the provider.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CallbackError {
	/// Provider redirected with an OAuth error instead of a code.
	#[error("Provider denied the authorization request: {error}.")]
	ProviderDenied {
		/// RFC 6749 `error` code.
		error: String,
		/// Optional human-readable `error_description`.
		description: Option<String>,
	},
	/// Callback carried no `code` parameter.
	#[error("Callback is missing the `code` parameter.")]
	MissingCode,
	/// Callback carried no `state` parameter.
	#[error("Callback is missing the `state` parameter.")]
	MissingState,
}

/// Token endpoint failures.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Provider answered with a non-2xx status; not retried.
	#[error("Token endpoint rejected the exchange with HTTP {status}.")]
	ProviderRejected {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
		/// RFC 6749 `error` field, when the body carries one.
		oauth_error: Option<String>,
		/// RFC 6749 `error_description` field, when the body carries one.
		error_description: Option<String>,
		/// Retry-After hint from the provider, if supplied.
		retry_after: Option<Duration>,
	},
	/// Network-level failure (timeout, reset, DNS, TLS); the caller may retry once.
	#[error("Transport failure while calling the token endpoint.")]
	TransportFailure {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
		/// Whether the failure was a timeout.
		timed_out: bool,
	},
	/// Provider answered 2xx with a body that is not a JSON object.
	#[error("Token endpoint returned a malformed body with HTTP {status}.")]
	MalformedResponse {
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token request could not be assembled.
	#[error("Token request could not be constructed.")]
	Request(#[from] oauth2::http::Error),
}
impl ExchangeError {
	/// Wraps a transport failure.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error, timed_out: bool) -> Self {
		Self::TransportFailure { source: Box::new(src), timed_out }
	}

	/// Returns `true` only for transport failures.
	pub fn is_retryable(&self) -> bool {
		matches!(self, ExchangeError::TransportFailure { .. })
	}
}

/// Token responses that cannot be projected into a credential record.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum NormalizationError {
	/// A required canonical field is absent; this points at a provider integration bug.
	#[error("Token response is missing `{field}` at `{path}`.")]
	MissingRequiredField {
		/// Canonical field that could not be located.
		field: CanonicalField,
		/// Configured JSON path.
		path: String,
	},
	/// A mapped field is present but unusable.
	#[error("Token response field `{field}` at `{path}` is invalid: {reason}.")]
	InvalidField {
		/// Canonical field being projected.
		field: CanonicalField,
		/// Configured JSON path.
		path: String,
		/// Why the value was rejected.
		reason: String,
	},
}

//! Declarative provider configuration.
//!
//! Per-provider differences are pure data: a [`ProviderConfig`] names the consent URL
//! template, token endpoint, scopes, token-request quirks, and the JSON paths the normalizer
//! reads. The [`ProviderRegistry`] resolves a provider identifier to its configuration and is
//! never mutated after construction.

/// Builder API for assembling provider configurations.
pub mod builder;
/// Built-in provider catalog.
pub mod catalog;
/// Canonical token fields and the JSON paths that locate them.
pub mod fields;
/// Provider registry.
pub mod registry;
/// Consent URL templates.
pub mod template;

pub use builder::*;
pub use fields::*;
pub use registry::*;
pub use template::*;

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeList},
};

/// Where the client credentials travel on the token request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// `client_id`/`client_secret` in the request body.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Body encoding of the token request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRequestFormat {
	#[default]
	/// `application/x-www-form-urlencoded`.
	Form,
	/// `application/json`.
	Json,
}

/// Provider-specific quirks that influence URL rendering and the token request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Character used to join scopes into the `scope` parameter.
	pub scope_delimiter: char,
	/// Whether the consent URL carries a PKCE challenge and the exchange a verifier.
	pub pkce_required: bool,
	/// Placement of client credentials on the token request.
	pub client_auth_method: ClientAuthMethod,
	/// Token request body encoding.
	pub token_request_format: TokenRequestFormat,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self {
			scope_delimiter: ' ',
			pkce_required: false,
			client_auth_method: ClientAuthMethod::default(),
			token_request_format: TokenRequestFormat::default(),
		}
	}
}

/// Immutable provider configuration consumed by the flow engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProviderConfigBuilder")]
pub struct ProviderConfig {
	/// Registry identifier.
	pub id: ProviderId,
	/// Parsed consent URL template.
	pub authorization: ConsentTemplate,
	/// Token endpoint receiving the code exchange.
	pub token_endpoint: Url,
	/// Ordered scopes requested during consent.
	pub scopes: ScopeList,
	/// Rendering and token-request quirks.
	pub quirks: ProviderQuirks,
	/// Canonical field locations inside the token response.
	pub response_fields: ResponseFieldMap,
}
impl ProviderConfig {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderConfigBuilder {
		ProviderConfigBuilder::new(id)
	}

	/// Returns the `scope` parameter value, or `None` when no scopes are configured.
	pub fn scope_param(&self) -> Option<String> {
		self.scopes.join(self.quirks.scope_delimiter)
	}
}

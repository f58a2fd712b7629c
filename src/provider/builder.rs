// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeList},
	provider::{
		CanonicalField, ClientAuthMethod, ConsentTemplate, Placeholder, ProviderConfig,
		ProviderQuirks, ResponseFieldMap, TokenRequestFormat,
	},
};

/// Errors raised while constructing or validating provider configurations.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderConfigError {
	/// Consent URL template is required.
	#[error("Provider `{provider}` is missing its authorization template.")]
	MissingAuthorizationTemplate {
		/// Provider being built.
		provider: ProviderId,
	},
	/// Token endpoint is required.
	#[error("Provider `{provider}` is missing its token endpoint.")]
	MissingTokenEndpoint {
		/// Provider being built.
		provider: ProviderId,
	},
	/// Endpoints must use HTTPS.
	#[error("Provider `{provider}` token endpoint must use HTTPS: {url}.")]
	InsecureTokenEndpoint {
		/// Provider being built.
		provider: ProviderId,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Declared scopes need somewhere to go in the consent URL.
	#[error("Provider `{provider}` declares scopes but its template has no `{{scope}}` placeholder.")]
	ScopeWithoutPlaceholder {
		/// Provider being built.
		provider: ProviderId,
	},
	/// Reject scope delimiters that are control characters.
	#[error("Provider `{provider}` scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Provider being built.
		provider: ProviderId,
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
	/// The access token must be mapped.
	#[error("Provider `{provider}` does not map the `access_token` field.")]
	UnmappedAccessToken {
		/// Provider being built.
		provider: ProviderId,
	},
}

/// Builder for [`ProviderConfig`] values.
///
/// The builder is also the serde shape of a provider configuration; deserializing a
/// [`ProviderConfig`] runs the same validation as [`ProviderConfigBuilder::build`].
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfigBuilder {
	/// Identifier for the configuration being constructed.
	pub id: ProviderId,
	/// Consent URL template.
	#[serde(default)]
	pub authorization: Option<ConsentTemplate>,
	/// Token endpoint receiving the code exchange.
	#[serde(default)]
	pub token_endpoint: Option<Url>,
	/// Ordered scopes requested during consent.
	#[serde(default)]
	pub scopes: ScopeList,
	/// Provider-specific quirks.
	#[serde(default)]
	pub quirks: ProviderQuirks,
	/// Canonical field locations; a supplied map replaces the default one entirely.
	#[serde(default)]
	pub response_fields: ResponseFieldMap,
}
impl ProviderConfigBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			authorization: None,
			token_endpoint: None,
			scopes: ScopeList::default(),
			quirks: ProviderQuirks::default(),
			response_fields: ResponseFieldMap::default(),
		}
	}

	/// Sets the consent URL template.
	pub fn authorization(mut self, template: ConsentTemplate) -> Self {
		self.authorization = Some(template);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the requested scopes.
	pub fn scopes(mut self, scopes: ScopeList) -> Self {
		self.scopes = scopes;

		self
	}

	/// Overrides the scope delimiter.
	pub fn scope_delimiter(mut self, delimiter: char) -> Self {
		self.quirks.scope_delimiter = delimiter;

		self
	}

	/// Requires PKCE for the authorization-code exchange.
	pub fn pkce_required(mut self, required: bool) -> Self {
		self.quirks.pkce_required = required;

		self
	}

	/// Overrides where client credentials are sent.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.quirks.client_auth_method = method;

		self
	}

	/// Overrides the token request body encoding.
	pub fn token_request_format(mut self, format: TokenRequestFormat) -> Self {
		self.quirks.token_request_format = format;

		self
	}

	/// Overrides the canonical field map.
	pub fn response_fields(mut self, fields: ResponseFieldMap) -> Self {
		self.response_fields = fields;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProviderConfig, ProviderConfigError> {
		let authorization = self
			.authorization
			.ok_or_else(|| ProviderConfigError::MissingAuthorizationTemplate {
				provider: self.id.clone(),
			})?;
		let token_endpoint = self
			.token_endpoint
			.ok_or_else(|| ProviderConfigError::MissingTokenEndpoint { provider: self.id.clone() })?;
		let config = ProviderConfig {
			id: self.id,
			authorization,
			token_endpoint,
			scopes: self.scopes,
			quirks: self.quirks,
			response_fields: self.response_fields,
		};

		config.validate()?;

		Ok(config)
	}
}
impl TryFrom<ProviderConfigBuilder> for ProviderConfig {
	type Error = ProviderConfigError;

	fn try_from(builder: ProviderConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

impl ProviderConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ProviderConfigError> {
		if self.token_endpoint.scheme() != "https" {
			return Err(ProviderConfigError::InsecureTokenEndpoint {
				provider: self.id.clone(),
				url: self.token_endpoint.to_string(),
			});
		}
		if !self.scopes.is_empty() && !self.authorization.has_placeholder(Placeholder::Scope) {
			return Err(ProviderConfigError::ScopeWithoutPlaceholder { provider: self.id.clone() });
		}
		if self.quirks.scope_delimiter.is_control() {
			return Err(ProviderConfigError::InvalidScopeDelimiter {
				provider: self.id.clone(),
				delimiter: self.quirks.scope_delimiter,
			});
		}
		if self.response_fields.path(CanonicalField::AccessToken).is_none() {
			return Err(ProviderConfigError::UnmappedAccessToken { provider: self.id.clone() });
		}

		Ok(())
	}
}

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeList},
	error::ConfigError,
	provider::{
		CanonicalField, ClientAuthMethod, ConsentTemplate, JsonPath, ProviderConfig,
		ResponseFieldMap, TokenRequestFormat,
	},
};

/// Identifiers of every built-in provider, in catalog order.
pub const PROVIDER_IDS: [&str; 10] = [
	"strava",
	"github",
	"google",
	"slack",
	"hubspot",
	"pipedrive",
	"asana",
	"notion",
	"airtable",
	"linkedin",
];

struct Entry {
	id: &'static str,
	authorization: &'static str,
	token_endpoint: &'static str,
	scopes: &'static [&'static str],
	scope_delimiter: char,
	client_auth_method: ClientAuthMethod,
	token_request_format: TokenRequestFormat,
	pkce_required: bool,
	// `None` keeps the RFC 6749 defaults.
	response_fields: Option<&'static [(CanonicalField, &'static str)]>,
}
impl Entry {
	const fn new(
		id: &'static str,
		authorization: &'static str,
		token_endpoint: &'static str,
		scopes: &'static [&'static str],
	) -> Self {
		Self {
			id,
			authorization,
			token_endpoint,
			scopes,
			scope_delimiter: ' ',
			client_auth_method: ClientAuthMethod::ClientSecretPost,
			token_request_format: TokenRequestFormat::Form,
			pkce_required: false,
			response_fields: None,
		}
	}

	const fn delimiter(mut self, delimiter: char) -> Self {
		self.scope_delimiter = delimiter;

		self
	}

	const fn basic_auth(mut self) -> Self {
		self.client_auth_method = ClientAuthMethod::ClientSecretBasic;

		self
	}

	const fn json_body(mut self) -> Self {
		self.token_request_format = TokenRequestFormat::Json;

		self
	}

	const fn pkce(mut self) -> Self {
		self.pkce_required = true;

		self
	}

	const fn fields(mut self, fields: &'static [(CanonicalField, &'static str)]) -> Self {
		self.response_fields = Some(fields);

		self
	}

	fn build(&self) -> Result<ProviderConfig, ConfigError> {
		let fields = match self.response_fields {
			None => ResponseFieldMap::default(),
			Some(pairs) => pairs.iter().try_fold(ResponseFieldMap::empty(), |map, (field, path)| {
				JsonPath::parse(*path).map(|path| map.with(*field, path))
			})?,
		};
		let token_endpoint = Url::parse(self.token_endpoint).map_err(|source| {
			ConfigError::InvalidEndpoint { url: self.token_endpoint.into(), source }
		})?;
		let scopes = ScopeList::new(self.scopes.iter().copied())?;
		let config = ProviderConfig::builder(ProviderId::new(self.id)?)
			.authorization(ConsentTemplate::parse(self.authorization)?)
			.token_endpoint(token_endpoint)
			.scopes(scopes)
			.scope_delimiter(self.scope_delimiter)
			.client_auth_method(self.client_auth_method)
			.token_request_format(self.token_request_format)
			.pkce_required(self.pkce_required)
			.response_fields(fields)
			.build()?;

		Ok(config)
	}
}

const CATALOG: [Entry; 10] = [
	Entry::new(
		"strava",
		"https://www.strava.com/oauth/authorize?client_id={client_id}&redirect_uri={redirect_uri}&state={state}&scope={scope}&response_type={response_type}",
		"https://www.strava.com/oauth/token",
		&["activity:read_all"],
	)
	.delimiter(',')
	.fields(&[
		(CanonicalField::AccessToken, "access_token"),
		(CanonicalField::RefreshToken, "refresh_token"),
		(CanonicalField::ExpiresIn, "expires_in"),
		(CanonicalField::ExpiresAt, "expires_at"),
	]),
	Entry::new(
		"github",
		"https://github.com/login/oauth/authorize?client_id={client_id}&redirect_uri={redirect_uri}&scope={scope}&state={state}&response_type={response_type}",
		"https://github.com/login/oauth/access_token",
		&["repo", "read:org", "read:repo_hook", "read:user", "read:discussion", "workflow"],
	),
	Entry::new(
		"google",
		"https://accounts.google.com/o/oauth2/v2/auth?client_id={client_id}&redirect_uri={redirect_uri}&response_type={response_type}&scope={scope}&access_type=offline&state={state}&include_granted_scopes=true&prompt=consent",
		"https://oauth2.googleapis.com/token",
		&["https://www.googleapis.com/auth/analytics.readonly"],
	),
	Entry::new(
		"slack",
		"https://slack.com/oauth/v2/authorize?client_id={client_id}&user_scope={scope}&redirect_uri={redirect_uri}&state={state}&response_type={response_type}",
		"https://slack.com/api/oauth.v2.access",
		&["channels:history", "channels:read", "groups:read", "users:read"],
	)
	.delimiter(',')
	.fields(&[
		(CanonicalField::AccessToken, "authed_user.access_token"),
		(CanonicalField::RefreshToken, "authed_user.refresh_token"),
		(CanonicalField::ExpiresIn, "authed_user.expires_in"),
	]),
	Entry::new(
		"hubspot",
		"https://app.hubspot.com/oauth/authorize?client_id={client_id}&redirect_uri={redirect_uri}&state={state}&scope={scope}&response_type={response_type}",
		"https://api.hubapi.com/oauth/v1/token",
		&["crm.objects.contacts.read", "crm.objects.companies.read", "crm.objects.deals.read"],
	),
	Entry::new(
		"pipedrive",
		"https://oauth.pipedrive.com/oauth/authorize?client_id={client_id}&redirect_uri={redirect_uri}&state={state}&response_type={response_type}",
		"https://oauth.pipedrive.com/oauth/token",
		&[],
	)
	.basic_auth(),
	Entry::new(
		"asana",
		"https://app.asana.com/-/oauth_authorize?client_id={client_id}&redirect_uri={redirect_uri}&response_type={response_type}&state={state}",
		"https://app.asana.com/-/oauth_token",
		&[],
	),
	Entry::new(
		"notion",
		"https://api.notion.com/v1/oauth/authorize?client_id={client_id}&redirect_uri={redirect_uri}&response_type={response_type}&owner=user&state={state}",
		"https://api.notion.com/v1/oauth/token",
		&[],
	)
	.basic_auth()
	.json_body()
	.fields(&[(CanonicalField::AccessToken, "access_token")]),
	Entry::new(
		"airtable",
		"https://airtable.com/oauth2/v1/authorize?client_id={client_id}&redirect_uri={redirect_uri}&response_type={response_type}&scope={scope}&state={state}",
		"https://airtable.com/oauth2/v1/token",
		&["data.records:read", "data.recordComments:read", "schema.bases:read"],
	)
	.basic_auth()
	.pkce(),
	Entry::new(
		"linkedin",
		"https://www.linkedin.com/oauth/v2/authorization?response_type={response_type}&client_id={client_id}&redirect_uri={redirect_uri}&state={state}&scope={scope}",
		"https://www.linkedin.com/oauth/v2/accessToken",
		&["r_ads", "r_ads_reporting", "r_basicprofile", "r_organization_social"],
	),
];

/// Builds every built-in provider configuration.
pub fn configs() -> Result<Vec<ProviderConfig>, ConfigError> {
	CATALOG.iter().map(Entry::build).collect()
}

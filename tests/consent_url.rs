// std
use std::collections::HashMap;
// self
use oauth2_consent::{
	auth::{ClientId, PkcePair, RedirectUri, StateToken},
	error::ConfigError,
	flows::build_consent_url,
	provider::ProviderRegistry,
};

const STRAVA_CONSENT_URL: &str = "https://www.strava.com/oauth/authorize?client_id=test_client_id&redirect_uri=https%3A%2F%2Fairbyte.io&state=state&scope=activity%3Aread_all&response_type=code";

fn registry() -> ProviderRegistry {
	ProviderRegistry::builtin().expect("Built-in registry should load.")
}

#[test]
fn strava_consent_url_is_byte_exact() {
	let config = registry().resolve("strava").expect("Strava should be registered.");
	let url = build_consent_url(
		&config,
		&ClientId::new("test_client_id").expect("Client identifier should be valid."),
		&RedirectUri::new("https://airbyte.io").expect("Redirect URI should be valid."),
		&StateToken::new("state").expect("State token should be valid."),
		None,
	)
	.expect("Strava consent URL should render.");

	assert_eq!(url.as_str(), STRAVA_CONSENT_URL);
}

#[test]
fn consent_url_parameters_decode_back_to_their_inputs() {
	let registry = registry();
	let client_id =
		ClientId::new("client/id+with&symbols").expect("Client identifier should be valid.");
	let redirect_uri = RedirectUri::new("https://app.example.com/oauth/callback?tenant=a&b=c")
		.expect("Redirect URI should be valid.");
	let state = StateToken::new("st&te=with%chars").expect("State token should be valid.");
	let pkce = PkcePair::generate();

	for id in registry.ids() {
		let config = registry.resolve(id.as_str()).expect("Listed provider should resolve.");
		let url = build_consent_url(&config, &client_id, &redirect_uri, &state, Some(&pkce))
			.expect("Consent URL should render for every built-in provider.");
		let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
		let param = |name: &str| pairs.get(name).map(String::as_str);

		assert_eq!(param("client_id"), Some(client_id.as_str()), "{id}");
		assert_eq!(param("redirect_uri"), Some(redirect_uri.as_str()), "{id}");
		assert_eq!(param("state"), Some(state.as_str()), "{id}");
		assert_eq!(param("response_type"), Some("code"), "{id}");
		assert_eq!(
			pairs.get("scope").cloned(),
			config.scopes.join(config.quirks.scope_delimiter),
			"{id}"
		);
		assert_eq!(param("code_challenge"), Some(pkce.challenge()), "{id}");
	}
}

#[test]
fn redirect_uris_are_not_normalized() {
	let config = registry().resolve("github").expect("GitHub should be registered.");
	let client_id = ClientId::new("abc").expect("Client identifier should be valid.");
	let state = StateToken::new("s").expect("State token should be valid.");

	for raw in ["https://airbyte.io", "https://airbyte.io/", "https://AIRBYTE.io:443/cb"] {
		let redirect_uri = RedirectUri::new(raw).expect("Redirect URI should be valid.");
		let url = build_consent_url(&config, &client_id, &redirect_uri, &state, None)
			.expect("Consent URL should render.");
		let returned = url
			.query_pairs()
			.find(|(name, _)| name == "redirect_uri")
			.map(|(_, value)| value.into_owned());

		assert_eq!(returned.as_deref(), Some(raw));
	}
}

#[test]
fn unknown_providers_are_configuration_errors() {
	assert!(matches!(
		registry().resolve("myspace"),
		Err(ConfigError::UnknownProvider { provider }) if provider == "myspace"
	));
}

#[cfg(feature = "reqwest")]
#[tokio::test]
async fn engine_renders_the_same_url_with_a_pinned_state() {
	// std
	use std::sync::Arc;
	// self
	use oauth2_consent::{flows::ReqwestFlowEngine, store::MemoryStore};

	let engine = ReqwestFlowEngine::new(registry(), Arc::new(MemoryStore::default()))
		.with_state_generator(|| StateToken::new("state").expect("State token should be valid."));
	let session = engine
		.start_authorization(
			"strava",
			&ClientId::new("test_client_id").expect("Client identifier should be valid."),
			&RedirectUri::new("https://airbyte.io").expect("Redirect URI should be valid."),
		)
		.await
		.expect("Authorization should start.");

	assert_eq!(session.consent_url.as_str(), STRAVA_CONSENT_URL);
	assert_eq!(session.state.as_str(), "state");
	assert_eq!(session.provider.as_str(), "strava");
	assert!(
		engine
			.start_authorization(
				"strava",
				&ClientId::new("test_client_id").expect("Client identifier should be valid."),
				&RedirectUri::new("https://airbyte.io").expect("Redirect URI should be valid."),
			)
			.await
			.is_err(),
		"A second attempt with the same state must be refused."
	);
}

#[cfg(feature = "reqwest")]
#[tokio::test]
async fn unrepresentable_attempt_lifetimes_are_refused() {
	// std
	use std::sync::Arc;
	// crates.io
	use time::Duration;
	// self
	use oauth2_consent::{
		error::Error,
		flows::{FlowSettings, ReqwestFlowEngine},
		store::MemoryStore,
	};

	let store = Arc::new(MemoryStore::default());
	let engine = ReqwestFlowEngine::new(registry(), store.clone())
		.with_settings(FlowSettings::default().with_attempt_ttl(Duration::MAX));
	let err = engine
		.start_authorization(
			"strava",
			&ClientId::new("test_client_id").expect("Client identifier should be valid."),
			&RedirectUri::new("https://airbyte.io").expect("Redirect URI should be valid."),
		)
		.await
		.expect_err("Overflowing lifetime should be refused.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::AttemptTtlOutOfRange { ttl }) if ttl == Duration::MAX
	));
	assert!(store.is_empty());
}

// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	error::ConfigError,
	provider::{ProviderConfig, catalog},
};

/// Read-only map from provider identifier to configuration, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct ProviderRegistry {
	providers: HashMap<ProviderId, Arc<ProviderConfig>>,
}
impl ProviderRegistry {
	/// Builds a registry, rejecting duplicate identifiers.
	pub fn new<I>(configs: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = ProviderConfig>,
	{
		let mut providers = HashMap::new();

		for config in configs {
			let id = config.id.clone();

			if providers.insert(id.clone(), Arc::new(config)).is_some() {
				return Err(ConfigError::DuplicateProvider { provider: id.into() });
			}
		}

		Ok(Self { providers })
	}

	/// Registry holding the built-in provider catalog.
	pub fn builtin() -> Result<Self, ConfigError> {
		Self::new(catalog::configs()?)
	}

	/// Parses a JSON array of provider configurations.
	///
	/// Failures report the JSON path of the offending value.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let deserializer = &mut serde_json::Deserializer::from_str(json);
		let configs: Vec<ProviderConfig> = serde_path_to_error::deserialize(deserializer)
			.map_err(|source| ConfigError::InvalidRegistry { source })?;

		Self::new(configs)
	}

	/// Resolves a provider identifier.
	pub fn resolve(&self, provider: &str) -> Result<Arc<ProviderConfig>, ConfigError> {
		self.providers
			.get(provider)
			.cloned()
			.ok_or_else(|| ConfigError::UnknownProvider { provider: provider.to_owned() })
	}

	/// Returns `true` when `provider` is registered.
	pub fn contains(&self, provider: &str) -> bool {
		self.providers.contains_key(provider)
	}

	/// Iterates over registered identifiers in no particular order.
	pub fn ids(&self) -> impl Iterator<Item = &ProviderId> {
		self.providers.keys()
	}

	/// Number of registered providers.
	pub fn len(&self) -> usize {
		self.providers.len()
	}

	/// Returns `true` when no providers are registered.
	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const ACME: &str = r#"[
		{
			"id": "acme",
			"authorization": "https://auth.acme.test/authorize?client_id={client_id}&redirect_uri={redirect_uri}&state={state}&response_type={response_type}",
			"token_endpoint": "https://auth.acme.test/token",
			"response_fields": { "access_token": "data.token" }
		}
	]"#;

	#[test]
	fn builtin_registry_resolves_every_catalog_entry() {
		let registry = ProviderRegistry::builtin().expect("Built-in registry should load.");

		assert_eq!(registry.len(), catalog::PROVIDER_IDS.len());

		for id in catalog::PROVIDER_IDS {
			assert_eq!(
				registry.resolve(id).expect("Catalog provider should resolve.").id.as_str(),
				id
			);
		}
	}

	#[test]
	fn unknown_provider_is_reported() {
		let registry = ProviderRegistry::builtin().expect("Built-in registry should load.");
		let err = registry.resolve("myspace").expect_err("Unknown provider should fail.");

		assert!(matches!(err, ConfigError::UnknownProvider { provider } if provider == "myspace"));
	}

	#[test]
	fn from_json_loads_declarative_configs() {
		let registry = ProviderRegistry::from_json(ACME).expect("Registry JSON should load.");
		let acme = registry.resolve("acme").expect("Provider should resolve.");

		assert!(acme.scopes.is_empty());
		assert_eq!(acme.token_endpoint.as_str(), "https://auth.acme.test/token");
		assert!(registry.contains("acme"));
		assert!(!registry.contains("strava"));
	}

	#[test]
	fn from_json_reports_the_failing_path() {
		let err = ProviderRegistry::from_json(
			r#"[{"id":"acme","authorization":"https://a.test/x?client_id={client_id}&redirect_uri={redirect_uri}&state={state}&response_type={response_type}","token_endpoint":"https://a.test/t","quirks":{"pkce_required":"yes"}}]"#,
		)
		.expect_err("Invalid quirk type should fail.");

		match err {
			ConfigError::InvalidRegistry { source } =>
				assert_eq!(source.path().to_string(), "[0].quirks.pkce_required"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn duplicate_ids_are_rejected() {
		let configs = catalog::configs().expect("Built-in catalog should be valid.");
		let strava = configs
			.iter()
			.find(|config| config.id.as_str() == "strava")
			.cloned()
			.expect("Strava should exist.");
		let err = ProviderRegistry::new(configs.into_iter().chain([strava]))
			.expect_err("Duplicate ids should fail.");

		assert!(matches!(err, ConfigError::DuplicateProvider { provider } if provider == "strava"));
	}
}

//! Authorization-code flow orchestration.
//!
//! [`FlowEngine`] wires the provider registry, attempt store, state generator, and token
//! transport together. Callers drive one attempt through three calls:
//! [`FlowEngine::start_authorization`] (consent URL), [`FlowEngine::validate_callback`]
//! (one-shot state check), and [`FlowEngine::complete_authorization`] (validation, exchange,
//! and normalization in one step).

pub mod callback;
pub mod consent;

mod complete;

pub use callback::*;
pub use consent::*;

// self
use crate::{
	_prelude::*,
	auth::{RandomStateGenerator, StateGenerator},
	exchange::{TokenExchanger, TransportErrorMapper},
	http::TokenHttpClient,
	provider::ProviderRegistry,
	store::AttemptStore,
};
#[cfg(feature = "reqwest")]
use crate::{exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Engine specialized for the crate's default reqwest transport stack.
pub type ReqwestFlowEngine = FlowEngine<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Tunables shared by every attempt an engine manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
	/// How long a consent URL stays redeemable, serialized as whole seconds.
	#[serde(with = "duration_secs")]
	pub attempt_ttl: Duration,
}
impl FlowSettings {
	/// Attempt lifetime used unless overridden.
	pub const DEFAULT_ATTEMPT_TTL: Duration = Duration::minutes(10);

	/// Overrides the attempt lifetime.
	pub fn with_attempt_ttl(mut self, ttl: Duration) -> Self {
		self.attempt_ttl = ttl;

		self
	}
}
impl Default for FlowSettings {
	fn default() -> Self {
		Self { attempt_ttl: Self::DEFAULT_ATTEMPT_TTL }
	}
}

/// Coordinates authorization-code attempts across every registered provider.
pub struct FlowEngine<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Token exchanger bound to the engine's transport.
	pub exchanger: TokenExchanger<C, M>,
	/// Provider configurations, read-only after startup.
	pub registry: Arc<ProviderRegistry>,
	/// Outstanding attempts keyed by state token.
	pub attempts: Arc<dyn AttemptStore>,
	/// Source of anti-forgery state tokens.
	pub state_generator: Arc<dyn StateGenerator>,
	/// Engine tunables.
	pub settings: FlowSettings,
}
impl<C, M> FlowEngine<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an engine that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		registry: impl Into<Arc<ProviderRegistry>>,
		attempts: Arc<dyn AttemptStore>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			exchanger: TokenExchanger::new(http_client, mapper),
			registry: registry.into(),
			attempts,
			state_generator: Arc::new(RandomStateGenerator),
			settings: FlowSettings::default(),
		}
	}

	/// Replaces the state generator.
	pub fn with_state_generator(mut self, generator: impl 'static + StateGenerator) -> Self {
		self.state_generator = Arc::new(generator);

		self
	}

	/// Replaces the engine settings.
	pub fn with_settings(mut self, settings: FlowSettings) -> Self {
		self.settings = settings;

		self
	}
}
#[cfg(feature = "reqwest")]
impl FlowEngine<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an engine backed by a default reqwest transport.
	pub fn new(registry: impl Into<Arc<ProviderRegistry>>, attempts: Arc<dyn AttemptStore>) -> Self {
		Self::with_http_client(
			registry,
			attempts,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Clone for FlowEngine<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			exchanger: self.exchanger.clone(),
			registry: Arc::clone(&self.registry),
			attempts: Arc::clone(&self.attempts),
			state_generator: Arc::clone(&self.state_generator),
			settings: self.settings,
		}
	}
}
impl<C, M> Debug for FlowEngine<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FlowEngine")
			.field("providers", &self.registry.len())
			.field("settings", &self.settings)
			.finish()
	}
}

mod duration_secs {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = u32::deserialize(deserializer)?;

		Ok(Duration::seconds(secs.into()))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn settings_default_to_ten_minutes() {
		assert_eq!(FlowSettings::default().attempt_ttl, Duration::minutes(10));
	}

	#[test]
	fn settings_serialize_ttl_as_seconds() {
		let settings: FlowSettings =
			serde_json::from_str(r#"{"attempt_ttl":300}"#).expect("Settings should deserialize.");

		assert_eq!(settings.attempt_ttl, Duration::minutes(5));
		assert_eq!(
			serde_json::to_string(&settings).expect("Settings should serialize."),
			r#"{"attempt_ttl":300}"#
		);

		let defaulted: FlowSettings =
			serde_json::from_str("{}").expect("Empty settings should deserialize.");

		assert_eq!(defaulted, FlowSettings::default());
		assert!(serde_json::from_str::<FlowSettings>(r#"{"attempt_ttl":-1}"#).is_err());
	}
}

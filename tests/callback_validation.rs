#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use time::{Duration, OffsetDateTime};
// self
use oauth2_consent::{
	auth::{AttemptStatus, ClientId, RedirectUri, StateToken},
	error::{Error, ValidationError},
	flows::{AuthorizationSession, FlowSettings, ReqwestFlowEngine},
	provider::ProviderRegistry,
	store::{AttemptStore, MemoryStore},
};

fn test_engine() -> (ReqwestFlowEngine, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let registry = ProviderRegistry::builtin().expect("Built-in registry should load.");
	let engine = ReqwestFlowEngine::new(registry, store.clone())
		.with_settings(FlowSettings::default().with_attempt_ttl(Duration::minutes(5)));

	(engine, store)
}

async fn start(engine: &ReqwestFlowEngine) -> AuthorizationSession {
	engine
		.start_authorization(
			"strava",
			&ClientId::new("test_client_id").expect("Client identifier should be valid."),
			&RedirectUri::new("https://airbyte.io").expect("Redirect URI should be valid."),
		)
		.await
		.expect("Authorization should start.")
}

fn validation_error(result: Result<impl Sized, Error>) -> ValidationError {
	match result {
		Err(Error::Validation(err)) => err,
		Err(other) => panic!("Expected a validation error, got {other:?}."),
		Ok(_) => panic!("Expected validation to fail."),
	}
}

#[tokio::test]
async fn validated_state_cannot_be_validated_again() {
	let (engine, store) = test_engine();
	let session = start(&engine).await;
	let attempt = engine
		.validate_callback(&session.state, session.state.as_str())
		.await
		.expect("First callback should validate.");

	assert_eq!(attempt.status, AttemptStatus::Validated);
	assert_eq!(attempt.provider.as_str(), "strava");
	assert_eq!(
		validation_error(engine.validate_callback(&session.state, session.state.as_str()).await),
		ValidationError::StateAlreadyUsed
	);
	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn expired_attempts_report_expiry_not_mismatch() {
	let (engine, store) = test_engine();
	let session = start(&engine).await;
	let after_ttl = session.expires_at + Duration::seconds(1);

	assert_eq!(
		validation_error(engine.validate_callback_at(&session.state, "tampered", after_ttl).await),
		ValidationError::StateExpired
	);

	let stored = store
		.get(session.state.as_str())
		.await
		.expect("Store read should succeed.")
		.expect("Expired attempt should remain until purged.");

	assert_eq!(stored.status, AttemptStatus::Expired);
	assert_eq!(
		store
			.purge_expired(after_ttl, Duration::minutes(5))
			.await
			.expect("Purge should succeed."),
		1
	);
	assert!(store.is_empty());
}

#[tokio::test]
async fn expiry_boundary_is_inclusive() {
	let (engine, _) = test_engine();
	let session = start(&engine).await;
	let just_before = session.expires_at - Duration::milliseconds(1);

	assert!(
		engine
			.validate_callback_at(&session.state, session.state.as_str(), just_before)
			.await
			.is_ok()
	);

	let (engine, _) = test_engine();
	let session = start(&engine).await;

	assert_eq!(
		validation_error(
			engine
				.validate_callback_at(&session.state, session.state.as_str(), session.expires_at)
				.await
		),
		ValidationError::StateExpired
	);
}

#[tokio::test]
async fn mismatched_and_unknown_states_are_distinct() {
	let (engine, _) = test_engine();
	let session = start(&engine).await;

	assert_eq!(
		validation_error(engine.validate_callback(&session.state, "attacker-state").await),
		ValidationError::StateMismatch
	);

	let never_issued = StateToken::new("never-issued").expect("State token should be valid.");

	assert_eq!(
		validation_error(engine.validate_callback(&never_issued, "never-issued").await),
		ValidationError::StateUnknown
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callbacks_have_exactly_one_winner() {
	let (engine, _) = test_engine();
	let session = start(&engine).await;
	let now = OffsetDateTime::now_utc();
	let handles = (0..16)
		.map(|_| {
			let engine = engine.clone();
			let state = session.state.clone();

			tokio::spawn(async move {
				engine.validate_callback_at(&state, state.as_str(), now).await
			})
		})
		.collect::<Vec<_>>();
	let mut winners = 0;
	let mut replays = 0;

	for handle in handles {
		match handle.await.expect("Validation task should not panic.") {
			Ok(_) => winners += 1,
			Err(Error::Validation(ValidationError::StateAlreadyUsed)) => replays += 1,
			Err(other) => panic!("Unexpected validation outcome: {other:?}."),
		}
	}

	assert_eq!(winners, 1);
	assert_eq!(replays, 15);
}

//! Thread-safe in-memory [`AttemptStore`] implementation for single-process use and tests.

// self
use crate::{
	_prelude::*,
	auth::{AttemptStatus, AuthAttempt, StateToken},
	store::{self, AttemptStore, StoreError, StoreFuture, TransitionOutcome},
};

type AttemptMap = Arc<RwLock<HashMap<StateToken, AuthAttempt>>>;

/// Storage backend that keeps attempts in-process behind a write lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(AttemptMap);
impl MemoryStore {
	/// Number of attempts currently held, consumed ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no attempts are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn put_now(map: AttemptMap, attempt: AuthAttempt) -> Result<(), StoreError> {
		let mut guard = map.write();

		if guard.contains_key(attempt.state.as_str()) {
			return Err(StoreError::DuplicateState);
		}

		guard.insert(attempt.state.clone(), attempt);

		Ok(())
	}

	fn transition_now(
		map: AttemptMap,
		state: &str,
		expected: AttemptStatus,
		next: AttemptStatus,
	) -> Result<TransitionOutcome, StoreError> {
		store::ensure_transition(expected, next)?;

		let mut guard = map.write();
		let outcome = match guard.get_mut(state) {
			Some(attempt) if attempt.status == expected => {
				attempt.status = next;

				TransitionOutcome::Updated(attempt.clone())
			},
			Some(attempt) => TransitionOutcome::StatusMismatch(attempt.status),
			None => TransitionOutcome::Missing,
		};

		Ok(outcome)
	}

	fn purge_now(map: AttemptMap, now: OffsetDateTime, ttl: Duration) -> usize {
		let mut guard = map.write();
		let before = guard.len();

		guard.retain(|_, attempt| !attempt.is_expired_at(now, ttl));

		before - guard.len()
	}
}
impl AttemptStore for MemoryStore {
	fn put(&self, attempt: AuthAttempt) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::put_now(map, attempt) })
	}

	fn get<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<AuthAttempt>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(state).cloned()) })
	}

	fn delete<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<AuthAttempt>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(state)) })
	}

	fn compare_and_transition<'a>(
		&'a self,
		state: &'a str,
		expected: AttemptStatus,
		next: AttemptStatus,
	) -> StoreFuture<'a, TransitionOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Self::transition_now(map, state, expected, next) })
	}

	fn purge_expired(&self, now: OffsetDateTime, ttl: Duration) -> StoreFuture<'_, usize> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::purge_now(map, now, ttl)) })
	}

	fn abandon_exchange(&self, state: &str) -> Result<TransitionOutcome, StoreError> {
		Self::transition_now(
			self.0.clone(),
			state,
			AttemptStatus::Exchanging,
			AttemptStatus::ExchangeFailed,
		)
	}
}

//! Storage contract and built-in store for outstanding authorization attempts.

pub mod memory;

pub use memory::MemoryStore;

// std
use std::task::{Context, Poll, Waker};
// self
use crate::{
	_prelude::*,
	auth::{AttemptStatus, AuthAttempt},
};

/// Boxed future returned by [`AttemptStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Attempt registry keyed by state token.
///
/// Implementations must make [`AttemptStore::compare_and_transition`] atomic with respect to
/// every other call for the same state so two callbacks can never both consume one attempt,
/// and must refuse transitions that [`AttemptStatus::can_transition_to`] forbids.
pub trait AttemptStore
where
	Self: Send + Sync,
{
	/// Registers a new attempt; fails with [`StoreError::DuplicateState`] if the state exists.
	fn put(&self, attempt: AuthAttempt) -> StoreFuture<'_, ()>;

	/// Fetches the attempt registered under `state`, if present.
	fn get<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<AuthAttempt>>;

	/// Removes and returns the attempt registered under `state`.
	fn delete<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<AuthAttempt>>;

	/// Atomically moves the attempt from `expected` to `next`.
	fn compare_and_transition<'a>(
		&'a self,
		state: &'a str,
		expected: AttemptStatus,
		next: AttemptStatus,
	) -> StoreFuture<'a, TransitionOutcome>;

	/// Drops attempts whose TTL elapsed at `now`, returning how many were removed.
	fn purge_expired(&self, now: OffsetDateTime, ttl: Duration) -> StoreFuture<'_, usize>;

	/// Moves an attempt from [`AttemptStatus::Exchanging`] to
	/// [`AttemptStatus::ExchangeFailed`] without awaiting.
	///
	/// Runs from a destructor when an exchange future is dropped before it settles, so it
	/// must not block. The default polls [`AttemptStore::compare_and_transition`] once and
	/// reports a [`StoreError::Backend`] if the backend is not ready immediately; backends
	/// that always need I/O should override it.
	fn abandon_exchange(&self, state: &str) -> Result<TransitionOutcome, StoreError> {
		let mut transition = self.compare_and_transition(
			state,
			AttemptStatus::Exchanging,
			AttemptStatus::ExchangeFailed,
		);

		match transition.as_mut().poll(&mut Context::from_waker(Waker::noop())) {
			Poll::Ready(outcome) => outcome,
			Poll::Pending => Err(StoreError::Backend {
				message: "backend cannot settle an abandoned exchange synchronously".into(),
			}),
		}
	}
}

/// Result of a compare-and-transition attempt.
#[derive(Clone, Debug)]
pub enum TransitionOutcome {
	/// The attempt was in the expected status and now holds the new one.
	Updated(AuthAttempt),
	/// The attempt exists but was in a different status; nothing changed.
	StatusMismatch(AttemptStatus),
	/// No attempt is registered under the state.
	Missing,
}
impl TransitionOutcome {
	/// Returns `true` when the transition was applied.
	pub fn is_updated(&self) -> bool {
		matches!(self, TransitionOutcome::Updated(_))
	}
}

/// Error type produced by [`AttemptStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// An attempt with the same state token is already registered.
	#[error("An attempt with this state is already registered.")]
	DuplicateState,
	/// The requested transition is not part of the attempt lifecycle.
	#[error("Illegal attempt transition from {from} to {to}.")]
	IllegalTransition {
		/// Status the caller expected.
		from: AttemptStatus,
		/// Status the caller requested.
		to: AttemptStatus,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Rejects transitions outside the attempt lifecycle; shared by store implementations.
pub fn ensure_transition(from: AttemptStatus, to: AttemptStatus) -> Result<(), StoreError> {
	if from.can_transition_to(to) { Ok(()) } else { Err(StoreError::IllegalTransition { from, to }) }
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::{
		auth::{AuthAttempt, ClientId, ProviderId, RedirectUri, StateToken},
		error::Error,
	};

	// Forwards everything except `abandon_exchange`, which keeps the trait default.
	struct Forwarding(MemoryStore);
	impl AttemptStore for Forwarding {
		fn put(&self, attempt: AuthAttempt) -> StoreFuture<'_, ()> {
			self.0.put(attempt)
		}

		fn get<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<AuthAttempt>> {
			self.0.get(state)
		}

		fn delete<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<AuthAttempt>> {
			self.0.delete(state)
		}

		fn compare_and_transition<'a>(
			&'a self,
			state: &'a str,
			expected: AttemptStatus,
			next: AttemptStatus,
		) -> StoreFuture<'a, TransitionOutcome> {
			self.0.compare_and_transition(state, expected, next)
		}

		fn purge_expired(&self, now: OffsetDateTime, ttl: Duration) -> StoreFuture<'_, usize> {
			self.0.purge_expired(now, ttl)
		}
	}

	// Never completes, like a remote backend still waiting on I/O.
	struct Stalled;
	impl AttemptStore for Stalled {
		fn put(&self, _: AuthAttempt) -> StoreFuture<'_, ()> {
			Box::pin(std::future::pending())
		}

		fn get<'a>(&'a self, _: &'a str) -> StoreFuture<'a, Option<AuthAttempt>> {
			Box::pin(std::future::pending())
		}

		fn delete<'a>(&'a self, _: &'a str) -> StoreFuture<'a, Option<AuthAttempt>> {
			Box::pin(std::future::pending())
		}

		fn compare_and_transition<'a>(
			&'a self,
			_: &'a str,
			_: AttemptStatus,
			_: AttemptStatus,
		) -> StoreFuture<'a, TransitionOutcome> {
			Box::pin(std::future::pending())
		}

		fn purge_expired(&self, _: OffsetDateTime, _: Duration) -> StoreFuture<'_, usize> {
			Box::pin(std::future::pending())
		}
	}

	#[tokio::test]
	async fn default_abandon_settles_ready_backends() {
		let store = Forwarding(MemoryStore::default());
		let mut attempt = AuthAttempt::new(
			StateToken::new("s1").expect("State fixture should be valid."),
			ProviderId::new("strava").expect("Provider fixture should be valid."),
			ClientId::new("client").expect("Client fixture should be valid."),
			RedirectUri::new("https://airbyte.io").expect("Redirect fixture should be valid."),
			OffsetDateTime::now_utc(),
		);

		attempt.status = AttemptStatus::Exchanging;
		store.put(attempt).await.expect("Put should succeed.");

		assert!(matches!(
			store.abandon_exchange("s1"),
			Ok(TransitionOutcome::Updated(ref a)) if a.status == AttemptStatus::ExchangeFailed
		));
		assert!(matches!(store.abandon_exchange("missing"), Ok(TransitionOutcome::Missing)));
	}

	#[test]
	fn default_abandon_reports_backends_that_are_not_ready() {
		assert!(matches!(Stalled.abandon_exchange("s1"), Err(StoreError::Backend { .. })));
	}

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "redis unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("redis unreachable"));

		let source =
			StdError::source(&error).expect("Crate error should expose the store error as source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn illegal_transitions_are_refused() {
		assert_eq!(
			ensure_transition(AttemptStatus::Succeeded, AttemptStatus::Exchanging),
			Err(StoreError::IllegalTransition {
				from: AttemptStatus::Succeeded,
				to: AttemptStatus::Exchanging,
			})
		);
		assert!(ensure_transition(AttemptStatus::AwaitingCallback, AttemptStatus::Validated).is_ok());
	}
}

//! Anti-forgery state token generation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
// self
use crate::{_prelude::*, auth::StateToken};

/// Number of random bytes behind each generated state token (256 bits).
pub const STATE_ENTROPY_BYTES: usize = 32;

/// Source of fresh, unguessable state tokens.
///
/// Every call must return a value that has never been issued before with overwhelming
/// probability; the attempt store rejects duplicates among outstanding attempts. Closures
/// returning a [`StateToken`] implement the trait, which lets fixtures pin the value.
pub trait StateGenerator
where
	Self: Send + Sync,
{
	/// Produces a new state token.
	fn generate(&self) -> StateToken;
}
impl<F> StateGenerator for F
where
	F: Send + Sync + Fn() -> StateToken,
{
	fn generate(&self) -> StateToken {
		self()
	}
}

/// Default generator backed by the thread-local CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomStateGenerator;
impl StateGenerator for RandomStateGenerator {
	fn generate(&self) -> StateToken {
		StateToken::from_generated(random_url_safe(STATE_ENTROPY_BYTES))
	}
}

/// Encodes `len` random bytes as unpadded URL-safe base64.
pub(crate) fn random_url_safe(len: usize) -> String {
	let mut bytes = vec![0_u8; len];

	rand::rng().fill_bytes(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn random_tokens_are_url_safe_and_long_enough() {
		let token = RandomStateGenerator.generate();

		assert_eq!(token.len(), 43);
		assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
	}

	#[test]
	fn successive_tokens_differ() {
		let generator = RandomStateGenerator;

		assert_ne!(generator.generate(), generator.generate());
	}

	#[test]
	fn closures_act_as_fixed_generators() {
		let fixed = || StateToken::new("state").expect("Fixed state should be valid.");

		assert_eq!(fixed.generate().as_str(), "state");
		assert_eq!(StateGenerator::generate(&fixed), fixed.generate());
	}
}

//! Declarative OAuth 2.0 authorization-code engine: provider-specific consent URLs, one-shot
//! state validation, token exchange over an injected transport, and normalization of every
//! provider's token response into one credential record.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod exchange;
pub mod flows;
pub mod http;
pub mod normalize;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		exchange::ReqwestTransportErrorMapper,
		flows::{FlowEngine, ReqwestFlowEngine},
		http::ReqwestHttpClient,
		provider::ProviderRegistry,
		store::MemoryStore,
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`ReqwestFlowEngine`] over `registry`, an in-memory attempt store, and the
	/// insecure test transport; the store is returned for inspection.
	pub fn build_reqwest_test_engine(
		registry: ProviderRegistry,
	) -> (ReqwestFlowEngine, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let engine = FlowEngine::with_http_client(
			registry,
			store.clone(),
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		);

		(engine, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

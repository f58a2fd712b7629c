//! Renders a Strava consent URL, then walks the redirect handler through callback parsing and
//! one-shot state validation. The code exchange needs real client credentials, so the demo
//! stops right before it.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
// self
use oauth2_consent::{
	auth::{ClientId, RedirectUri},
	flows::{CallbackParams, ReqwestFlowEngine},
	provider::ProviderRegistry,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let engine =
		ReqwestFlowEngine::new(ProviderRegistry::builtin()?, Arc::new(MemoryStore::default()));
	let session = engine
		.start_authorization(
			"strava",
			&ClientId::new("test_client_id")?,
			&RedirectUri::new("https://airbyte.io")?,
		)
		.await?;

	println!("Send your user to {}.", session.consent_url);
	println!("The attempt expires at {}.", session.expires_at);

	// Simulate the provider redirecting back to `https://airbyte.io?code=...&state=...`.
	let callback = CallbackParams::from_query(&format!("code=demo-code&state={}", session.state))?;
	let attempt = engine.validate_callback(&session.state, &callback.state).await?;

	println!("Validated the callback for {} ({}).", attempt.provider, attempt.status);

	if let Err(e) = engine.validate_callback(&session.state, &callback.state).await {
		println!("A replayed callback is refused: {e}");
	}

	println!("Call FlowEngine::complete_authorization with the client secret to redeem the code.");

	Ok(())
}

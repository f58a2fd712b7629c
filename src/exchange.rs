//! Authorization-code exchange against a provider's token endpoint.
//!
//! The exchanger issues exactly one request per call and never retries; classifying a
//! failure as retryable is left to [`ExchangeError::is_retryable`] and the caller.

pub use oauth2::{AuthorizationCode, ClientSecret};

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderValue, Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
	},
};
use time::format_description::well_known::Rfc2822;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ExtraFields, ProviderId, RedirectUri, TokenSecret},
	error::ExchangeError,
	http::TokenHttpClient,
	obs,
	provider::{ClientAuthMethod, ProviderConfig, TokenRequestFormat},
};

const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Maps HTTP transport failures into [`ExchangeError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into an exchange error.
	fn map_transport_error(&self, provider: &ProviderId, error: HttpClientError<E>)
	-> ExchangeError;
}

/// Mapper for arbitrary transports; every failure becomes a non-timeout transport failure.
#[derive(Clone, Debug, Default)]
pub struct BasicTransportErrorMapper;
impl<E> TransportErrorMapper<E> for BasicTransportErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(
		&self,
		_provider: &ProviderId,
		error: HttpClientError<E>,
	) -> ExchangeError {
		match error {
			HttpClientError::Http(inner) => ExchangeError::Request(inner),
			other => ExchangeError::transport(other, false),
		}
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		provider: &ProviderId,
		error: HttpClientError<ReqwestError>,
	) -> ExchangeError {
		let mapped = match error {
			HttpClientError::Reqwest(inner) => {
				let timed_out = inner.is_timeout();

				ExchangeError::TransportFailure { source: inner, timed_out }
			},
			HttpClientError::Http(inner) => ExchangeError::Request(inner),
			HttpClientError::Io(inner) => {
				let timed_out = inner.kind() == std::io::ErrorKind::TimedOut;

				ExchangeError::transport(inner, timed_out)
			},
			other => ExchangeError::transport(other, false),
		};

		obs::flow_event!(warn, provider = %provider, error = %mapped, "token endpoint transport failure");

		mapped
	}
}

/// Successful token endpoint answer: a JSON object plus the HTTP status it arrived with.
#[derive(Clone, Debug, PartialEq)]
pub struct RawTokenResponse {
	/// HTTP status code.
	pub status: u16,
	/// Decoded top-level JSON object.
	pub fields: ExtraFields,
}
impl RawTokenResponse {
	/// Wraps an already-decoded JSON object.
	pub fn new(status: u16, fields: ExtraFields) -> Self {
		Self { status, fields }
	}
}

/// Inputs for one authorization-code exchange.
///
/// `Debug` output never includes the code, the client secret, or the PKCE verifier.
#[derive(Debug)]
pub struct ExchangeRequest<'a> {
	/// Authorization code delivered on the callback.
	pub code: &'a AuthorizationCode,
	/// Redirect URI used for the consent URL; repeated verbatim.
	pub redirect_uri: &'a RedirectUri,
	/// OAuth client identifier.
	pub client_id: &'a ClientId,
	/// OAuth client secret.
	pub client_secret: &'a ClientSecret,
	/// PKCE verifier for providers that require it.
	pub pkce_verifier: Option<&'a TokenSecret>,
}

/// Exchanges authorization codes over an injected transport.
pub struct TokenExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<C, M> TokenExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an exchanger over the provided transport and error mapper.
	pub fn new(http_client: impl Into<Arc<C>>, transport_mapper: impl Into<Arc<M>>) -> Self {
		Self { http_client: http_client.into(), transport_mapper: transport_mapper.into() }
	}

	/// Sends one token request for `request` and classifies the answer.
	pub async fn exchange(
		&self,
		config: &ProviderConfig,
		request: ExchangeRequest<'_>,
	) -> Result<RawTokenResponse, ExchangeError> {
		let http_request = build_token_request(config, &request)?;
		let handle = self.http_client.handle();
		let response = handle
			.call(http_request)
			.await
			.map_err(|err| self.transport_mapper.map_transport_error(&config.id, err))?;

		classify_response(&config.id, response)
	}
}
impl<C, M> Clone for TokenExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			transport_mapper: Arc::clone(&self.transport_mapper),
		}
	}
}
impl<C, M> Debug for TokenExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenExchanger(..)")
	}
}

/// Assembles the token request for `config` without sending it.
pub fn build_token_request(
	config: &ProviderConfig,
	request: &ExchangeRequest<'_>,
) -> Result<HttpRequest, ExchangeError> {
	let mut params = vec![
		("grant_type", GRANT_TYPE_AUTHORIZATION_CODE),
		("code", request.code.secret().as_str()),
		("redirect_uri", request.redirect_uri.as_str()),
	];
	let mut builder = Request::builder()
		.method(Method::POST)
		.uri(config.token_endpoint.as_str())
		.header(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

	match config.quirks.client_auth_method {
		ClientAuthMethod::ClientSecretPost => {
			params.push(("client_id", request.client_id.as_str()));
			params.push(("client_secret", request.client_secret.secret().as_str()));
		},
		ClientAuthMethod::ClientSecretBasic => {
			builder = builder.header(
				AUTHORIZATION,
				basic_authorization(request.client_id.as_str(), request.client_secret.secret()),
			);
		},
	}

	if let Some(verifier) = request.pkce_verifier {
		params.push(("code_verifier", verifier.expose()));
	}

	let (content_type, body) = match config.quirks.token_request_format {
		TokenRequestFormat::Form => (
			FORM_CONTENT_TYPE,
			form_urlencoded::Serializer::new(String::new())
				.extend_pairs(&params)
				.finish()
				.into_bytes(),
		),
		TokenRequestFormat::Json => {
			let object = params
				.iter()
				.map(|(name, value)| ((*name).to_owned(), serde_json::Value::from(*value)))
				.collect::<ExtraFields>();

			(JSON_CONTENT_TYPE, serde_json::Value::Object(object).to_string().into_bytes())
		},
	};

	Ok(builder.header(CONTENT_TYPE, HeaderValue::from_static(content_type)).body(body)?)
}

// RFC 6749 section 2.3.1 form-encodes both halves before base64.
fn basic_authorization(client_id: &str, client_secret: &str) -> String {
	let id = form_urlencoded::byte_serialize(client_id.as_bytes()).collect::<String>();
	let secret = form_urlencoded::byte_serialize(client_secret.as_bytes()).collect::<String>();

	format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
}

#[derive(Deserialize)]
struct OAuthErrorBody {
	error: Option<String>,
	error_description: Option<String>,
}

fn classify_response(
	provider: &ProviderId,
	response: HttpResponse,
) -> Result<RawTokenResponse, ExchangeError> {
	let status = response.status();

	if !status.is_success() {
		let parsed = serde_json::from_slice::<OAuthErrorBody>(response.body()).ok();
		let (oauth_error, error_description) =
			parsed.map(|body| (body.error, body.error_description)).unwrap_or_default();

		obs::flow_event!(
			warn,
			provider = %provider,
			status = status.as_u16(),
			oauth_error = oauth_error.as_deref().unwrap_or(""),
			"token endpoint rejected the exchange"
		);

		return Err(ExchangeError::ProviderRejected {
			status: status.as_u16(),
			body: String::from_utf8_lossy(response.body()).into_owned(),
			oauth_error,
			error_description,
			retry_after: parse_retry_after(response.headers(), OffsetDateTime::now_utc()),
		});
	}

	let deserializer = &mut serde_json::Deserializer::from_slice(response.body());
	let fields: ExtraFields = serde_path_to_error::deserialize(deserializer)
		.map_err(|source| ExchangeError::MalformedResponse { status: status.as_u16(), source })?;

	obs::flow_event!(debug, provider = %provider, status = status.as_u16(), "token endpoint answered");

	Ok(RawTokenResponse::new(status.as_u16(), fields))
}

/// Parses a `Retry-After` header given either as delta-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap, now: OffsetDateTime) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}

	let moment = OffsetDateTime::parse(raw, &Rfc2822).ok()?;
	let delta = moment - now;

	delta.is_positive().then_some(delta)
}

//! Projection of heterogeneous token responses into [`CredentialRecord`]s.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, TokenSecret},
	error::NormalizationError,
	exchange::RawTokenResponse,
	obs,
	provider::{CanonicalField, JsonPath, ProviderConfig},
};

/// Normalizes `raw` using the current time as the issue instant.
pub fn normalize(
	config: &ProviderConfig,
	raw: RawTokenResponse,
) -> Result<CredentialRecord, NormalizationError> {
	normalize_at(config, raw, OffsetDateTime::now_utc())
}

/// Normalizes `raw`, resolving relative expiries against `issued_at`.
///
/// The access token is required. Refresh token and expiry are optional; when both
/// `expires_at` and `expires_in` are mapped and present, the absolute value wins. Top-level
/// keys read through single-segment paths are removed from the extras and every other
/// field passes through unchanged.
pub fn normalize_at(
	config: &ProviderConfig,
	raw: RawTokenResponse,
	issued_at: OffsetDateTime,
) -> Result<CredentialRecord, NormalizationError> {
	let fields = &config.response_fields;
	let mut consumed = Vec::new();
	let access_token = match fields.path(CanonicalField::AccessToken) {
		Some(path) => match string_field(&raw, CanonicalField::AccessToken, path)? {
			Some(value) => {
				consumed.extend(path.top_level_key());

				TokenSecret::new(value)
			},
			None => return Err(missing(config, path)),
		},
		None =>
			return Err(NormalizationError::MissingRequiredField {
				field: CanonicalField::AccessToken,
				path: String::new(),
			}),
	};
	let refresh_token = match fields.path(CanonicalField::RefreshToken) {
		Some(path) => string_field(&raw, CanonicalField::RefreshToken, path)?.map(|value| {
			consumed.extend(path.top_level_key());

			TokenSecret::new(value)
		}),
		None => None,
	};
	let expires_in = match fields.path(CanonicalField::ExpiresIn) {
		Some(path) => integer_field(&raw, CanonicalField::ExpiresIn, path)?
			.map(|secs| {
				consumed.extend(path.top_level_key());

				if secs <= 0 {
					return Err(invalid(CanonicalField::ExpiresIn, path, "lifetime must be positive"));
				}

				issued_at.checked_add(Duration::seconds(secs)).ok_or_else(|| {
					invalid(CanonicalField::ExpiresIn, path, "lifetime is out of range")
				})
			})
			.transpose()?,
		None => None,
	};
	let expires_at = match fields.path(CanonicalField::ExpiresAt) {
		Some(path) => integer_field(&raw, CanonicalField::ExpiresAt, path)?
			.map(|secs| {
				consumed.extend(path.top_level_key());

				OffsetDateTime::from_unix_timestamp(secs).map_err(|_| {
					invalid(CanonicalField::ExpiresAt, path, "timestamp is out of range")
				})
			})
			.transpose()?,
		None => None,
	};
	let mut extra_fields = raw.fields;

	for key in consumed {
		extra_fields.remove(key);
	}

	Ok(CredentialRecord::new(
		config.id.clone(),
		access_token,
		refresh_token,
		issued_at,
		expires_at.or(expires_in),
		extra_fields,
	))
}

fn missing(config: &ProviderConfig, path: &JsonPath) -> NormalizationError {
	obs::flow_event!(
		error,
		provider = %config.id,
		field = CanonicalField::AccessToken.as_str(),
		path = path.as_str(),
		"token response is missing a required field"
	);

	NormalizationError::MissingRequiredField {
		field: CanonicalField::AccessToken,
		path: path.as_str().to_owned(),
	}
}

fn invalid(field: CanonicalField, path: &JsonPath, reason: &str) -> NormalizationError {
	NormalizationError::InvalidField { field, path: path.as_str().to_owned(), reason: reason.into() }
}

// Absent and `null` values are treated the same; empty strings count as absent.
fn string_field(
	raw: &RawTokenResponse,
	field: CanonicalField,
	path: &JsonPath,
) -> Result<Option<String>, NormalizationError> {
	match path.lookup(&raw.fields) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(value)) if value.is_empty() => Ok(None),
		Some(Value::String(value)) => Ok(Some(value.clone())),
		Some(_) => Err(invalid(field, path, "expected a string")),
	}
}

fn integer_field(
	raw: &RawTokenResponse,
	field: CanonicalField,
	path: &JsonPath,
) -> Result<Option<i64>, NormalizationError> {
	match path.lookup(&raw.fields) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::Number(number)) => number
			.as_i64()
			.or_else(|| number.as_f64().filter(|value| value.fract() == 0.0).map(|value| value as i64))
			.map(Some)
			.ok_or_else(|| invalid(field, path, "expected an integer")),
		Some(Value::String(value)) => value
			.trim()
			.parse::<i64>()
			.map(Some)
			.map_err(|_| invalid(field, path, "expected a numeric string")),
		Some(_) => Err(invalid(field, path, "expected a number")),
	}
}

// self
use crate::_prelude::*;

/// Canonical credential values extracted from a token response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
	/// Access token; required.
	AccessToken,
	/// Refresh token.
	RefreshToken,
	/// Lifetime in seconds relative to the response.
	ExpiresIn,
	/// Absolute expiry as UNIX seconds.
	ExpiresAt,
}
impl CanonicalField {
	/// Snake-case label used in configs, errors, and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			CanonicalField::AccessToken => "access_token",
			CanonicalField::RefreshToken => "refresh_token",
			CanonicalField::ExpiresIn => "expires_in",
			CanonicalField::ExpiresAt => "expires_at",
		}
	}
}
impl Display for CanonicalField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error returned for malformed JSON paths.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("JSON path `{path}` must be non-empty dot-separated keys.")]
pub struct JsonPathError {
	/// Offending path.
	pub path: String,
}

/// Dotted path into a JSON object, e.g. `authed_user.access_token`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsonPath {
	raw: String,
	segments: Vec<String>,
}
impl JsonPath {
	/// Parses a dotted path.
	pub fn parse(raw: impl Into<String>) -> Result<Self, JsonPathError> {
		let raw = raw.into();
		let segments = raw.split('.').map(str::to_owned).collect::<Vec<_>>();

		if segments.iter().any(|segment| segment.is_empty() || segment.trim() != segment.as_str()) {
			return Err(JsonPathError { path: raw });
		}

		Ok(Self { raw, segments })
	}

	/// Path exactly as configured.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Returns the top-level key when the path has exactly one segment.
	pub fn top_level_key(&self) -> Option<&str> {
		match self.segments.as_slice() {
			[single] => Some(single),
			_ => None,
		}
	}

	/// Walks `root` along the path; `None` when any segment is absent or not an object.
	pub fn lookup<'a>(
		&self,
		root: &'a serde_json::Map<String, serde_json::Value>,
	) -> Option<&'a serde_json::Value> {
		let (first, rest) = self.segments.split_first()?;
		let mut current = root.get(first)?;

		for segment in rest {
			current = current.as_object()?.get(segment)?;
		}

		Some(current)
	}
}
impl Debug for JsonPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "JsonPath({})", self.raw)
	}
}
impl Display for JsonPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.raw)
	}
}
impl FromStr for JsonPath {
	type Err = JsonPathError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl Serialize for JsonPath {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.raw)
	}
}
impl<'de> Deserialize<'de> for JsonPath {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Self::parse(raw).map_err(serde::de::Error::custom)
	}
}

/// Mapping from canonical fields to their location in a provider's token response.
///
/// The default mapping reads the RFC 6749 names `access_token`, `refresh_token`, and
/// `expires_in` from the top level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseFieldMap(BTreeMap<CanonicalField, JsonPath>);
impl ResponseFieldMap {
	/// Creates a map without any entries.
	pub fn empty() -> Self {
		Self(BTreeMap::new())
	}

	/// Sets the path for `field`, replacing any earlier one.
	pub fn with(mut self, field: CanonicalField, path: JsonPath) -> Self {
		self.0.insert(field, path);

		self
	}

	/// Removes the mapping for `field`.
	pub fn without(mut self, field: CanonicalField) -> Self {
		self.0.remove(&field);

		self
	}

	/// Path configured for `field`.
	pub fn path(&self, field: CanonicalField) -> Option<&JsonPath> {
		self.0.get(&field)
	}

	/// Iterates over the configured mappings.
	pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &JsonPath)> {
		self.0.iter().map(|(field, path)| (*field, path))
	}
}
impl Default for ResponseFieldMap {
	fn default() -> Self {
		let mut map = BTreeMap::new();

		for field in
			[CanonicalField::AccessToken, CanonicalField::RefreshToken, CanonicalField::ExpiresIn]
		{
			map.insert(
				field,
				JsonPath { raw: field.as_str().to_owned(), segments: vec![field.as_str().to_owned()] },
			);
		}

		Self(map)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn nested_paths_walk_objects() {
		let body = serde_json::json!({
			"ok": true,
			"authed_user": { "id": "U1", "access_token": "xoxp-1" }
		});
		let root = body.as_object().expect("Fixture should be an object.");
		let path = JsonPath::parse("authed_user.access_token").expect("Path should parse.");

		assert_eq!(path.lookup(root), Some(&serde_json::json!("xoxp-1")));
		assert_eq!(path.top_level_key(), None);
		assert_eq!(JsonPath::parse("ok.nested").expect("Path should parse.").lookup(root), None);
	}

	#[test]
	fn malformed_paths_are_rejected() {
		assert!(JsonPath::parse("").is_err());
		assert!(JsonPath::parse("a..b").is_err());
		assert!(JsonPath::parse(".a").is_err());
		assert!(JsonPath::parse("a. b").is_err());
	}

	#[test]
	fn default_map_uses_rfc6749_names() {
		let map = ResponseFieldMap::default();

		assert_eq!(
			map.path(CanonicalField::AccessToken).and_then(JsonPath::top_level_key),
			Some("access_token")
		);
		assert!(map.path(CanonicalField::ExpiresAt).is_none());
	}

	#[test]
	fn field_maps_deserialize_from_objects() {
		let map: ResponseFieldMap = serde_json::from_str(
			r#"{"access_token":"authed_user.access_token","expires_at":"expires_at"}"#,
		)
		.expect("Field map should deserialize.");

		assert_eq!(
			map.path(CanonicalField::AccessToken).map(JsonPath::as_str),
			Some("authed_user.access_token")
		);
		assert!(map.path(CanonicalField::RefreshToken).is_none());
		assert!(
			serde_json::from_str::<ResponseFieldMap>(r#"{"access_token":"a..b"}"#).is_err()
		);
	}
}

// crates.io
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Value the consent builder always emits for `{response_type}`.
pub const RESPONSE_TYPE_CODE: &str = "code";

const REQUIRED_PLACEHOLDERS: [Placeholder; 4] =
	[Placeholder::ClientId, Placeholder::RedirectUri, Placeholder::State, Placeholder::ResponseType];

/// Errors raised while parsing or rendering a consent URL template.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TemplateError {
	/// The endpoint part is not an absolute URL.
	#[error("Consent template endpoint is not a valid URL: {template}.")]
	InvalidUrl {
		/// Offending template.
		template: String,
	},
	/// Endpoints must use HTTPS.
	#[error("Consent template endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint that failed validation.
		url: String,
	},
	/// Fragments are not allowed in consent templates.
	#[error("Consent template must not contain a fragment.")]
	Fragment,
	/// A query segment is not a `name=value` pair.
	#[error("Consent template segment `{segment}` is not a name=value pair.")]
	MalformedParameter {
		/// Offending query segment.
		segment: String,
	},
	/// A `{placeholder}` name is not recognized.
	#[error("Consent template uses unknown placeholder `{{{name}}}`.")]
	UnknownPlaceholder {
		/// Placeholder name without braces.
		name: String,
	},
	/// A placeholder appears more than once.
	#[error("Consent template uses placeholder `{{{}}}` more than once.", .placeholder.as_str())]
	DuplicatePlaceholder {
		/// Repeated placeholder.
		placeholder: Placeholder,
	},
	/// A required placeholder is absent.
	#[error("Consent template is missing the `{{{}}}` placeholder.", .placeholder.as_str())]
	MissingPlaceholder {
		/// Missing placeholder.
		placeholder: Placeholder,
	},
}

/// Values substituted into consent URL templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placeholder {
	/// `{client_id}`.
	ClientId,
	/// `{redirect_uri}`.
	RedirectUri,
	/// `{state}`.
	State,
	/// `{scope}`.
	Scope,
	/// `{response_type}`.
	ResponseType,
}
impl Placeholder {
	/// Placeholder name as written between braces.
	pub const fn as_str(self) -> &'static str {
		match self {
			Placeholder::ClientId => "client_id",
			Placeholder::RedirectUri => "redirect_uri",
			Placeholder::State => "state",
			Placeholder::Scope => "scope",
			Placeholder::ResponseType => "response_type",
		}
	}

	fn from_name(name: &str) -> Option<Self> {
		match name {
			"client_id" => Some(Placeholder::ClientId),
			"redirect_uri" => Some(Placeholder::RedirectUri),
			"state" => Some(Placeholder::State),
			"scope" => Some(Placeholder::Scope),
			"response_type" => Some(Placeholder::ResponseType),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ParamValue {
	Placeholder(Placeholder),
	Literal(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct TemplateParam {
	name: String,
	value: ParamValue,
}

/// Concrete values for one rendering of a [`ConsentTemplate`].
#[derive(Clone, Copy, Debug)]
pub struct ConsentValues<'a> {
	/// Client identifier.
	pub client_id: &'a str,
	/// Redirect URI, emitted as supplied.
	pub redirect_uri: &'a str,
	/// Anti-forgery state.
	pub state: &'a str,
	/// Joined scope string; `None` omits the parameter.
	pub scope: Option<&'a str>,
}
impl ConsentValues<'_> {
	fn get(&self, placeholder: Placeholder) -> Option<&str> {
		match placeholder {
			Placeholder::ClientId => Some(self.client_id),
			Placeholder::RedirectUri => Some(self.redirect_uri),
			Placeholder::State => Some(self.state),
			Placeholder::Scope => self.scope,
			Placeholder::ResponseType => Some(RESPONSE_TYPE_CODE),
		}
	}
}

/// Parsed authorization endpoint template.
///
/// Grammar: `https://host/path?name={placeholder}&name=literal`. Parameters render in
/// template order through the `application/x-www-form-urlencoded` serializer, so the same
/// inputs always produce the same URL.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsentTemplate {
	source: String,
	endpoint: Url,
	params: Vec<TemplateParam>,
}
impl ConsentTemplate {
	/// Parses and validates a template string.
	pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
		let source = source.into();

		if source.contains('#') {
			return Err(TemplateError::Fragment);
		}

		let (base, query) = source.split_once('?').unwrap_or((source.as_str(), ""));
		let endpoint =
			Url::parse(base).map_err(|_| TemplateError::InvalidUrl { template: source.clone() })?;

		if endpoint.scheme() != "https" {
			return Err(TemplateError::InsecureEndpoint { url: endpoint.to_string() });
		}

		let mut params = Vec::new();
		let mut seen = Vec::new();

		for segment in query.split('&').filter(|segment| !segment.is_empty()) {
			let (raw_name, raw_value) = segment
				.split_once('=')
				.filter(|(name, _)| !name.is_empty())
				.ok_or_else(|| TemplateError::MalformedParameter { segment: segment.to_owned() })?;
			let name = decode_component(raw_name);
			let value = match raw_value.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
				Some(placeholder_name) => {
					let placeholder = Placeholder::from_name(placeholder_name).ok_or_else(|| {
						TemplateError::UnknownPlaceholder { name: placeholder_name.to_owned() }
					})?;

					if seen.contains(&placeholder) {
						return Err(TemplateError::DuplicatePlaceholder { placeholder });
					}

					seen.push(placeholder);

					ParamValue::Placeholder(placeholder)
				},
				None => ParamValue::Literal(decode_component(raw_value)),
			};

			params.push(TemplateParam { name, value });
		}

		if let Some(placeholder) = REQUIRED_PLACEHOLDERS.into_iter().find(|p| !seen.contains(p)) {
			return Err(TemplateError::MissingPlaceholder { placeholder });
		}

		Ok(Self { source, endpoint, params })
	}

	/// Template exactly as configured.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Authorization endpoint without any query parameters.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Returns `true` when the template references `placeholder`.
	pub fn has_placeholder(&self, placeholder: Placeholder) -> bool {
		self.params.iter().any(|param| param.value == ParamValue::Placeholder(placeholder))
	}

	/// Renders the consent URL, appending `extra` pairs after the templated ones.
	///
	/// A scope value without a `{scope}` placeholder is refused so configured scopes are
	/// never silently dropped.
	pub fn render(
		&self,
		values: &ConsentValues<'_>,
		extra: &[(&str, &str)],
	) -> Result<Url, TemplateError> {
		if values.scope.is_some() && !self.has_placeholder(Placeholder::Scope) {
			return Err(TemplateError::MissingPlaceholder { placeholder: Placeholder::Scope });
		}

		let mut url = self.endpoint.clone();

		{
			let mut pairs = url.query_pairs_mut();

			for param in &self.params {
				match &param.value {
					ParamValue::Placeholder(placeholder) =>
						if let Some(value) = values.get(*placeholder) {
							pairs.append_pair(&param.name, value);
						},
					ParamValue::Literal(value) => {
						pairs.append_pair(&param.name, value);
					},
				}
			}
			for (name, value) in extra {
				pairs.append_pair(name, value);
			}
		}

		Ok(url)
	}
}
impl Debug for ConsentTemplate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ConsentTemplate").field(&self.source).finish()
	}
}
impl Display for ConsentTemplate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.source)
	}
}
impl FromStr for ConsentTemplate {
	type Err = TemplateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl TryFrom<String> for ConsentTemplate {
	type Error = TemplateError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}
impl From<ConsentTemplate> for String {
	fn from(value: ConsentTemplate) -> Self {
		value.source
	}
}
impl Serialize for ConsentTemplate {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.source)
	}
}
impl<'de> Deserialize<'de> for ConsentTemplate {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Self::parse(raw).map_err(serde::de::Error::custom)
	}
}

fn decode_component(raw: &str) -> String {
	form_urlencoded::parse(raw.as_bytes())
		.next()
		.map(|(key, value)| if value.is_empty() { key.into_owned() } else { format!("{key}={value}") })
		.unwrap_or_default()
}

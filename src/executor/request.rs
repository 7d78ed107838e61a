//! Transient request/response values passed through the executor.

// crates.io
use oauth2::http::Method;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	config::TargetEnvironment,
	error::ValidationError,
	manager::common::{
		CALLBACK_URL_HEADER, REFERENCE_ID_HEADER, SUBSCRIPTION_KEY_HEADER,
		TARGET_ENVIRONMENT_HEADER,
	},
};

/// Headers the executor derives from the credential, token, and body.
const RESERVED_HEADERS: [&str; 4] =
	["Authorization", SUBSCRIPTION_KEY_HEADER, TARGET_ENVIRONMENT_HEADER, "Content-Type"];

/// Body attached to an [`ApiRequest`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// `application/json` body.
	Json(JsonValue),
	/// `application/x-www-form-urlencoded` body.
	Form(Vec<(String, String)>),
}
impl RequestBody {
	/// Returns the content type and encoded bytes.
	pub(crate) fn encode(&self) -> (Option<&'static str>, Vec<u8>) {
		match self {
			Self::Empty => (None, Vec::new()),
			Self::Json(value) => (Some("application/json"), value.to_string().into_bytes()),
			Self::Form(pairs) => {
				let encoded =
					form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

				(Some("application/x-www-form-urlencoded"), encoded.into_bytes())
			},
		}
	}
}

/// A product request before signing. Never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the credential's base URL (`/collection/v1_0/requesttopay`).
	pub path: String,
	/// Extra headers (`X-Reference-Id`, `X-Callback-Url`, ...).
	pub headers: BTreeMap<String, String>,
	/// Request body.
	pub body: RequestBody,
	/// Overrides the executor's `X-Target-Environment` for this call.
	pub target_environment: Option<TargetEnvironment>,
}
impl ApiRequest {
	/// Creates a request with no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: BTreeMap::new(),
			body: RequestBody::Empty,
			target_environment: None,
		}
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Attaches a JSON body.
	pub fn json(mut self, body: JsonValue) -> Self {
		self.body = RequestBody::Json(body);

		self
	}

	/// Attaches a form body.
	pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		self.body =
			RequestBody::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect());

		self
	}

	/// Adds a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Sets `X-Reference-Id`.
	pub fn reference_id(self, id: impl Display) -> Self {
		self.header(REFERENCE_ID_HEADER, id.to_string())
	}

	/// Sets `X-Callback-Url` when a callback is configured.
	pub fn callback_url(self, url: Option<&Url>) -> Self {
		match url {
			Some(url) => self.header(CALLBACK_URL_HEADER, url.as_str()),
			None => self,
		}
	}

	/// Overrides the target environment for this request.
	pub fn with_target_environment(mut self, environment: TargetEnvironment) -> Self {
		self.target_environment = Some(environment);

		self
	}

	/// Rejects extra headers that would collide with the signing headers.
	pub(crate) fn check_headers(&self) -> Result<(), ValidationError> {
		let reserved = self.headers.keys().find(|name| {
			RESERVED_HEADERS.iter().any(|reserved| name.eq_ignore_ascii_case(reserved))
		});

		if let Some(name) = reserved {
			return Err(ValidationError::new("headers", format!("{name} is set by the executor")));
		}

		Ok(())
	}
}

/// Successful product response. The body is passed through unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Parsed JSON body, [`JsonValue::Null`] when MoMo returned no content.
	pub body: JsonValue,
}
impl ApiResponse {
	/// Decodes the body into `T` with path-aware diagnostics.
	pub fn decode<T>(&self) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		serde_path_to_error::deserialize(&self.body)
			.map_err(|source| Error::Decode { source: Arc::new(source), status: self.status })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn form_body_is_urlencoded() {
		let request = ApiRequest::post("/disbursement/v1_0/bc-authorize")
			.form([("login_hint", "ID:256771234567/MSISDN"), ("scope", "profile")]);
		let (content_type, bytes) = request.body.encode();

		assert_eq!(content_type, Some("application/x-www-form-urlencoded"));
		assert_eq!(
			String::from_utf8(bytes).expect("Form body should be UTF-8."),
			"login_hint=ID%3A256771234567%2FMSISDN&scope=profile"
		);
	}

	#[test]
	fn builders_set_headers() {
		let callback = Url::parse("https://example.org/momo").expect("URL fixture should parse.");
		let request = ApiRequest::get("/collection/v1_0/requesttopay/x")
			.reference_id("abc")
			.callback_url(Some(&callback));

		assert_eq!(request.headers.get("X-Reference-Id").map(String::as_str), Some("abc"));
		assert_eq!(
			request.headers.get("X-Callback-Url").map(String::as_str),
			Some("https://example.org/momo")
		);
		assert_eq!(request.body.encode(), (None, Vec::new()));
	}

	#[test]
	fn reserved_headers_are_rejected() {
		let request = ApiRequest::get("/collection/v1_0/account/balance").reference_id("abc");

		assert!(request.check_headers().is_ok());

		for name in ["authorization", "OCP-APIM-SUBSCRIPTION-KEY", "X-Target-Environment"] {
			let err = request
				.clone()
				.header(name, "override")
				.check_headers()
				.expect_err("Signing headers must not be overridden.");

			assert_eq!(err.field, "headers");
			assert!(err.reason.starts_with(name));
		}
	}

	#[test]
	fn response_decode_reports_path() {
		let response = ApiResponse { status: 200, body: serde_json::json!({ "status": 7 }) };

		#[derive(Debug, Deserialize)]
		struct Status {
			#[allow(dead_code)]
			status: String,
		}

		let err = response.decode::<Status>().expect_err("Wrong type must fail.");

		assert!(matches!(
			err,
			Error::Decode { status: 200, ref source } if source.path().to_string() == "status"
		));
	}
}

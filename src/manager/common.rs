//! Request construction and response classification shared by the manager and executor.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{HttpResponse, http::StatusCode};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{ApiUser, Secret},
	error::ConfigError,
	http,
};

pub(crate) const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
pub(crate) const REFERENCE_ID_HEADER: &str = "X-Reference-Id";
pub(crate) const TARGET_ENVIRONMENT_HEADER: &str = "X-Target-Environment";
pub(crate) const CALLBACK_URL_HEADER: &str = "X-Callback-Url";

/// Appends `path` to `base`, keeping any base path prefix and a trailing slash in `path`.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let mut url = base.clone();

	{
		let mut segments = url
			.path_segments_mut()
			.map_err(|_| ConfigError::UnsupportedBaseUrl { url: base.to_string() })?;

		segments.pop_if_empty();

		for segment in path.trim_start_matches('/').split('/') {
			segments.push(segment);
		}
	}

	Ok(url)
}

/// Builds the `Authorization: Basic` value for an API user/key pair.
pub(crate) fn basic_auth(api_user: &ApiUser, api_key: &Secret) -> String {
	format!("Basic {}", STANDARD.encode(format!("{api_user}:{}", api_key.expose())))
}

/// Extracts MoMo's error code from a failure body (`code`, `error`, then `message`),
/// falling back to the HTTP status.
pub(crate) fn error_code(status: StatusCode, body: &[u8]) -> String {
	serde_json::from_slice::<JsonValue>(body)
		.ok()
		.and_then(|value| {
			["code", "error", "message"]
				.into_iter()
				.find_map(|field| value.get(field).and_then(JsonValue::as_str).map(str::to_owned))
		})
		.unwrap_or_else(|| status.as_u16().to_string())
}

/// Decodes a JSON body with path-aware diagnostics.
pub(crate) fn decode<T>(response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| Error::Decode {
		source: Arc::new(source),
		status: response.status().as_u16(),
	})
}

/// Converts a non-2xx response into [`Error::Server`].
pub(crate) fn server_error(response: &HttpResponse) -> Error {
	Error::Server {
		status: response.status().as_u16(),
		body: String::from_utf8_lossy(response.body()).into_owned(),
		retry_after: http::parse_retry_after(response.headers()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base(raw: &str) -> Url {
		Url::parse(raw).expect("Base URL fixture should parse.")
	}

	#[test]
	fn endpoint_keeps_prefix_and_trailing_slash() {
		let url = endpoint(&base("https://sandbox.momodeveloper.mtn.com"), "/collection/token/")
			.expect("Endpoint should build.");

		assert_eq!(url.as_str(), "https://sandbox.momodeveloper.mtn.com/collection/token/");

		let url = endpoint(&base("https://proxy.example.com/momo/"), "/v1_0/apiuser")
			.expect("Endpoint should build.");

		assert_eq!(url.as_str(), "https://proxy.example.com/momo/v1_0/apiuser");
	}

	#[test]
	fn basic_auth_encodes_pair() {
		let user: ApiUser =
			"c72025f5-5cd1-4630-99e4-8ba4722fad56".parse().expect("UUID fixture should parse.");

		assert_eq!(
			basic_auth(&user, &Secret::new("key")),
			format!("Basic {}", STANDARD.encode("c72025f5-5cd1-4630-99e4-8ba4722fad56:key"))
		);
	}

	#[test]
	fn error_code_prefers_code_then_error_then_message() {
		let status = StatusCode::UNAUTHORIZED;

		assert_eq!(
			error_code(status, br#"{"code":"RESOURCE_NOT_FOUND","error":"x"}"#),
			"RESOURCE_NOT_FOUND"
		);
		assert_eq!(error_code(status, br#"{"error":"login_failed"}"#), "login_failed");
		assert_eq!(error_code(status, br#"{"message":"Access denied"}"#), "Access denied");
		assert_eq!(error_code(status, b"<html>"), "401");
	}
}

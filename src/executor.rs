//! Signed request executor.
//!
//! [`SignedRequestExecutor`] attaches the bearer token, subscription key, and target
//! environment to every product request. When MoMo rejects the bearer with HTTP 401 the
//! executor clears that exact token from the cache, fetches a fresh one, and retries once;
//! a second 401 surfaces as [`AuthError::Unauthorized`]. Other failures are never retried.

pub mod request;

pub use request::*;

// std
use std::{future, pin::pin};
// crates.io
use futures::future::{Either, select};
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		Request, StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credential},
	config::TargetEnvironment,
	error::{AuthError, ConfigError, TransportError},
	http::{self, ApiHttpClient, TransportErrorMapper},
	manager::{
		AuthManager,
		common::{self, SUBSCRIPTION_KEY_HEADER, TARGET_ENVIRONMENT_HEADER},
	},
	obs::{self, OperationKind},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Executor specialized for the crate's default reqwest transport stack.
pub type ReqwestExecutor = SignedRequestExecutor<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Sends product requests signed with the credential's current bearer token.
pub struct SignedRequestExecutor<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Manager owning the token cache shared with this executor.
	pub manager: AuthManager<C, M>,
	/// Default `X-Target-Environment` value.
	pub target_environment: TargetEnvironment,
}
impl<C, M> SignedRequestExecutor<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an executor over `manager`.
	pub fn new(manager: AuthManager<C, M>, target_environment: TargetEnvironment) -> Self {
		Self { manager, target_environment }
	}

	/// Executes `request` for `credential`, retrying once if the bearer token is rejected.
	pub async fn execute(
		&self,
		credential: &Credential,
		request: ApiRequest,
	) -> Result<ApiResponse> {
		self.execute_with_cancel(credential, request, future::pending()).await
	}

	/// Like [`execute`](Self::execute), but aborts when `cancel` completes first.
	///
	/// Cancellation drops the in-flight HTTP future and returns
	/// [`TransportError::Cancelled`]; nothing is retried afterwards.
	pub async fn execute_with_cancel<F>(
		&self,
		credential: &Credential,
		request: ApiRequest,
		cancel: F,
	) -> Result<ApiResponse>
	where
		F: Future<Output = ()>,
	{
		obs::observe(OperationKind::Execute, credential.product, async {
			let work = pin!(self.execute_signed(credential, &request));
			let cancel = pin!(cancel);

			match select(work, cancel).await {
				Either::Left((result, _)) => result,
				Either::Right(((), _)) => Err(TransportError::Cancelled.into()),
			}
		})
		.await
	}

	/// Sends `request` once with a caller-supplied bearer token (e.g. a consent token).
	///
	/// The token is not tied to the credential's cache, so a 401 surfaces immediately.
	pub async fn execute_with_token(
		&self,
		credential: &Credential,
		request: ApiRequest,
		token: &AccessToken,
	) -> Result<ApiResponse> {
		obs::observe(OperationKind::Execute, credential.product, async {
			credential.validate()?;
			request.check_headers()?;

			let response = self.send(credential, &request, token).await?;

			if response.status() == StatusCode::UNAUTHORIZED {
				return Err(unauthorized(&response));
			}

			finish(&response)
		})
		.await
	}

	async fn execute_signed(
		&self,
		credential: &Credential,
		request: &ApiRequest,
	) -> Result<ApiResponse> {
		request.check_headers()?;

		let token = self.manager.get_token(credential).await?;
		let response = self.send(credential, request, &token).await?;

		if response.status() != StatusCode::UNAUTHORIZED {
			return finish(&response);
		}

		self.manager.invalidate_if(credential, &token);
		obs::record_auth_retry(credential.product);

		let token = self.manager.get_token(credential).await?;
		let response = self.send(credential, request, &token).await?;

		if response.status() == StatusCode::UNAUTHORIZED {
			return Err(unauthorized(&response));
		}

		finish(&response)
	}

	async fn send(
		&self,
		credential: &Credential,
		request: &ApiRequest,
		token: &AccessToken,
	) -> Result<HttpResponse> {
		let signed = self.sign(credential, request, token)?;

		http::send(
			self.manager.http_client.as_ref(),
			self.manager.transport_mapper.as_ref(),
			"execute",
			signed,
		)
		.await
	}

	fn sign(
		&self,
		credential: &Credential,
		request: &ApiRequest,
		token: &AccessToken,
	) -> Result<HttpRequest, ConfigError> {
		let url = common::endpoint(&credential.base_url, &request.path)?;
		let environment = request.target_environment.as_ref().unwrap_or(&self.target_environment);
		let (content_type, body) = request.body.encode();
		let mut builder = Request::builder()
			.method(request.method.clone())
			.uri(url.as_str())
			.header(AUTHORIZATION, token.bearer_header())
			.header(SUBSCRIPTION_KEY_HEADER, credential.subscription_key.expose())
			.header(TARGET_ENVIRONMENT_HEADER, environment.as_str());

		if let Some(content_type) = content_type {
			builder = builder.header(CONTENT_TYPE, content_type);
		}
		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		Ok(builder.body(body)?)
	}
}
impl<C, M> Clone for SignedRequestExecutor<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { manager: self.manager.clone(), target_environment: self.target_environment.clone() }
	}
}
impl<C, M> Debug for SignedRequestExecutor<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignedRequestExecutor")
			.field("manager", &self.manager)
			.field("target_environment", &self.target_environment)
			.finish()
	}
}

fn finish(response: &HttpResponse) -> Result<ApiResponse> {
	if !response.status().is_success() {
		return Err(common::server_error(response));
	}

	let status = response.status().as_u16();
	let body = if response.body().iter().all(u8::is_ascii_whitespace) {
		JsonValue::Null
	} else {
		common::decode(response)?
	};

	Ok(ApiResponse { status, body })
}

fn unauthorized(response: &HttpResponse) -> Error {
	AuthError::Unauthorized {
		status: response.status().as_u16(),
		code: common::error_code(response.status(), response.body()),
	}
	.into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: StatusCode, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}

	#[test]
	fn finish_passes_body_through() {
		let ok = finish(&response(StatusCode::OK, r#"{"status":"SUCCESSFUL","extra":[1,2]}"#))
			.expect("2xx should succeed.");

		assert_eq!(ok.body, serde_json::json!({ "status": "SUCCESSFUL", "extra": [1, 2] }));
		assert_eq!(
			finish(&response(StatusCode::ACCEPTED, "")).expect("Empty 202 should succeed.").body,
			JsonValue::Null
		);
	}

	#[test]
	fn finish_maps_failures_to_server_errors() {
		let mut throttled = response(StatusCode::TOO_MANY_REQUESTS, "slow down");

		throttled.headers_mut().insert("retry-after", "5".parse().expect("Header should parse."));

		assert!(matches!(
			finish(&throttled),
			Err(Error::Server { status: 429, ref body, retry_after: Some(retry) })
				if body == "slow down" && retry == Duration::seconds(5)
		));
		assert!(matches!(
			finish(&response(StatusCode::OK, "not json")),
			Err(Error::Decode { status: 200, .. })
		));
	}
}

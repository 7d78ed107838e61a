//! Bearer token exchange with caching and single-flight refresh.

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credential},
	error::{AuthError, ConfigError, ValidationError},
	http::{self, ApiHttpClient, TransportErrorMapper},
	manager::{
		AuthManager,
		common::{self, SUBSCRIPTION_KEY_HEADER},
	},
	obs::{self, OperationKind},
};

const CIBA_GRANT_TYPE: &str = "urn:openid:params:grant-type:ciba";

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
}

impl<C, M> AuthManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a token valid for at least the refresh margin, exchanging a new one if needed.
	///
	/// Concurrent callers that find the cache empty or stale wait on the credential's
	/// single-flight guard; only the first one contacts MoMo and the rest receive its outcome,
	/// whether a token or an error. A freshly issued token shorter-lived than the margin is
	/// returned but never reused.
	pub async fn get_token(&self, credential: &Credential) -> Result<AccessToken> {
		obs::observe(OperationKind::Token, credential.product, async {
			credential.validate()?;

			let session = self.session(credential);
			let seen = session.exchanges();

			if let Some(token) =
				session.usable_token(OffsetDateTime::now_utc(), self.refresh_margin)?
			{
				self.metrics.record_cache_hit();

				return Ok(token);
			}

			let _singleflight = session.guard.lock().await;

			if let Some(token) =
				session.usable_token(OffsetDateTime::now_utc(), self.refresh_margin)?
			{
				self.metrics.record_cache_hit();

				return Ok(token);
			}
			// Another caller finished an exchange while this one waited on the guard.
			match session.exchange_since(seen) {
				Some(Ok(token)) if !token.is_expired_at(OffsetDateTime::now_utc()) => {
					self.metrics.record_cache_hit();

					return Ok(token);
				},
				Some(Err(e)) => return Err(e),
				_ => {},
			}

			let (api_user, api_key) = session.keys()?;
			let url = common::endpoint(&credential.base_url, &credential.product.token_path())?;
			let request = Request::builder()
				.method(Method::POST)
				.uri(url.as_str())
				.header(AUTHORIZATION, common::basic_auth(&api_user, &api_key))
				.header(SUBSCRIPTION_KEY_HEADER, credential.subscription_key.expose())
				.body(Vec::new())
				.map_err(ConfigError::from)?;

			self.metrics.record_exchange();

			let outcome = self.exchange(request, "token").await;

			if outcome.is_err() {
				self.metrics.record_failure();
			}

			session.record_exchange(&outcome)?;

			outcome
		})
		.await
	}

	/// Exchanges a CIBA `auth_req_id` for a consent-scoped access token.
	///
	/// Consent tokens belong to a single customer authorization, so they are never cached.
	pub async fn consent_token(
		&self,
		credential: &Credential,
		auth_req_id: &str,
	) -> Result<AccessToken> {
		obs::observe(OperationKind::Consent, credential.product, async {
			credential.validate()?;

			if auth_req_id.trim().is_empty() {
				return Err(ValidationError::new("auth_req_id", "cannot be empty").into());
			}

			let (api_user, api_key) = self.session(credential).keys()?;
			let body = form_urlencoded::Serializer::new(String::new())
				.append_pair("grant_type", CIBA_GRANT_TYPE)
				.append_pair("auth_req_id", auth_req_id)
				.finish()
				.into_bytes();
			let url =
				common::endpoint(&credential.base_url, &credential.product.consent_token_path())?;
			let request = Request::builder()
				.method(Method::POST)
				.uri(url.as_str())
				.header(AUTHORIZATION, common::basic_auth(&api_user, &api_key))
				.header(SUBSCRIPTION_KEY_HEADER, credential.subscription_key.expose())
				.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
				.body(body)
				.map_err(ConfigError::from)?;

			self.exchange(request, "consent_token").await
		})
		.await
	}

	async fn exchange(&self, request: HttpRequest, operation: &'static str) -> Result<AccessToken> {
		let response = http::send(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			operation,
			request,
		)
		.await?;

		parse_token_response(&response, OffsetDateTime::now_utc())
	}
}

fn parse_token_response(response: &HttpResponse, issued_at: OffsetDateTime) -> Result<AccessToken> {
	if !response.status().is_success() {
		return Err(AuthError::TokenRejected {
			status: response.status().as_u16(),
			code: common::error_code(response.status(), response.body()),
		}
		.into());
	}

	let TokenResponse { access_token, token_type, expires_in } = common::decode(response)?;
	let expires_in = expires_in.ok_or(ConfigError::MissingExpiresIn)?;
	let token = AccessToken::new(
		access_token,
		token_type.unwrap_or_else(|| "access_token".into()),
		issued_at,
		Duration::seconds(expires_in),
	)?;

	Ok(token)
}

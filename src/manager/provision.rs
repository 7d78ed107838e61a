//! API user and API key provisioning.
//!
//! Provisioning registers an API user under a caller-chosen (or random) UUID and then asks
//! MoMo to derive an API key for it. Both halves live in the credential's session; the
//! caller's [`Credential`] value is never mutated.

// crates.io
use oauth2::http::{Method, Request, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::{ApiUser, Credential, Secret},
	error::{AuthError, ConfigError},
	http::{self, ApiHttpClient, TransportErrorMapper},
	manager::{
		AuthManager,
		common::{self, REFERENCE_ID_HEADER, SUBSCRIPTION_KEY_HEADER},
		session::Session,
	},
	obs::{self, OperationKind},
};

/// Registration details MoMo reports for a provisioned API user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUserInfo {
	/// Callback host registered for the user.
	#[serde(default)]
	pub provider_callback_host: Option<String>,
	/// Environment the user was created in.
	pub target_environment: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeyResponse {
	api_key: String,
}

impl<C, M> AuthManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Ensures `credential` has an API user/key pair and returns the API user.
	///
	/// Already provisioned credentials return immediately without any network call. When
	/// the API user was registered but the key request failed, a retry only requests the key.
	pub async fn provision(&self, credential: &Credential) -> Result<ApiUser> {
		obs::observe(OperationKind::Provision, credential.product, async {
			credential.validate()?;

			let session = self.session(credential);

			if let Some(api_user) = session.provisioned_user()? {
				return Ok(api_user);
			}

			let _singleflight = session.guard.lock().await;

			if let Some(api_user) = session.provisioned_user()? {
				return Ok(api_user);
			}

			let api_user = match session.registered_user() {
				Some(api_user) => api_user,
				None => self.register_api_user(credential, &session).await?,
			};
			let api_key = self.create_api_key(credential, &api_user).await?;

			session.store_api_key(api_key)?;

			Ok(api_user)
		})
		.await
	}

	/// Fetches the registration of the credential's API user (`GET /v1_0/apiuser/{id}`).
	pub async fn api_user_info(&self, credential: &Credential) -> Result<ApiUserInfo> {
		credential.validate()?;

		let session = self.session(credential);
		let (api_user, _) = session.keys()?;
		let url =
			common::endpoint(&credential.base_url, &format!("/v1_0/apiuser/{api_user}"))?;
		let request = Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(SUBSCRIPTION_KEY_HEADER, credential.subscription_key.expose())
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = http::send(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			"api_user_info",
			request,
		)
		.await?;

		match response.status().as_u16() {
			200..=299 => common::decode(&response),
			status @ (401 | 403) => Err(AuthError::ProvisioningRejected {
				status,
				code: common::error_code(response.status(), response.body()),
			}
			.into()),
			_ => Err(common::server_error(&response)),
		}
	}

	async fn register_api_user(
		&self,
		credential: &Credential,
		session: &Session,
	) -> Result<ApiUser> {
		let api_user = credential.api_user.unwrap_or_else(ApiUser::generate);
		let url = common::endpoint(&credential.base_url, "/v1_0/apiuser")?;
		let body =
			serde_json::json!({ "providerCallbackHost": self.callback_host }).to_string().into_bytes();
		let request = Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(REFERENCE_ID_HEADER, api_user.to_string())
			.header(SUBSCRIPTION_KEY_HEADER, credential.subscription_key.expose())
			.header(CONTENT_TYPE, "application/json")
			.body(body)
			.map_err(ConfigError::from)?;
		let response = http::send(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			"create_api_user",
			request,
		)
		.await?;

		if !response.status().is_success() {
			return Err(AuthError::ProvisioningRejected {
				status: response.status().as_u16(),
				code: common::error_code(response.status(), response.body()),
			}
			.into());
		}

		session.mark_registered(api_user)?;

		Ok(api_user)
	}

	async fn create_api_key(&self, credential: &Credential, api_user: &ApiUser) -> Result<Secret> {
		let url =
			common::endpoint(&credential.base_url, &format!("/v1_0/apiuser/{api_user}/apikey"))?;
		let request = Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(SUBSCRIPTION_KEY_HEADER, credential.subscription_key.expose())
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = http::send(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			"create_api_key",
			request,
		)
		.await?;

		if !response.status().is_success() {
			return Err(AuthError::ProvisioningRejected {
				status: response.status().as_u16(),
				code: common::error_code(response.status(), response.body()),
			}
			.into());
		}

		let ApiKeyResponse { api_key } = common::decode(&response)?;

		Ok(Secret::new(api_key))
	}
}

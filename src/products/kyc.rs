//! KYC: basic account holder info, identity validation, and CIBA consent flows.
//!
//! Consent runs in two steps. [`Kyc::request_consent`] starts a `bc-authorize` request the
//! customer approves on their handset; [`Kyc::detailed_user_info`] later trades the returned
//! `auth_req_id` for a consent token and reads the OpenID userinfo document with it.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::ValidationError,
	executor::{ApiRequest, SignedRequestExecutor},
	http::{ApiHttpClient, TransportErrorMapper},
	products::Msisdn,
};

/// Default consent scope.
pub const DEFAULT_CONSENT_SCOPE: &str = "all_info";
/// Default consent validity, in seconds.
pub const DEFAULT_CONSENT_SECS: u32 = 3_600;

/// Basic account holder information.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasicUserInfo {
	/// Given name.
	#[serde(default)]
	pub given_name: Option<String>,
	/// Family name.
	#[serde(default)]
	pub family_name: Option<String>,
	/// Birth date (`YYYY-MM-DD`).
	#[serde(default)]
	pub birthdate: Option<String>,
	/// Preferred locale.
	#[serde(default)]
	pub locale: Option<String>,
	/// Gender marker.
	#[serde(default)]
	pub gender: Option<String>,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: BTreeMap<String, JsonValue>,
}
impl BasicUserInfo {
	/// Joins given and family names with a single space.
	pub fn full_name(&self) -> String {
		[self.given_name.as_deref(), self.family_name.as_deref()]
			.into_iter()
			.flatten()
			.map(str::trim)
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>()
			.join(" ")
	}

	/// Compares names case-insensitively and, when given, the birth date exactly.
	pub fn matches(&self, full_name: &str, birth_date: Option<&str>) -> bool {
		let name_match = self.full_name().to_lowercase() == full_name.trim().to_lowercase();

		match birth_date {
			Some(expected) => name_match && self.birthdate.as_deref() == Some(expected),
			None => name_match,
		}
	}
}

/// Parameters of a CIBA consent request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsentRequest {
	/// Customer asked for consent.
	pub msisdn: Msisdn,
	/// Requested scope.
	pub scope: String,
	/// Consent validity in seconds.
	pub validity_secs: u32,
}
impl ConsentRequest {
	/// Creates a request with the default scope and validity.
	pub fn new(msisdn: Msisdn) -> Self {
		Self { msisdn, scope: DEFAULT_CONSENT_SCOPE.into(), validity_secs: DEFAULT_CONSENT_SECS }
	}

	/// Overrides the requested scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Overrides the validity window.
	pub fn with_validity_secs(mut self, secs: u32) -> Self {
		self.validity_secs = secs;

		self
	}

	fn validate(&self) -> Result<(), ValidationError> {
		if self.scope.trim().is_empty() {
			return Err(ValidationError::new("scope", "cannot be empty"));
		}
		if self.validity_secs == 0 {
			return Err(ValidationError::new("expires_in", "must be positive"));
		}

		Ok(())
	}
}

/// Ticket returned by `bc-authorize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentTicket {
	/// Identifier to exchange once the customer approves.
	pub auth_req_id: String,
	/// Suggested polling interval in seconds.
	#[serde(default)]
	pub interval: Option<u64>,
	/// Seconds until the request lapses.
	#[serde(default)]
	pub expires_in: Option<u64>,
}

/// OpenID userinfo document released after consent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
	/// Subject identifier.
	#[serde(default)]
	pub sub: Option<String>,
	/// Full name.
	#[serde(default)]
	pub name: Option<String>,
	/// Given name.
	#[serde(default)]
	pub given_name: Option<String>,
	/// Family name.
	#[serde(default)]
	pub family_name: Option<String>,
	/// Birth date (`YYYY-MM-DD`).
	#[serde(default)]
	pub birthdate: Option<String>,
	/// Email address.
	#[serde(default)]
	pub email: Option<String>,
	/// Whether the email was verified.
	#[serde(default)]
	pub email_verified: Option<bool>,
	/// Remaining fields (national id, address, balances, ...).
	#[serde(flatten)]
	pub extra: BTreeMap<String, JsonValue>,
}

/// KYC client. Runs against the Disbursement credential.
pub struct Kyc<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	executor: SignedRequestExecutor<C, M>,
	credential: Credential,
}
impl<C, M> Kyc<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client for a Disbursement `credential`.
	pub fn new(executor: SignedRequestExecutor<C, M>, credential: Credential) -> Self {
		Self { executor, credential }
	}

	/// Credential used for every call.
	pub fn credential(&self) -> &Credential {
		&self.credential
	}

	/// Fetches basic information about the account holder behind `msisdn`.
	pub async fn basic_user_info(&self, msisdn: &Msisdn) -> Result<BasicUserInfo> {
		let path = format!(
			"/{}/v1_0/accountholder/msisdn/{msisdn}/basicuserinfo",
			self.credential.product
		);

		self.executor.execute(&self.credential, ApiRequest::get(path)).await?.decode()
	}

	/// Checks `full_name` (and optionally `birth_date`) against MoMo's records.
	pub async fn validate_identity(
		&self,
		msisdn: &Msisdn,
		full_name: &str,
		birth_date: Option<&str>,
	) -> Result<bool> {
		if full_name.trim().is_empty() {
			return Err(ValidationError::new("full_name", "cannot be empty").into());
		}

		Ok(self.basic_user_info(msisdn).await?.matches(full_name, birth_date))
	}

	/// Starts a CIBA consent request the customer approves on their handset.
	pub async fn request_consent(&self, request: &ConsentRequest) -> Result<ConsentTicket> {
		request.validate()?;

		let api_request =
			ApiRequest::post(format!("/{}/v1_0/bc-authorize", self.credential.product)).form([
				("scope", request.scope.clone()),
				("login_hint", format!("ID:{}/MSISDN", request.msisdn)),
				("access_type", "offline".into()),
				("expires_in", request.validity_secs.to_string()),
			]);

		self.executor.execute(&self.credential, api_request).await?.decode()
	}

	/// Exchanges an approved `auth_req_id` and reads the consented userinfo document.
	pub async fn detailed_user_info(&self, auth_req_id: &str) -> Result<UserInfo> {
		let token = self.executor.manager.consent_token(&self.credential, auth_req_id).await?;
		let path = format!("/{}/oauth2/v1_0/userinfo", self.credential.product);

		self.executor
			.execute_with_token(&self.credential, ApiRequest::get(path), &token)
			.await?
			.decode()
	}
}
impl<C, M> Debug for Kyc<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Kyc").field("credential", &self.credential).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn info(given: &str, family: &str, birthdate: Option<&str>) -> BasicUserInfo {
		BasicUserInfo {
			given_name: Some(given.into()),
			family_name: Some(family.into()),
			birthdate: birthdate.map(str::to_owned),
			locale: None,
			gender: None,
			extra: BTreeMap::new(),
		}
	}

	#[test]
	fn identity_match_ignores_case() {
		let info = info("Sand", "Box", Some("1976-08-13"));

		assert_eq!(info.full_name(), "Sand Box");
		assert!(info.matches("sand box", None));
		assert!(info.matches("SAND BOX", Some("1976-08-13")));
		assert!(!info.matches("sand box", Some("1980-01-01")));
		assert!(!info.matches("other name", None));
	}

	#[test]
	fn basic_info_keeps_unknown_fields() {
		let info: BasicUserInfo = serde_json::from_value(serde_json::json!({
			"given_name": "Sand",
			"family_name": "Box",
			"status": "ACTIVE",
		}))
		.expect("Info should decode.");

		assert_eq!(info.extra.get("status"), Some(&serde_json::json!("ACTIVE")));
		assert_eq!(info.birthdate, None);
	}

	#[test]
	fn consent_request_validates_before_io() {
		let msisdn = Msisdn::new("256771234567").expect("MSISDN should parse.");

		assert!(ConsentRequest::new(msisdn.clone()).validate().is_ok());
		assert!(ConsentRequest::new(msisdn.clone()).with_scope(" ").validate().is_err());
		assert!(ConsentRequest::new(msisdn).with_validity_secs(0).validate().is_err());
	}
}

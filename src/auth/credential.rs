//! Product credentials and the keys that identify their sessions.

// std
use std::ops::Deref;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{Product, token::secret::Secret},
	error::{ConfigError, ValidationError},
};

/// MoMo API user identifier (a UUID v4 chosen by the caller at provisioning time).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiUser(Uuid);
impl ApiUser {
	/// Generates a fresh random API user reference.
	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	/// Wraps an existing UUID.
	pub fn from_uuid(id: Uuid) -> Self {
		Self(id)
	}
}
impl Deref for ApiUser {
	type Target = Uuid;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for ApiUser {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ApiUser({})", self.0)
	}
}
impl Display for ApiUser {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0.hyphenated(), f)
	}
}
impl FromStr for ApiUser {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(s.trim())
			.map(Self)
			.map_err(|source| ConfigError::InvalidApiUser { value: s.to_owned(), source })
	}
}

/// Static credential material for one MoMo product.
///
/// `api_user`/`api_key` are optional: a credential without them is provisioned by
/// [`AuthManager::provision`](crate::manager::AuthManager::provision), which keeps the
/// resulting pair in the manager's session rather than mutating this value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Product the credential belongs to.
	pub product: Product,
	/// `Ocp-Apim-Subscription-Key` issued for the product.
	pub subscription_key: Secret,
	/// API user reference, when known ahead of provisioning.
	pub api_user: Option<ApiUser>,
	/// API key paired with `api_user`, when already issued.
	pub api_key: Option<Secret>,
	/// Base URL of the MoMo deployment.
	pub base_url: Url,
}
impl Credential {
	/// Creates an unprovisioned credential.
	pub fn new(product: Product, base_url: Url, subscription_key: impl Into<Secret>) -> Self {
		Self {
			product,
			subscription_key: subscription_key.into(),
			api_user: None,
			api_key: None,
			base_url,
		}
	}

	/// Pins the API user reference used when provisioning.
	pub fn with_api_user(mut self, api_user: ApiUser) -> Self {
		self.api_user = Some(api_user);

		self
	}

	/// Supplies an API key issued out of band (e.g. the partner portal).
	pub fn with_api_key(mut self, api_key: impl Into<Secret>) -> Self {
		self.api_key = Some(api_key.into());

		self
	}

	/// Returns `true` when both the API user and key are present.
	pub fn is_provisioned(&self) -> bool {
		self.api_user.is_some() && self.api_key.is_some()
	}

	/// Session key for this credential.
	pub fn key(&self) -> CredentialKey {
		CredentialKey::new(self)
	}

	/// Rejects credential material that can never authenticate.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.subscription_key.is_blank() {
			return Err(ValidationError::new("subscription_key", "cannot be empty"));
		}
		if self.subscription_key.expose().chars().any(char::is_whitespace) {
			return Err(ValidationError::new("subscription_key", "cannot contain whitespace"));
		}
		if self.api_key.as_ref().is_some_and(Secret::is_blank) {
			return Err(ValidationError::new("api_key", "cannot be empty"));
		}

		Ok(())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("product", &self.product)
			.field("subscription_key", &"<redacted>")
			.field("api_user", &self.api_user)
			.field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
			.field("base_url", &self.base_url.as_str())
			.finish()
	}
}

/// Identifies the auth manager session owning a credential's token cache.
///
/// The key stores a SHA-256 fingerprint of the base URL and subscription key so session
/// maps never hold raw secrets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialKey {
	/// Product component.
	pub product: Product,
	/// Base64 (no padding) SHA-256 digest of the base URL and subscription key.
	pub fingerprint: String,
}
impl CredentialKey {
	/// Builds the key for `credential`.
	pub fn new(credential: &Credential) -> Self {
		let mut hasher = Sha256::new();

		hasher.update(credential.product.as_str().as_bytes());
		hasher.update([0]);
		hasher.update(credential.base_url.as_str().as_bytes());
		hasher.update([0]);
		hasher.update(credential.subscription_key.expose().as_bytes());

		Self { product: credential.product, fingerprint: STANDARD_NO_PAD.encode(hasher.finalize()) }
	}
}

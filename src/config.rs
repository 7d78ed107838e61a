//! Credential store: static configuration for every configured MoMo product.
//!
//! The store is an explicitly constructed value passed by reference to the client; there is
//! no global configuration. Build it with [`CredentialStore::builder`] or load it from the
//! process environment with [`CredentialStore::from_env`]:
//!
//! | Variable              | Default                                  |
//! |-----------------------|------------------------------------------|
//! | `MOMO_BASE_URL`       | `https://sandbox.momodeveloper.mtn.com`  |
//! | `MOMO_ENVIRONMENT`    | `sandbox`                                |
//! | `CALLBACK_HOST`       | unset                                    |
//! | `COLLECTION_KEY`      | unset (product disabled)                 |
//! | `DISBURSEMENT_KEY`    | unset (product disabled)                 |
//! | `REMITTANCE_KEY`      | unset (product disabled)                 |
//! | `{PRODUCT}_API_USER`  | unset (provisioned at runtime)           |
//! | `{PRODUCT}_API_KEY`   | unset (provisioned at runtime)           |

// self
use crate::{
	_prelude::*,
	auth::{ApiUser, Credential, Product, Secret},
	error::ConfigError,
};

/// Default MoMo sandbox deployment.
pub const DEFAULT_BASE_URL: &str = "https://sandbox.momodeveloper.mtn.com";
/// Default `X-Target-Environment` value.
pub const DEFAULT_TARGET_ENVIRONMENT: &str = "sandbox";

/// Value of the `X-Target-Environment` header (`sandbox`, `mtnuganda`, ...).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetEnvironment(String);
impl TargetEnvironment {
	/// Validates and wraps an environment name.
	pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
		let value = value.into();

		if value.is_empty() || !value.chars().all(|ch| ch.is_ascii_graphic()) {
			return Err(ConfigError::InvalidEnvironment { value });
		}

		Ok(Self(value))
	}

	/// The MoMo sandbox environment.
	pub fn sandbox() -> Self {
		Self(DEFAULT_TARGET_ENVIRONMENT.into())
	}

	/// Returns the header value.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns `true` for the sandbox environment.
	pub fn is_sandbox(&self) -> bool {
		self.0 == DEFAULT_TARGET_ENVIRONMENT
	}
}
impl Default for TargetEnvironment {
	fn default() -> Self {
		Self::sandbox()
	}
}
impl TryFrom<String> for TargetEnvironment {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<TargetEnvironment> for String {
	fn from(value: TargetEnvironment) -> Self {
		value.0
	}
}
impl Debug for TargetEnvironment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TargetEnvironment({})", self.0)
	}
}
impl Display for TargetEnvironment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Validated configuration for all configured products.
#[derive(Clone, Debug)]
pub struct CredentialStore {
	/// Base URL shared by every product.
	pub base_url: Url,
	/// Value sent as `X-Target-Environment`.
	pub target_environment: TargetEnvironment,
	/// Host registered as `providerCallbackHost` when provisioning API users.
	pub callback_host: Option<String>,
	/// Safety margin subtracted from token expiry before reuse.
	pub token_refresh_margin: Duration,
	credentials: BTreeMap<Product, Credential>,
}
impl CredentialStore {
	/// Default token refresh margin.
	pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(60);

	/// Creates an empty builder.
	pub fn builder() -> CredentialStoreBuilder {
		CredentialStoreBuilder::default()
	}

	/// Loads the store from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads the store through an arbitrary variable lookup (env, files, test maps).
	///
	/// Empty values are treated as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |name: &str| {
			lookup(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
		};
		let base_url = get("MOMO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
		let mut builder = Self::builder()
			.base_url(Url::parse(&base_url).map_err(|source| ConfigError::InvalidBaseUrl { source })?);

		if let Some(environment) = get("MOMO_ENVIRONMENT") {
			builder = builder.target_environment(TargetEnvironment::new(environment)?);
		}
		if let Some(host) = get("CALLBACK_HOST") {
			builder = builder.callback_host(host);
		}

		for product in Product::ALL {
			let prefix = product.env_prefix();

			if let Some(key) = get(&format!("{prefix}_KEY")) {
				builder = builder.subscription_key(product, key);
			}
			if let Some(user) = get(&format!("{prefix}_API_USER")) {
				builder = builder.api_user(product, user.parse()?);
			}
			if let Some(key) = get(&format!("{prefix}_API_KEY")) {
				builder = builder.api_key(product, key);
			}
		}

		builder.build()
	}

	/// Returns the credential configured for `product`.
	pub fn credential(&self, product: Product) -> Result<&Credential, ConfigError> {
		self.credentials.get(&product).ok_or(ConfigError::MissingSubscriptionKey { product })
	}

	/// Returns `true` if `product` has a subscription key.
	pub fn supports(&self, product: Product) -> bool {
		self.credentials.contains_key(&product)
	}

	/// Iterates over configured credentials in product order.
	pub fn credentials(&self) -> impl Iterator<Item = &Credential> {
		self.credentials.values()
	}
}

/// Builder for [`CredentialStore`].
#[derive(Debug, Default)]
pub struct CredentialStoreBuilder {
	base_url: Option<Url>,
	target_environment: Option<TargetEnvironment>,
	callback_host: Option<String>,
	token_refresh_margin: Option<Duration>,
	subscription_keys: BTreeMap<Product, Secret>,
	api_users: BTreeMap<Product, ApiUser>,
	api_keys: BTreeMap<Product, Secret>,
}
impl CredentialStoreBuilder {
	/// Sets the base URL (defaults to the MoMo sandbox).
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the `X-Target-Environment` value (defaults to `sandbox`).
	pub fn target_environment(mut self, environment: TargetEnvironment) -> Self {
		self.target_environment = Some(environment);

		self
	}

	/// Sets the provider callback host registered during provisioning.
	pub fn callback_host(mut self, host: impl Into<String>) -> Self {
		self.callback_host = Some(host.into());

		self
	}

	/// Overrides the token refresh margin (negative values clamp to zero).
	pub fn token_refresh_margin(mut self, margin: Duration) -> Self {
		self.token_refresh_margin = Some(if margin.is_negative() { Duration::ZERO } else { margin });

		self
	}

	/// Enables `product` with its subscription key.
	pub fn subscription_key(mut self, product: Product, key: impl Into<Secret>) -> Self {
		self.subscription_keys.insert(product, key.into());

		self
	}

	/// Pins the API user for `product`.
	pub fn api_user(mut self, product: Product, api_user: ApiUser) -> Self {
		self.api_users.insert(product, api_user);

		self
	}

	/// Supplies an out-of-band API key for `product`.
	pub fn api_key(mut self, product: Product, key: impl Into<Secret>) -> Self {
		self.api_keys.insert(product, key.into());

		self
	}

	/// Consumes the builder and validates the resulting store.
	pub fn build(self) -> Result<CredentialStore, ConfigError> {
		let base_url = match self.base_url {
			Some(url) => url,
			None => Url::parse(DEFAULT_BASE_URL)
				.map_err(|source| ConfigError::InvalidBaseUrl { source })?,
		};

		validate_base_url(&base_url)?;

		for product in self.api_keys.keys() {
			if !self.api_users.contains_key(product) {
				return Err(ConfigError::ApiKeyWithoutUser { product: *product });
			}
		}

		let mut credentials = BTreeMap::new();

		for (product, key) in self.subscription_keys {
			if key.is_blank() {
				return Err(ConfigError::MissingSubscriptionKey { product });
			}

			let mut credential = Credential::new(product, base_url.clone(), key);

			credential.api_user = self.api_users.get(&product).copied();
			credential.api_key = self.api_keys.get(&product).cloned();

			credentials.insert(product, credential);
		}

		if credentials.is_empty() {
			return Err(ConfigError::NoProducts);
		}

		Ok(CredentialStore {
			base_url,
			target_environment: self.target_environment.unwrap_or_default(),
			callback_host: self.callback_host,
			token_refresh_margin: self
				.token_refresh_margin
				.unwrap_or(CredentialStore::DEFAULT_REFRESH_MARGIN),
			credentials,
		})
	}
}

fn validate_base_url(url: &Url) -> Result<(), ConfigError> {
	if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() {
		Ok(())
	} else {
		Err(ConfigError::UnsupportedBaseUrl { url: url.to_string() })
	}
}

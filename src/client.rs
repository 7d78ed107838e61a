//! Client facade tying the credential store, auth manager, and product clients together.

// self
use crate::{
	_prelude::*,
	auth::{ApiUser, Credential, Product},
	config::CredentialStore,
	executor::SignedRequestExecutor,
	http::{ApiHttpClient, TransportErrorMapper},
	manager::AuthManager,
	products::{Collections, Disbursements, Kyc},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestMomoClient = MomoClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Entry point owning one [`CredentialStore`] and the sessions derived from it.
///
/// Product clients handed out by [`collections`](Self::collections),
/// [`disbursements`](Self::disbursements), and [`kyc`](Self::kyc) share this client's token
/// cache, so cloning them is cheap and never triggers extra exchanges.
pub struct MomoClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	store: CredentialStore,
	executor: SignedRequestExecutor<C, M>,
}
impl<C, M> MomoClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: CredentialStore,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let manager = AuthManager::with_http_client(http_client, mapper).configured(&store);
		let executor = SignedRequestExecutor::new(manager, store.target_environment.clone());

		Self { store, executor }
	}

	/// Configuration this client was built from.
	pub fn store(&self) -> &CredentialStore {
		&self.store
	}

	/// Auth manager owning the token cache.
	pub fn manager(&self) -> &AuthManager<C, M> {
		&self.executor.manager
	}

	/// Executor used by the product clients.
	pub fn executor(&self) -> &SignedRequestExecutor<C, M> {
		&self.executor
	}

	/// Returns the credential configured for `product`.
	pub fn credential(&self, product: Product) -> Result<&Credential> {
		Ok(self.store.credential(product)?)
	}

	/// Collection client, if a Collection subscription key is configured.
	pub fn collections(&self) -> Result<Collections<C, M>> {
		let credential = self.credential(Product::Collection)?.clone();

		Ok(Collections::new(self.executor.clone(), credential))
	}

	/// Disbursement client, if a Disbursement subscription key is configured.
	pub fn disbursements(&self) -> Result<Disbursements<C, M>> {
		let credential = self.credential(Product::Disbursement)?.clone();

		Ok(Disbursements::new(self.executor.clone(), credential))
	}

	/// KYC client. Uses the Disbursement credential.
	pub fn kyc(&self) -> Result<Kyc<C, M>> {
		let credential = self.credential(Product::Disbursement)?.clone();

		Ok(Kyc::new(self.executor.clone(), credential))
	}

	/// Provisions every configured product, stopping at the first failure.
	pub async fn provision_all(&self) -> Result<Vec<(Product, ApiUser)>> {
		let mut provisioned = Vec::new();

		for credential in self.store.credentials() {
			let api_user = self.executor.manager.provision(credential).await?;

			provisioned.push((credential.product, api_user));
		}

		Ok(provisioned)
	}

	/// Tears down every configured session; later calls fail with
	/// [`AuthError::TornDown`](crate::error::AuthError::TornDown).
	pub fn teardown_all(&self) {
		for credential in self.store.credentials() {
			self.executor.manager.teardown(credential);
		}
	}
}
#[cfg(feature = "reqwest")]
impl MomoClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Default request timeout of the bundled reqwest transport.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(10);

	/// Creates a client backed by a reqwest transport with [`Self::DEFAULT_TIMEOUT`].
	pub fn new(store: CredentialStore) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(Self::DEFAULT_TIMEOUT)?;

		Ok(Self::with_http_client(store, http_client, ReqwestTransportErrorMapper))
	}

	/// Loads the store from the environment and builds a reqwest-backed client.
	pub fn from_env() -> Result<Self> {
		Self::new(CredentialStore::from_env()?)
	}
}
impl<C, M> Clone for MomoClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { store: self.store.clone(), executor: self.executor.clone() }
	}
}
impl<C, M> Debug for MomoClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MomoClient")
			.field("store", &self.store)
			.field("executor", &self.executor)
			.finish()
	}
}

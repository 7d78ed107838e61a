//! Auth manager: per-credential provisioning, token exchange, caching, and refresh.
//!
//! Every [`Credential`] maps to one session keyed by its [`CredentialKey`]. A session
//! walks through [`SessionStatus`]:
//! `Unprovisioned -> Provisioned -> TokenCached -> TokenExpired -> TokenCached ...`,
//! and only [`AuthManager::teardown`] moves it to the terminal `TornDown` state.
//! Provisioning and token exchanges for one credential are serialized by a
//! single-flight guard so concurrent callers share one network round trip.

pub(crate) mod common;

mod metrics;
mod provision;
mod session;
mod token;

pub use metrics::*;
pub use provision::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credential, CredentialKey},
	config::CredentialStore,
	http::{ApiHttpClient, TransportErrorMapper},
	manager::session::Session,
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Auth manager specialized for the crate's default reqwest transport stack.
pub type ReqwestAuthManager = AuthManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Position of a credential in the session state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
	/// No API user/key pair is known.
	Unprovisioned,
	/// API user/key pair known, no token cached.
	Provisioned,
	/// A reusable token is cached.
	TokenCached,
	/// The cached token is expired or inside the refresh margin.
	TokenExpired,
	/// The session was torn down; every operation fails.
	TornDown,
}

/// Owns credential sessions and talks to the MoMo provisioning and token endpoints.
pub struct AuthManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Host registered as `providerCallbackHost` when creating API users.
	pub callback_host: Option<String>,
	/// Safety margin subtracted from token expiry before reuse.
	pub refresh_margin: Duration,
	sessions: Arc<Mutex<HashMap<CredentialKey, Arc<Session>>>>,
	metrics: Arc<TokenMetrics>,
}
impl<C, M> AuthManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			callback_host: None,
			refresh_margin: CredentialStore::DEFAULT_REFRESH_MARGIN,
			sessions: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Copies the callback host and refresh margin from `store`.
	pub fn configured(mut self, store: &CredentialStore) -> Self {
		self.callback_host = store.callback_host.clone();
		self.refresh_margin = store.token_refresh_margin;

		self
	}

	/// Sets the `providerCallbackHost` used during provisioning.
	pub fn with_callback_host(mut self, host: impl Into<String>) -> Self {
		self.callback_host = Some(host.into());

		self
	}

	/// Overrides the refresh margin (negative values clamp to zero).
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Shared token counters.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Reports where `credential` sits in the session state machine.
	pub fn status(&self, credential: &Credential) -> SessionStatus {
		self.session(credential).status(OffsetDateTime::now_utc(), self.refresh_margin)
	}

	/// Forcibly clears the cached token; the next [`get_token`](Self::get_token) exchanges.
	pub fn invalidate(&self, credential: &Credential) {
		self.session(credential).clear_token();
	}

	/// Clears the cached token only if it is still `rejected`.
	///
	/// Returns `false` when another caller already replaced the token.
	pub(crate) fn invalidate_if(&self, credential: &Credential, rejected: &AccessToken) -> bool {
		self.session(credential).clear_token_if(rejected)
	}

	/// Terminates the credential's session; later operations fail with
	/// [`AuthError::TornDown`](crate::error::AuthError::TornDown).
	pub fn teardown(&self, credential: &Credential) {
		self.session(credential).tear_down();
	}

	/// Returns (and creates on demand) the session for `credential`.
	///
	/// A credential carrying a rotated API user/key pair replaces the session's pair.
	pub(crate) fn session(&self, credential: &Credential) -> Arc<Session> {
		let session = self
			.sessions
			.lock()
			.entry(credential.key())
			.or_insert_with(|| Arc::new(Session::new(credential)))
			.clone();

		session.adopt_pair(credential);

		session
	}
}
#[cfg(feature = "reqwest")]
impl AuthManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager backed by the default reqwest transport.
	pub fn new() -> Self {
		Self::with_http_client(ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
#[cfg(feature = "reqwest")]
impl Default for AuthManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C, M> Clone for AuthManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			callback_host: self.callback_host.clone(),
			refresh_margin: self.refresh_margin,
			sessions: self.sessions.clone(),
			metrics: self.metrics.clone(),
		}
	}
}
impl<C, M> Debug for AuthManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthManager")
			.field("callback_host", &self.callback_host)
			.field("refresh_margin", &self.refresh_margin)
			.field("sessions", &self.sessions.lock().len())
			.field("metrics", &self.metrics)
			.finish()
	}
}

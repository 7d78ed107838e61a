//! Per-credential session state guarded for single-flight refreshes.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ApiUser, Credential, Product, Secret},
	error::AuthError,
	manager::SessionStatus,
};

/// Mutable state owned by one credential.
///
/// Readers clone whole values out of the lock, so a token is never observed half-written.
#[derive(Debug)]
pub(crate) struct Session {
	product: Product,
	/// Serializes provisioning and token exchanges for the credential.
	pub(crate) guard: AsyncMutex<()>,
	state: RwLock<SessionState>,
}
impl Session {
	pub(crate) fn new(credential: &Credential) -> Self {
		let provisioned = credential.is_provisioned();

		Self {
			product: credential.product,
			guard: AsyncMutex::new(()),
			state: RwLock::new(SessionState {
				api_user: credential.api_user,
				api_key: credential.api_key.clone(),
				registered: provisioned,
				token: None,
				exchanges: 0,
				last_exchange: None,
				torn_down: false,
			}),
		}
	}

	/// Adopts the API user/key pair carried by `credential` when it differs from the session's.
	///
	/// A rotated pair drops the cached token, since that token was issued to the old pair.
	pub(crate) fn adopt_pair(&self, credential: &Credential) {
		let (Some(api_user), Some(api_key)) = (credential.api_user, credential.api_key.as_ref())
		else {
			return;
		};
		let mut state = self.state.write();

		if state.torn_down
			|| (state.api_user == Some(api_user) && state.api_key.as_ref() == Some(api_key))
		{
			return;
		}

		state.api_user = Some(api_user);
		state.api_key = Some(api_key.clone());
		state.registered = true;
		state.token = None;
	}

	/// Returns the cached token when it may still be reused at `now`.
	pub(crate) fn usable_token(
		&self,
		now: OffsetDateTime,
		margin: Duration,
	) -> Result<Option<AccessToken>, AuthError> {
		let state = self.state.read();

		self.ensure_live(&state)?;

		Ok(state.token.as_ref().filter(|token| token.is_usable_at(now, margin)).cloned())
	}

	/// Returns the provisioned API user/key pair.
	pub(crate) fn keys(&self) -> Result<(ApiUser, Secret), AuthError> {
		let state = self.state.read();

		self.ensure_live(&state)?;

		match (state.api_user, state.api_key.as_ref()) {
			(Some(user), Some(key)) => Ok((user, key.clone())),
			_ => Err(AuthError::NotProvisioned { product: self.product }),
		}
	}

	/// Returns the API user when both halves of the pair are present.
	pub(crate) fn provisioned_user(&self) -> Result<Option<ApiUser>, AuthError> {
		let state = self.state.read();

		self.ensure_live(&state)?;

		Ok(state.api_user.filter(|_| state.api_key.is_some()))
	}

	/// Returns the API user reference already registered remotely, if any.
	pub(crate) fn registered_user(&self) -> Option<ApiUser> {
		let state = self.state.read();

		state.api_user.filter(|_| state.registered)
	}

	pub(crate) fn mark_registered(&self, api_user: ApiUser) -> Result<(), AuthError> {
		let mut state = self.state.write();

		self.ensure_live(&state)?;

		state.api_user = Some(api_user);
		state.registered = true;

		Ok(())
	}

	pub(crate) fn store_api_key(&self, api_key: Secret) -> Result<(), AuthError> {
		let mut state = self.state.write();

		self.ensure_live(&state)?;

		state.api_key = Some(api_key);

		Ok(())
	}

	/// Number of token exchanges that have completed on this session.
	pub(crate) fn exchanges(&self) -> u64 {
		self.state.read().exchanges
	}

	/// Returns the outcome of the latest exchange if one completed after `seen`.
	pub(crate) fn exchange_since(&self, seen: u64) -> Option<Result<AccessToken>> {
		let state = self.state.read();

		if state.exchanges == seen { None } else { state.last_exchange.clone() }
	}

	/// Records an exchange outcome and caches the token when it succeeded.
	pub(crate) fn record_exchange(&self, outcome: &Result<AccessToken>) -> Result<(), AuthError> {
		let mut state = self.state.write();

		self.ensure_live(&state)?;

		if let Ok(token) = outcome {
			state.token = Some(token.clone());
		}

		state.exchanges += 1;
		state.last_exchange = Some(outcome.clone());

		Ok(())
	}

	pub(crate) fn clear_token(&self) {
		self.state.write().token = None;
	}

	/// Clears the cached token only if it is still `rejected`.
	pub(crate) fn clear_token_if(&self, rejected: &AccessToken) -> bool {
		let mut state = self.state.write();

		if state.token.as_ref().is_some_and(|current| current.value == rejected.value) {
			state.token = None;

			true
		} else {
			false
		}
	}

	pub(crate) fn tear_down(&self) {
		let mut state = self.state.write();

		state.torn_down = true;
		state.token = None;
		state.api_key = None;
		state.last_exchange = None;
	}

	pub(crate) fn status(&self, now: OffsetDateTime, margin: Duration) -> SessionStatus {
		let state = self.state.read();

		if state.torn_down {
			return SessionStatus::TornDown;
		}
		if state.api_user.is_none() || state.api_key.is_none() {
			return SessionStatus::Unprovisioned;
		}

		match &state.token {
			None => SessionStatus::Provisioned,
			Some(token) if token.is_usable_at(now, margin) => SessionStatus::TokenCached,
			Some(_) => SessionStatus::TokenExpired,
		}
	}

	fn ensure_live(&self, state: &SessionState) -> Result<(), AuthError> {
		if state.torn_down { Err(AuthError::TornDown { product: self.product }) } else { Ok(()) }
	}
}

#[derive(Debug)]
struct SessionState {
	api_user: Option<ApiUser>,
	api_key: Option<Secret>,
	registered: bool,
	token: Option<AccessToken>,
	exchanges: u64,
	last_exchange: Option<Result<AccessToken>>,
	torn_down: bool,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn credential() -> Credential {
		Credential::new(
			Product::Collection,
			Url::parse("https://sandbox.momodeveloper.mtn.com").expect("URL fixture should parse."),
			"sub",
		)
	}

	fn token(value: &str) -> AccessToken {
		AccessToken::new(
			value,
			"access_token",
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::hours(1),
		)
		.expect("Token fixture should build.")
	}

	#[test]
	fn state_machine_walks_through_statuses() {
		let session = Session::new(&credential());
		let now = macros::datetime!(2025-01-01 00:10 UTC);
		let margin = Duration::seconds(60);

		assert_eq!(session.status(now, margin), SessionStatus::Unprovisioned);
		assert!(matches!(session.keys(), Err(AuthError::NotProvisioned { .. })));

		session.mark_registered(ApiUser::generate()).expect("Session should be live.");
		session.store_api_key(Secret::new("key")).expect("Session should be live.");

		assert_eq!(session.status(now, margin), SessionStatus::Provisioned);

		session.record_exchange(&Ok(token("a"))).expect("Session should be live.");

		assert_eq!(session.status(now, margin), SessionStatus::TokenCached);
		assert_eq!(
			session.status(macros::datetime!(2025-01-01 00:59:30 UTC), margin),
			SessionStatus::TokenExpired
		);

		session.tear_down();

		assert_eq!(session.status(now, margin), SessionStatus::TornDown);
		assert!(matches!(session.usable_token(now, margin), Err(AuthError::TornDown { .. })));
		assert!(session.record_exchange(&Ok(token("b"))).is_err());
	}

	#[test]
	fn compare_and_clear_only_drops_matching_token() {
		let session = Session::new(&credential());

		session.record_exchange(&Ok(token("fresh"))).expect("Session should be live.");

		assert!(!session.clear_token_if(&token("stale")));
		assert!(session.clear_token_if(&token("fresh")));
		assert!(!session.clear_token_if(&token("fresh")));
	}

	#[test]
	fn rotated_pair_replaces_keys_and_drops_token() {
		let api_user = ApiUser::generate();
		let original = credential().with_api_user(api_user).with_api_key("old-key");
		let session = Session::new(&original);
		let now = macros::datetime!(2025-01-01 00:10 UTC);
		let margin = Duration::seconds(60);

		session.record_exchange(&Ok(token("old"))).expect("Session should be live.");
		session.adopt_pair(&original);
		session.adopt_pair(&credential());

		assert_eq!(session.status(now, margin), SessionStatus::TokenCached);

		session.adopt_pair(&original.clone().with_api_key("rotated-key"));

		let (user, key) = session.keys().expect("Rotated pair should be usable.");

		assert_eq!(user, api_user);
		assert_eq!(key.expose(), "rotated-key");
		assert_eq!(session.status(now, margin), SessionStatus::Provisioned);
	}

	#[test]
	fn waiters_see_the_outcome_of_a_newer_exchange() {
		let session = Session::new(&credential());
		let seen = session.exchanges();

		assert!(session.exchange_since(seen).is_none());

		let rejected = AuthError::TokenRejected { status: 401, code: "login_failed".into() };

		session.record_exchange(&Err(rejected.clone().into())).expect("Session should be live.");

		assert!(matches!(
			session.exchange_since(seen),
			Some(Err(Error::Auth(ref err))) if *err == rejected
		));
		assert!(session.exchange_since(session.exchanges()).is_none());
	}
}

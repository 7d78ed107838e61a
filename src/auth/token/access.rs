//! Bearer access tokens and their lifecycle helpers.

// self
use crate::{_prelude::*, auth::token::secret::Secret, error::ConfigError};

/// Lifecycle status of an [`AccessToken`] relative to a refresh margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token can be reused.
	Active,
	/// Token is still valid but inside the refresh margin.
	Expiring,
	/// Token reached its expiry instant.
	Expired,
}

/// Short-lived bearer token issued by a MoMo token endpoint.
///
/// Tokens are replaced wholesale on refresh; no field is ever mutated in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer secret; callers must avoid logging it.
	pub value: Secret,
	/// Token type reported by MoMo (`access_token` in practice).
	pub token_type: String,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Instant the token stops being accepted.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Builds a token from an `expires_in` lifetime measured from `issued_at`.
	pub fn new(
		value: impl Into<String>,
		token_type: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Result<Self, ConfigError> {
		if !expires_in.is_positive() {
			return Err(ConfigError::NonPositiveExpiresIn);
		}

		let expires_at =
			issued_at.checked_add(expires_in).ok_or(ConfigError::ExpiresInOutOfRange)?;

		Ok(Self {
			value: Secret::new(value),
			token_type: token_type.into(),
			issued_at,
			expires_at,
		})
	}

	/// Computes the status at `instant` given a refresh `margin`.
	///
	/// A margin reaching past the representable range counts as `Expiring`.
	pub fn status_at(&self, instant: OffsetDateTime, margin: Duration) -> TokenStatus {
		let refresh_at = self.expires_at.checked_sub(margin);

		if instant >= self.expires_at {
			TokenStatus::Expired
		} else if refresh_at.is_none_or(|refresh_at| instant >= refresh_at) {
			TokenStatus::Expiring
		} else {
			TokenStatus::Active
		}
	}

	/// Returns `true` if the cached token may be reused at `instant`.
	pub fn is_usable_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		matches!(self.status_at(instant, margin), TokenStatus::Active)
	}

	/// Returns `true` if the token has expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining lifetime at `instant`, clamped to zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Value of the `Authorization` header for this token.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.value.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

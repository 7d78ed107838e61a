//! Client-level error taxonomy shared by the manager, executor, and product clients.

// self
use crate::{_prelude::*, auth::Product};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Errors are cheap to clone so one failed token exchange can be handed to every waiter.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Input was rejected before any network call.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Credential or token was rejected.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Network failure, timeout, or caller cancellation.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// MoMo answered with a non-2xx status that is not an authorization failure.
	#[error("MoMo returned HTTP {status}: {body}.")]
	Server {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
		/// Retry-After hint, when supplied.
		retry_after: Option<Duration>,
	},
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A successful response carried JSON that could not be decoded.
	#[error("MoMo returned malformed JSON with HTTP {status}.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code.
		status: u16,
	},
}
impl Error {
	/// Returns `true` when the caller's cancellation signal aborted the call.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Transport(TransportError::Cancelled))
	}

	/// Returns `true` for authorization failures.
	pub fn is_auth(&self) -> bool {
		matches!(self, Self::Auth(_))
	}

	/// HTTP status attached to the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Server { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::Auth(err) => err.status(),
			_ => None,
		}
	}
}

/// Input rejected before any I/O happened.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Invalid {field}: {reason}.")]
pub struct ValidationError {
	/// Offending field name.
	pub field: &'static str,
	/// Human-readable reason.
	pub reason: String,
}
impl ValidationError {
	/// Creates a validation error for `field`.
	pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
		Self { field, reason: reason.into() }
	}
}

/// Authorization failures raised while provisioning, exchanging, or using credentials.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthError {
	/// Credential has no API user/key pair yet.
	#[error("The {product} credential has not been provisioned with an API user and key.")]
	NotProvisioned {
		/// Product the credential belongs to.
		product: Product,
	},
	/// Credential session was explicitly torn down.
	#[error("The {product} credential has been torn down.")]
	TornDown {
		/// Product the credential belongs to.
		product: Product,
	},
	/// API user or API key creation was rejected.
	#[error("Provisioning was rejected with HTTP {status}: {code}.")]
	ProvisioningRejected {
		/// HTTP status code.
		status: u16,
		/// MoMo error code or message.
		code: String,
	},
	/// Token endpoint rejected the API user/key pair.
	#[error("Token exchange was rejected with HTTP {status}: {code}.")]
	TokenRejected {
		/// HTTP status code.
		status: u16,
		/// MoMo error code or message.
		code: String,
	},
	/// Product endpoint rejected the bearer token.
	#[error("Request was rejected as unauthorized with HTTP {status}: {code}.")]
	Unauthorized {
		/// HTTP status code.
		status: u16,
		/// MoMo error code or message.
		code: String,
	},
}
impl AuthError {
	/// Stable error code for the failure.
	pub fn code(&self) -> &str {
		match self {
			Self::NotProvisioned { .. } => "NOT_PROVISIONED",
			Self::TornDown { .. } => "TORN_DOWN",
			Self::ProvisioningRejected { code, .. }
			| Self::TokenRejected { code, .. }
			| Self::Unauthorized { code, .. } => code.as_str(),
		}
	}

	/// HTTP status that produced the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::NotProvisioned { .. } | Self::TornDown { .. } => None,
			Self::ProvisioningRejected { status, .. }
			| Self::TokenRejected { status, .. }
			| Self::Unauthorized { status, .. } => Some(*status),
		}
	}
}

/// Transport-level failures (network, IO, cancellation).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling MoMo.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Underlying HTTP client gave up waiting for MoMo.
	#[error("Request to MoMo timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling MoMo.")]
	Io(#[source] Arc<std::io::Error>),
	/// Caller's cancellation signal fired before the call completed.
	#[error("Request was cancelled by the caller.")]
	Cancelled,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Arc::new(src) }
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Configuration and request construction failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(Arc<oauth2::http::Error>),
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL is not an HTTP(S) URL that can carry paths.
	#[error("Base URL must be an http or https URL: {url}.")]
	UnsupportedBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Target environment value is malformed.
	#[error("Target environment `{value}` is invalid.")]
	InvalidEnvironment {
		/// Offending value.
		value: String,
	},
	/// No subscription key was configured for the product.
	#[error("No subscription key is configured for the {product} product.")]
	MissingSubscriptionKey {
		/// Product lacking a key.
		product: Product,
	},
	/// The credential store has no product configured at all.
	#[error("At least one product subscription key must be configured.")]
	NoProducts,
	/// An API key was supplied without the API user it belongs to.
	#[error("An API key for the {product} product was supplied without its API user.")]
	ApiKeyWithoutUser {
		/// Product with the dangling key.
		product: Product,
	},
	/// API user identifier is not a UUID.
	#[error("API user `{value}` is not a valid UUID.")]
	InvalidApiUser {
		/// Offending value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: uuid::Error,
	},
	/// Token response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token response carried an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token response carried a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

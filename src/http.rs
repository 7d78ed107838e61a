//! Transport primitives shared by provisioning, token exchange, and product calls.
//!
//! The module exposes [`ApiHttpClient`] so downstream crates can plug in their own HTTP
//! stack, and [`TransportErrorMapper`] so transport-specific failures land in the crate's
//! [`TransportError`] taxonomy. Every request the crate sends goes through
//! [`send`], which owns the only call site of [`AsyncHttpClient::call`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{HeaderMap, header::RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

pub use oauth2;

/// Abstraction over HTTP transports able to execute MoMo requests.
///
/// The trait is the crate's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so one transport can be shared by the manager, the executor, and
/// every product client; the handles they return must own whatever state they need so the
/// request futures stay `Send` for the lifetime of the call.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single request.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle that owns a clone of the underlying transport.
	fn handle(&self) -> Self::Handle;
}

/// Maps transport-specific failures into the crate error taxonomy.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts `error`, raised while running `operation`, into an [`Error`].
	fn map_transport_error(&self, operation: &'static str, error: HttpClientError<E>) -> Error;
}

/// Mapper used by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_operation: &'static str,
		error: HttpClientError<ReqwestError>,
	) -> Error {
		match error {
			HttpClientError::Reqwest(err) => {
				let err = *err;

				if err.is_builder() {
					ConfigError::from(err).into()
				} else {
					TransportError::from(err).into()
				}
			},
			HttpClientError::Http(err) => ConfigError::from(err).into(),
			HttpClientError::Io(err) => TransportError::from(err).into(),
			HttpClientError::Other(msg) => TransportError::network(std::io::Error::other(msg)).into(),
			_ => TransportError::network(std::io::Error::other("Unknown transport failure.")).into(),
		}
	}
}

/// Mapper for custom transports whose errors carry no timeout information.
///
/// Every transport failure becomes [`TransportError::Network`], and request construction
/// failures become [`ConfigError::HttpRequest`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericTransportErrorMapper;
impl<E> TransportErrorMapper<E> for GenericTransportErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(&self, _operation: &'static str, error: HttpClientError<E>) -> Error {
		match error {
			HttpClientError::Reqwest(err) => TransportError::network(*err).into(),
			HttpClientError::Http(err) => ConfigError::from(err).into(),
			HttpClientError::Io(err) => TransportError::from(err).into(),
			HttpClientError::Other(msg) => TransportError::network(std::io::Error::other(msg)).into(),
			_ => TransportError::network(std::io::Error::other("Unknown transport failure.")).into(),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// MoMo endpoints answer directly, so a custom [`ReqwestClient`] should disable redirect
/// following. [`ReqwestHttpClient::with_timeout`] builds one with a request timeout.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with redirects disabled and the given per-request timeout.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let timeout = std::time::Duration::try_from(timeout).map_err(|_| {
			ConfigError::http_client_build(std::io::Error::other("Timeout must be positive."))
		})?;
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(Arc::new(self.0.clone()))
	}
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`ApiHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle(Arc<ReqwestClient>);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Sends `request` through `client`, mapping failures with `mapper`.
pub(crate) async fn send<C, M>(
	client: &C,
	mapper: &M,
	operation: &'static str,
	request: HttpRequest,
) -> Result<HttpResponse>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let handle = client.handle();

	handle.call(request).await.map_err(|e| mapper.map_transport_error(operation, e))
}

/// Parses a `Retry-After` header expressed either as seconds or as an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

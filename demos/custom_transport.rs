//! Demonstrates plugging a custom HTTP transport and error mapper into the MoMo client.
//!
//! 1. Implement [`ApiHttpClient`] and hand out an [`AsyncHttpClient`] handle per request.
//! 2. Provide a [`TransportErrorMapper`] that sorts the transport's own errors into
//!    [`TransportError`] variants.
//! 3. Pass both to [`MomoClient::with_http_client`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use momo_broker::{
	auth::Product,
	client::MomoClient,
	config::CredentialStore,
	error::{Error, TransportError},
	http::{
		ApiHttpClient, TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store = CredentialStore::builder()
		.base_url(Url::parse("https://sandbox.momodeveloper.mtn.com")?)
		.subscription_key(Product::Collection, "demo-subscription-key")
		.api_user(Product::Collection, "c72025f5-5cd1-4630-99e4-8ba4722fad56".parse()?)
		.api_key(Product::Collection, "demo-api-key")
		.build()?;
	let client: MomoClient<MockHttpClient, MockTransportErrorMapper> = MomoClient::with_http_client(
		store.clone(),
		MockHttpClient::Success,
		MockTransportErrorMapper,
	);
	let credential = client.credential(Product::Collection)?;
	let token = client.manager().get_token(credential).await?;

	println!("Token issued by the mock transport expires at {}.", token.expires_at);

	let dns_failure = MockTransportError::DnsFailure { host: "sandbox.momodeveloper.mtn.com" };

	for behavior in [
		MockHttpClient::Fail(dns_failure),
		MockHttpClient::Fail(MockTransportError::GatewayTimeout),
	] {
		let failing: MomoClient<MockHttpClient, MockTransportErrorMapper> =
			MomoClient::with_http_client(store.clone(), behavior, MockTransportErrorMapper);
		let credential = failing.credential(Product::Collection)?;

		match failing.manager().get_token(credential).await {
			Ok(_) => println!("Mock transport unexpectedly succeeded."),
			Err(Error::Transport(TransportError::Timeout { .. })) => {
				println!("Timeout surfaced as TransportError::Timeout.")
			},
			Err(e) => println!("Transport error mapped by the client: {e}"),
		}
	}

	Ok(())
}

#[derive(Clone, Debug)]
enum MockTransportError {
	DnsFailure { host: &'static str },
	GatewayTimeout,
}
impl Display for MockTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::DnsFailure { host } => write!(f, "DNS lookup failed for {host}"),
			Self::GatewayTimeout => write!(f, "Gateway timed out"),
		}
	}
}
impl StdError for MockTransportError {}

#[derive(Clone)]
enum MockHttpClient {
	Success,
	Fail(MockTransportError),
}
impl ApiHttpClient for MockHttpClient {
	type Handle = MockHttpClient;
	type TransportError = MockTransportError;

	fn handle(&self) -> Self::Handle {
		self.clone()
	}
}
impl<'a> AsyncHttpClient<'a> for MockHttpClient {
	type Error = HttpClientError<MockTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, _request: HttpRequest) -> Self::Future {
		let behavior = self.clone();

		Box::pin(async move {
			match behavior {
				Self::Success => Ok(HttpResponse::new(
					b"{\"access_token\":\"mock-access\",\"token_type\":\"access_token\",\"expires_in\":3600}"
						.to_vec(),
				)),
				// `HttpClientError::Reqwest` carries any boxed transport error.
				Self::Fail(error) => Err(HttpClientError::Reqwest(Box::new(error))),
			}
		})
	}
}

#[derive(Clone, Default)]
struct MockTransportErrorMapper;
impl TransportErrorMapper<MockTransportError> for MockTransportErrorMapper {
	fn map_transport_error(
		&self,
		_operation: &'static str,
		error: HttpClientError<MockTransportError>,
	) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => match *inner {
				timeout @ MockTransportError::GatewayTimeout => TransportError::timeout(timeout).into(),
				other => TransportError::network(other).into(),
			},
			HttpClientError::Other(text) => {
				TransportError::network(std::io::Error::other(text)).into()
			},
			_ => TransportError::network(std::io::Error::other("Unknown mock failure.")).into(),
		}
	}
}

//! Shared fixtures for integration tests: httpmock-backed clients and a scripted transport.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	future::Future,
	io,
	pin::Pin,
	sync::Arc,
	time::Duration as StdDuration,
};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use momo_broker::{
	auth::{ApiUser, Credential, Product},
	client::MomoClient,
	config::CredentialStore,
	http::{
		ApiHttpClient, GenericTransportErrorMapper, ReqwestHttpClient,
		ReqwestTransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode},
	},
	url::Url,
};
use parking_lot::Mutex;

pub const API_USER: &str = "c72025f5-5cd1-4630-99e4-8ba4722fad56";
pub const API_KEY: &str = "f1db798c98df4bcf83b538175893bbf0";
pub const COLLECTION_KEY: &str = "collection-subscription";
pub const DISBURSEMENT_KEY: &str = "disbursement-subscription";

pub type MockClient = MomoClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;
pub type ScriptedClient = MomoClient<ScriptedTransport, GenericTransportErrorMapper>;

pub fn api_user() -> ApiUser {
	API_USER.parse().expect("API user fixture should parse.")
}

/// Store with pre-provisioned Collection and Disbursement credentials pointing at `base_url`.
pub fn provisioned_store(base_url: &str) -> CredentialStore {
	CredentialStore::builder()
		.base_url(Url::parse(base_url).expect("Base URL fixture should parse."))
		.subscription_key(Product::Collection, COLLECTION_KEY)
		.api_user(Product::Collection, api_user())
		.api_key(Product::Collection, API_KEY)
		.subscription_key(Product::Disbursement, DISBURSEMENT_KEY)
		.api_user(Product::Disbursement, api_user())
		.api_key(Product::Disbursement, API_KEY)
		.build()
		.expect("Provisioned store fixture should build.")
}

/// Reqwest-backed client pointed at an httpmock server.
pub fn mock_client(store: CredentialStore) -> MockClient {
	MomoClient::new(store).expect("Reqwest client should build.")
}

/// Client running over a [`ScriptedTransport`] with the default `https://momo.test` base URL.
pub fn scripted_client(transport: &ScriptedTransport) -> ScriptedClient {
	MomoClient::with_http_client(
		provisioned_store("https://momo.test"),
		transport.clone(),
		GenericTransportErrorMapper,
	)
}

pub fn collection(client: &ScriptedClient) -> Credential {
	client.credential(Product::Collection).expect("Collection should be configured.").clone()
}

/// Value of an HTTP Basic `Authorization` header for `user:key`, without the scheme.
pub fn basic(user: &str, key: &str) -> String {
	STANDARD.encode(format!("{user}:{key}"))
}

pub fn token_body(value: &str, expires_in: i64) -> String {
	format!(r#"{{"access_token":"{value}","token_type":"access_token","expires_in":{expires_in}}}"#)
}

/// One scripted reply.
#[derive(Clone, Debug)]
pub struct Reply {
	pub status: u16,
	pub body: String,
	pub delay: Option<StdDuration>,
	/// When set, the transport fails with an I/O error instead of answering.
	pub io_failure: Option<io::ErrorKind>,
}
impl Reply {
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self { status, body: body.into(), delay: None, io_failure: None }
	}

	pub fn io_failure(kind: io::ErrorKind) -> Self {
		Self { io_failure: Some(kind), ..Self::new(0, "") }
	}

	pub fn delayed(mut self, delay: StdDuration) -> Self {
		self.delay = Some(delay);

		self
	}
}

/// Request observed by a [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct Observed {
	pub method: String,
	pub path: String,
	pub authorization: Option<String>,
}

#[derive(Default)]
struct Script {
	routes: Mutex<HashMap<String, VecDeque<Reply>>>,
	calls: Mutex<Vec<Observed>>,
}

/// In-memory transport replaying queued replies per path.
///
/// The last reply queued for a path repeats once the queue drains; unknown paths answer 404.
#[derive(Clone, Default)]
pub struct ScriptedTransport(Arc<Script>);
impl ScriptedTransport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reply(&self, path: &str, reply: Reply) -> &Self {
		self.0.routes.lock().entry(path.to_owned()).or_default().push_back(reply);

		self
	}

	pub fn calls(&self) -> Vec<Observed> {
		self.0.calls.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> usize {
		self.0.calls.lock().iter().filter(|call| call.path == path).count()
	}

	fn next(&self, request: &HttpRequest) -> Reply {
		let path = request.uri().path().to_owned();

		self.0.calls.lock().push(Observed {
			method: request.method().to_string(),
			path: path.clone(),
			authorization: request
				.headers()
				.get("authorization")
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned),
		});

		let mut routes = self.0.routes.lock();

		match routes.get_mut(&path) {
			Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
			Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
			None => not_found(),
		}
	}
}
impl ApiHttpClient for ScriptedTransport {
	type Handle = ScriptedTransport;
	type TransportError = io::Error;

	fn handle(&self) -> Self::Handle {
		self.clone()
	}
}
impl<'c> AsyncHttpClient<'c> for ScriptedTransport {
	type Error = HttpClientError<io::Error>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let reply = self.next(&request);

		Box::pin(async move {
			if let Some(delay) = reply.delay {
				tokio::time::sleep(delay).await;
			}
			if let Some(kind) = reply.io_failure {
				return Err(HttpClientError::Io(io::Error::new(kind, "scripted transport failure")));
			}

			let mut response = HttpResponse::new(reply.body.into_bytes());

			*response.status_mut() = StatusCode::from_u16(reply.status)
				.map_err(|e| HttpClientError::Other(e.to_string()))?;

			Ok(response)
		})
	}
}

fn not_found() -> Reply {
	Reply::new(404, r#"{"code":"RESOURCE_NOT_FOUND"}"#)
}

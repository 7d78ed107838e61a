//! Demonstrates provisioning a Collection API user, requesting a payment, and polling its status
//! with the default reqwest transport against a local MoMo stand-in.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use momo_broker::{
	auth::Product, client::MomoClient, config::CredentialStore, products::PaymentRequest,
};

const API_USER: &str = "c72025f5-5cd1-4630-99e4-8ba4722fad56";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let create_user = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1_0/apiuser").header("x-reference-id", API_USER);
			then.status(201);
		})
		.await;
	let create_key = server
		.mock_async(|when, then| {
			when.method(POST).path(format!("/v1_0/apiuser/{API_USER}/apikey"));
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"apiKey\":\"demo-api-key\"}");
		})
		.await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/collection/token/");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"access_token\",\"expires_in\":3600}",
			);
		})
		.await;
	let request_to_pay = server
		.mock_async(|when, then| {
			when.method(POST).path("/collection/v1_0/requesttopay");
			then.status(202);
		})
		.await;
	let status = server
		.mock_async(|when, then| {
			when.method(GET);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"status\":\"SUCCESSFUL\",\"financialTransactionId\":\"1590219393\"}");
		})
		.await;
	let store = CredentialStore::builder()
		.base_url(Url::parse(&server.base_url())?)
		.callback_host("merchant.example")
		.subscription_key(Product::Collection, "demo-subscription-key")
		.api_user(Product::Collection, API_USER.parse()?)
		.build()?;
	let client = MomoClient::new(store)?;

	for (product, api_user) in client.provision_all().await? {
		println!("Provisioned {product} API user {api_user}.");
	}

	let collections = client.collections()?;
	let request = PaymentRequest::parse("256771234567", "1500")?.with_payer_message("Invoice 77");
	let reference = collections.request_to_pay(&request).await?;
	let outcome = collections.request_to_pay_status(&reference).await?;

	println!(
		"Request to pay {reference} is {} (transaction {}).",
		outcome.status,
		outcome.financial_transaction_id.as_deref().unwrap_or("pending"),
	);

	create_user.assert_async().await;
	create_key.assert_async().await;
	token.assert_async().await;
	request_to_pay.assert_async().await;
	status.assert_async().await;

	Ok(())
}

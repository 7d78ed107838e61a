mod common;

// std
use std::{io, time::Duration as StdDuration};
// self
use common::*;
use momo_broker::{
	auth::AccessToken,
	error::{AuthError, Error, Result, TransportError},
	executor::ApiRequest,
	manager::SessionStatus,
	products::{ConsentRequest, Msisdn},
};

const TOKEN_PATH: &str = "/collection/token/";
const BALANCE_PATH: &str = "/collection/v1_0/account/balance";

#[tokio::test]
async fn concurrent_callers_share_one_exchange() {
	let transport = ScriptedTransport::new();

	transport.reply(
		TOKEN_PATH,
		Reply::new(200, token_body("shared-token", 3600)).delayed(StdDuration::from_millis(50)),
	);

	let client = scripted_client(&transport);
	let credential = collection(&client);
	let manager = client.manager();
	let (first, second, third): (Result<AccessToken>, Result<AccessToken>, Result<AccessToken>) =
		tokio::join!(
			manager.get_token(&credential),
			manager.get_token(&credential),
			manager.get_token(&credential),
		);
	let first = first.expect("First caller should receive a token.");

	assert_eq!(first, second.expect("Second caller should receive a token."));
	assert_eq!(first, third.expect("Third caller should receive a token."));
	assert_eq!(transport.calls_to(TOKEN_PATH), 1);
	assert_eq!(manager.metrics().exchanges(), 1);
}

#[tokio::test]
async fn concurrent_callers_share_one_failed_exchange() {
	let transport = ScriptedTransport::new();

	transport.reply(
		TOKEN_PATH,
		Reply::new(401, r#"{"code":"INVALID_CREDENTIALS"}"#).delayed(StdDuration::from_millis(50)),
	);

	let client = scripted_client(&transport);
	let credential = collection(&client);
	let manager = client.manager();
	let outcomes: [Result<AccessToken>; 3] = {
		let (first, second, third) = tokio::join!(
			manager.get_token(&credential),
			manager.get_token(&credential),
			manager.get_token(&credential),
		);

		[first, second, third]
	};

	for outcome in outcomes {
		assert!(matches!(
			outcome,
			Err(Error::Auth(AuthError::TokenRejected { status: 401, ref code }))
				if code == "INVALID_CREDENTIALS"
		));
	}

	assert_eq!(transport.calls_to(TOKEN_PATH), 1);
	assert_eq!(manager.metrics().exchanges(), 1);
	assert_eq!(manager.metrics().failures(), 1);

	manager.get_token(&credential).await.expect_err("A later caller should exchange again.");

	assert_eq!(transport.calls_to(TOKEN_PATH), 2);
}

#[tokio::test]
async fn oversized_refresh_margin_never_reuses_tokens() {
	let transport = ScriptedTransport::new();

	transport.reply(TOKEN_PATH, Reply::new(200, token_body("margin-token", 3600)));

	let client = scripted_client(&transport);
	let credential = collection(&client);
	let manager = client.manager().clone().with_refresh_margin(time::Duration::MAX);

	manager.get_token(&credential).await.expect("First exchange should work.");
	manager.get_token(&credential).await.expect("Second exchange should work.");

	assert_eq!(manager.status(&credential), SessionStatus::TokenExpired);
	assert_eq!(transport.calls_to(TOKEN_PATH), 2);
}

#[tokio::test]
async fn transport_failures_are_not_retried() {
	let transport = ScriptedTransport::new();

	transport
		.reply(TOKEN_PATH, Reply::new(200, token_body("any-token", 3600)))
		.reply(BALANCE_PATH, Reply::io_failure(io::ErrorKind::ConnectionReset));

	let client = scripted_client(&transport);
	let credential = collection(&client);
	let err = client
		.executor()
		.execute(&credential, ApiRequest::get(BALANCE_PATH))
		.await
		.expect_err("Connection reset should surface.");

	assert!(matches!(
		err,
		Error::Transport(TransportError::Io(ref source))
			if source.kind() == io::ErrorKind::ConnectionReset
	));
	assert_eq!(transport.calls_to(BALANCE_PATH), 1);
	assert_eq!(transport.calls_to(TOKEN_PATH), 1);
}

#[tokio::test]
async fn rejected_bearer_is_refreshed_and_retried_once() {
	let transport = ScriptedTransport::new();

	transport
		.reply(TOKEN_PATH, Reply::new(200, token_body("stale-token", 3600)))
		.reply(TOKEN_PATH, Reply::new(200, token_body("fresh-token", 3600)))
		.reply(BALANCE_PATH, Reply::new(401, r#"{"code":"INVALID_TOKEN"}"#))
		.reply(BALANCE_PATH, Reply::new(200, r#"{"availableBalance":"1000","currency":"EUR"}"#));

	let client = scripted_client(&transport);
	let credential = collection(&client);
	let response = client
		.executor()
		.execute(&credential, ApiRequest::get(BALANCE_PATH))
		.await
		.expect("Retry with a fresh token should succeed.");

	assert_eq!(response.status, 200);
	assert_eq!(response.body["availableBalance"], "1000");
	assert_eq!(transport.calls_to(TOKEN_PATH), 2);
	assert_eq!(transport.calls_to(BALANCE_PATH), 2);

	let bearers: Vec<_> = transport
		.calls()
		.into_iter()
		.filter(|call| call.path == BALANCE_PATH)
		.filter_map(|call| call.authorization)
		.collect();

	assert_eq!(bearers, ["Bearer stale-token", "Bearer fresh-token"]);
}

#[tokio::test]
async fn second_rejection_surfaces_unauthorized() {
	let transport = ScriptedTransport::new();

	transport
		.reply(TOKEN_PATH, Reply::new(200, token_body("any-token", 3600)))
		.reply(BALANCE_PATH, Reply::new(401, r#"{"code":"INVALID_TOKEN"}"#));

	let client = scripted_client(&transport);
	let credential = collection(&client);
	let err = client
		.executor()
		.execute(&credential, ApiRequest::get(BALANCE_PATH))
		.await
		.expect_err("Two rejections should fail the call.");

	assert!(matches!(
		err,
		Error::Auth(AuthError::Unauthorized { status: 401, ref code }) if code == "INVALID_TOKEN"
	));
	assert_eq!(transport.calls_to(BALANCE_PATH), 2);
	assert_eq!(transport.calls_to(TOKEN_PATH), 2);
}

#[tokio::test]
async fn server_errors_are_not_retried() {
	let transport = ScriptedTransport::new();

	transport
		.reply(TOKEN_PATH, Reply::new(200, token_body("any-token", 3600)))
		.reply(BALANCE_PATH, Reply::new(500, r#"{"code":"INTERNAL_PROCESSING_ERROR"}"#));

	let client = scripted_client(&transport);
	let credential = collection(&client);
	let err = client
		.executor()
		.execute(&credential, ApiRequest::get(BALANCE_PATH))
		.await
		.expect_err("Server errors should surface.");

	assert!(matches!(err, Error::Server { status: 500, .. }));
	assert_eq!(err.status(), Some(500));
	assert_eq!(transport.calls_to(BALANCE_PATH), 1);
}

#[tokio::test]
async fn cancellation_aborts_without_retry() {
	let transport = ScriptedTransport::new();

	transport.reply(TOKEN_PATH, Reply::new(200, token_body("any-token", 3600))).reply(
		BALANCE_PATH,
		Reply::new(200, r#"{"availableBalance":"1"}"#).delayed(StdDuration::from_secs(5)),
	);

	let client = scripted_client(&transport);
	let credential = collection(&client);
	let err = client
		.executor()
		.execute_with_cancel(
			&credential,
			ApiRequest::get(BALANCE_PATH),
			tokio::time::sleep(StdDuration::from_millis(50)),
		)
		.await
		.expect_err("Cancelled call should fail.");

	assert!(err.is_cancelled());
	assert_eq!(transport.calls_to(BALANCE_PATH), 1);
	assert_eq!(transport.calls_to(TOKEN_PATH), 1);
}

#[tokio::test]
async fn blank_subscription_key_fails_before_io() {
	let transport = ScriptedTransport::new();
	let client = scripted_client(&transport);
	let mut credential = collection(&client);

	credential.subscription_key = "   ".into();

	let err = client
		.executor()
		.execute(&credential, ApiRequest::get(BALANCE_PATH))
		.await
		.expect_err("Blank key should be rejected.");

	assert!(matches!(err, Error::Validation(ref e) if e.field == "subscription_key"));
	assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn signing_headers_cannot_be_overridden() {
	let transport = ScriptedTransport::new();
	let client = scripted_client(&transport);
	let credential = collection(&client);
	let request = ApiRequest::get(BALANCE_PATH).header("Authorization", "Bearer forged");
	let err = client
		.executor()
		.execute(&credential, request)
		.await
		.expect_err("A forged Authorization header should be rejected.");

	assert!(matches!(err, Error::Validation(ref e) if e.field == "headers"));
	assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn consent_flow_uses_uncached_consent_token() {
	let transport = ScriptedTransport::new();

	transport
		.reply(
			"/disbursement/token/",
			Reply::new(200, token_body("disbursement-token", 3600)),
		)
		.reply(
			"/disbursement/v1_0/bc-authorize",
			Reply::new(200, r#"{"auth_req_id":"req-1","interval":5,"expires_in":3600}"#),
		)
		.reply(
			"/disbursement/oauth2/token/",
			Reply::new(200, token_body("consent-token", 300)),
		)
		.reply(
			"/disbursement/oauth2/v1_0/userinfo",
			Reply::new(200, r#"{"sub":"0","name":"Sand Box","birthdate":"1976-08-13"}"#),
		);

	let client = scripted_client(&transport);
	let kyc = client.kyc().expect("KYC should be available.");
	let msisdn = Msisdn::new("46733123450").expect("MSISDN should parse.");
	let ticket =
		kyc.request_consent(&ConsentRequest::new(msisdn)).await.expect("Consent should start.");

	assert_eq!(ticket.auth_req_id, "req-1");
	assert_eq!(ticket.interval, Some(5));

	let first = kyc.detailed_user_info(&ticket.auth_req_id).await.expect("Userinfo should load.");

	kyc.detailed_user_info(&ticket.auth_req_id).await.expect("Userinfo should load again.");

	assert_eq!(first.name.as_deref(), Some("Sand Box"));
	assert_eq!(first.birthdate.as_deref(), Some("1976-08-13"));
	assert_eq!(transport.calls_to("/disbursement/oauth2/token/"), 2);

	let userinfo_bearers: Vec<_> = transport
		.calls()
		.into_iter()
		.filter(|call| call.path == "/disbursement/oauth2/v1_0/userinfo")
		.filter_map(|call| call.authorization)
		.collect();

	assert_eq!(userinfo_bearers, ["Bearer consent-token", "Bearer consent-token"]);
}

#[tokio::test]
async fn rejected_consent_token_is_not_retried() {
	let transport = ScriptedTransport::new();

	transport
		.reply(
			"/disbursement/oauth2/token/",
			Reply::new(200, token_body("consent-token", 300)),
		)
		.reply(
			"/disbursement/oauth2/v1_0/userinfo",
			Reply::new(401, r#"{"code":"CONSENT_REVOKED"}"#),
		);

	let client = scripted_client(&transport);
	let kyc = client.kyc().expect("KYC should be available.");
	let err = kyc.detailed_user_info("req-2").await.expect_err("Rejected consent should fail.");

	assert!(err.is_auth());
	assert_eq!(transport.calls_to("/disbursement/oauth2/v1_0/userinfo"), 1);
	assert!(matches!(
		kyc.detailed_user_info(" ").await,
		Err(Error::Validation(ref e)) if e.field == "auth_req_id"
	));
}

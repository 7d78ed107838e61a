//! Collections: request to pay, request to withdraw, delivery notifications, and invoices.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::ValidationError,
	executor::{ApiRequest, SignedRequestExecutor},
	http::{ApiHttpClient, TransportErrorMapper},
	products::{
		Amount, Currency, Msisdn, NOTE_MAX_CHARS, Party, ReferenceId, TransactionStatus, truncate,
	},
};

/// Maximum length of a delivery notification message.
pub const NOTIFICATION_MAX_CHARS: usize = 100;
/// Default invoice validity, in seconds.
pub const DEFAULT_INVOICE_VALIDITY_SECS: u32 = 360;

/// Body of a request-to-pay or request-to-withdraw call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
	/// Amount to collect.
	pub amount: Amount,
	/// Currency (`EUR` in the sandbox).
	pub currency: Currency,
	/// Customer charged by the request.
	pub payer: Msisdn,
	/// Caller-side identifier echoed back in status responses.
	pub external_id: String,
	/// Message shown to the payer (truncated to 20 characters).
	pub payer_message: String,
	/// Note attached for the payee (truncated to 20 characters).
	pub payee_note: String,
}
impl PaymentRequest {
	/// Creates a request with sandbox defaults and a random external id.
	pub fn new(payer: Msisdn, amount: Amount) -> Self {
		Self {
			amount,
			currency: Currency::default(),
			payer,
			external_id: Uuid::new_v4().to_string(),
			payer_message: "Payment request".into(),
			payee_note: "Transaction completed".into(),
		}
	}

	/// Validates raw phone and amount strings before building the request.
	pub fn parse(payer: &str, amount: &str) -> Result<Self, ValidationError> {
		Ok(Self::new(payer.parse()?, amount.parse()?))
	}

	/// Overrides the currency.
	pub fn with_currency(mut self, currency: Currency) -> Self {
		self.currency = currency;

		self
	}

	/// Overrides the external id.
	pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
		self.external_id = external_id.into();

		self
	}

	/// Overrides the payer message.
	pub fn with_payer_message(mut self, message: impl Into<String>) -> Self {
		self.payer_message = message.into();

		self
	}

	/// Overrides the payee note.
	pub fn with_payee_note(mut self, note: impl Into<String>) -> Self {
		self.payee_note = note.into();

		self
	}

	fn to_json(&self) -> JsonValue {
		serde_json::json!({
			"amount": self.amount.to_string(),
			"currency": self.currency,
			"externalId": self.external_id,
			"payer": Party::from(&self.payer),
			"payerMessage": truncate(&self.payer_message, NOTE_MAX_CHARS),
			"payeeNote": truncate(&self.payee_note, NOTE_MAX_CHARS),
		})
	}
}

/// Body of an invoice creation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceRequest {
	/// Invoiced amount.
	pub amount: Amount,
	/// Currency (`EUR` in the sandbox).
	pub currency: Currency,
	/// Caller-side identifier.
	pub external_id: String,
	/// Seconds the invoice stays payable.
	pub validity_secs: u32,
	/// Customer expected to pay.
	pub intended_payer: Msisdn,
	/// Account credited once paid.
	pub payee: Msisdn,
	/// Free-text description.
	pub description: String,
}
impl InvoiceRequest {
	/// Creates an invoice with sandbox defaults.
	pub fn new(intended_payer: Msisdn, payee: Msisdn, amount: Amount) -> Self {
		Self {
			amount,
			currency: Currency::default(),
			external_id: Uuid::new_v4().to_string(),
			validity_secs: DEFAULT_INVOICE_VALIDITY_SECS,
			intended_payer,
			payee,
			description: "Generated Invoice".into(),
		}
	}

	/// Overrides the validity window.
	pub fn with_validity_secs(mut self, secs: u32) -> Self {
		self.validity_secs = secs;

		self
	}

	/// Overrides the description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();

		self
	}

	fn to_json(&self) -> JsonValue {
		serde_json::json!({
			"amount": self.amount.to_string(),
			"currency": self.currency,
			"externalId": self.external_id,
			"validityDuration": self.validity_secs.to_string(),
			"intendedPayer": Party::from(&self.intended_payer),
			"payee": Party::from(&self.payee),
			"description": self.description,
		})
	}
}

/// Collection product client.
pub struct Collections<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	executor: SignedRequestExecutor<C, M>,
	credential: Credential,
	callback_url: Option<Url>,
}
impl<C, M> Collections<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client for a Collection `credential`.
	pub fn new(executor: SignedRequestExecutor<C, M>, credential: Credential) -> Self {
		Self { executor, credential, callback_url: None }
	}

	/// Sends `X-Callback-Url` with every initiation call.
	pub fn with_callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}

	/// Credential used for every call.
	pub fn credential(&self) -> &Credential {
		&self.credential
	}

	/// Asks `request.payer` to approve a payment; returns the transaction reference.
	pub async fn request_to_pay(&self, request: &PaymentRequest) -> Result<ReferenceId> {
		self.initiate("/collection/v1_0/requesttopay", request.to_json()).await
	}

	/// Fetches the status of a request to pay.
	pub async fn request_to_pay_status(
		&self,
		reference: &ReferenceId,
	) -> Result<TransactionStatus> {
		self.status(&format!("/collection/v1_0/requesttopay/{reference}")).await
	}

	/// Asks `request.payer` to approve a cash withdrawal; returns the transaction reference.
	pub async fn request_to_withdraw(&self, request: &PaymentRequest) -> Result<ReferenceId> {
		self.initiate("/collection/v1_0/requesttowithdraw", request.to_json()).await
	}

	/// Fetches the status of a request to withdraw.
	pub async fn request_to_withdraw_status(
		&self,
		reference: &ReferenceId,
	) -> Result<TransactionStatus> {
		self.status(&format!("/collection/v1_0/requesttowithdraw/{reference}")).await
	}

	/// Sends a payment notification for a request to pay (messages are cut to 100 characters).
	pub async fn delivery_notification(
		&self,
		reference: &ReferenceId,
		message: &str,
	) -> Result<()> {
		if message.trim().is_empty() {
			return Err(ValidationError::new("notification_message", "cannot be empty").into());
		}

		let path = format!("/collection/v1_0/requesttopay/{reference}/deliverynotification");
		let request = ApiRequest::post(path).json(serde_json::json!({
			"notificationMessage": truncate(message, NOTIFICATION_MAX_CHARS),
		}));

		self.executor.execute(&self.credential, request).await?;

		Ok(())
	}

	/// Creates an invoice; returns its reference.
	pub async fn create_invoice(&self, request: &InvoiceRequest) -> Result<ReferenceId> {
		if request.validity_secs == 0 {
			return Err(ValidationError::new("validity_duration", "must be positive").into());
		}

		self.initiate("/collection/v2_0/invoice", request.to_json()).await
	}

	/// Fetches an invoice. The body is returned as MoMo sent it.
	pub async fn invoice_status(&self, reference: &ReferenceId) -> Result<JsonValue> {
		let request = ApiRequest::get(format!("/collection/v2_0/invoice/{reference}"));

		Ok(self.executor.execute(&self.credential, request).await?.body)
	}

	/// Cancels an unpaid invoice.
	pub async fn cancel_invoice(&self, reference: &ReferenceId) -> Result<()> {
		let request = ApiRequest::delete(format!("/collection/v2_0/invoice/{reference}"))
			.reference_id(ReferenceId::generate())
			.callback_url(self.callback_url.as_ref());

		self.executor.execute(&self.credential, request).await?;

		Ok(())
	}

	async fn initiate(&self, path: &str, body: JsonValue) -> Result<ReferenceId> {
		let reference = ReferenceId::generate();
		let request = ApiRequest::post(path)
			.reference_id(reference)
			.callback_url(self.callback_url.as_ref())
			.json(body);

		self.executor.execute(&self.credential, request).await?;

		Ok(reference)
	}

	async fn status(&self, path: &str) -> Result<TransactionStatus> {
		self.executor.execute(&self.credential, ApiRequest::get(path)).await?.decode()
	}
}
impl<C, M> Debug for Collections<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Collections")
			.field("credential", &self.credential)
			.field("callback_url", &self.callback_url)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn payment_body_matches_momo_shape() {
		let request = PaymentRequest::parse("256771234567", "15.5")
			.expect("Request should parse.")
			.with_external_id("order-1")
			.with_payer_message("Thanks for shopping with us today");
		let body = request.to_json();

		assert_eq!(body["amount"], "15.50");
		assert_eq!(body["currency"], "EUR");
		assert_eq!(body["externalId"], "order-1");
		assert_eq!(body["payer"]["partyIdType"], "MSISDN");
		assert_eq!(body["payer"]["partyId"], "256771234567");
		assert_eq!(body["payerMessage"], "Thanks for shopping ");
		assert_eq!(body["payeeNote"], "Transaction complete");
	}

	#[test]
	fn payment_request_rejects_bad_input() {
		assert_eq!(
			PaymentRequest::parse("2567-bad", "10").expect_err("MSISDN must be rejected.").field,
			"msisdn"
		);
		assert_eq!(
			PaymentRequest::parse("256771234567", "0").expect_err("Zero must be rejected.").field,
			"amount"
		);
	}

	#[test]
	fn invoice_body_carries_both_parties() {
		let payer = Msisdn::new("256771234567").expect("MSISDN should parse.");
		let payee = Msisdn::new("256781234567").expect("MSISDN should parse.");
		let amount = Amount::from_minor(1_000).expect("Amount should build.");
		let body = InvoiceRequest::new(payer, payee, amount).with_validity_secs(60).to_json();

		assert_eq!(body["validityDuration"], "60");
		assert_eq!(body["intendedPayer"]["partyId"], "256771234567");
		assert_eq!(body["payee"]["partyId"], "256781234567");
		assert_eq!(body["amount"], "10.00");
	}
}

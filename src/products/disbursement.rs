//! Disbursements: transfers, deposits, and refunds.

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

/// Characters of the recipient name kept in generated payer messages.
const RECIPIENT_NAME_CHARS: usize = 15;

/// Body of a transfer or deposit call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
	/// Amount to send.
	pub amount: Amount,
	/// Currency (`EUR` in the sandbox).
	pub currency: Currency,
	/// Customer credited by the transfer.
	pub payee: Msisdn,
	/// Caller-side identifier echoed back in status responses.
	pub external_id: String,
	/// Message recorded for the payer (truncated to 20 characters).
	pub payer_message: String,
	/// Note shown to the payee (truncated to 20 characters).
	pub payee_note: String,
	/// Recipient name; when set the payer message becomes `Transfer to <name>` and is sent
	/// without the 20 character cap.
	pub recipient: Option<String>,
}
impl TransferRequest {
	/// Creates a request with sandbox defaults and a random external id.
	pub fn new(payee: Msisdn, amount: Amount) -> Self {
		Self {
			amount,
			currency: Currency::default(),
			payee,
			external_id: Uuid::new_v4().to_string(),
			payer_message: "Funds transfer".into(),
			payee_note: "Funds transfer".into(),
			recipient: None,
		}
	}

	/// Validates raw phone and amount strings before building the request.
	pub fn parse(payee: &str, amount: &str) -> Result<Self, ValidationError> {
		Ok(Self::new(payee.parse()?, amount.parse()?))
	}

	/// Addresses the payer message to `name` (`Transfer to <first 15 characters>`).
	pub fn for_recipient(mut self, name: &str) -> Self {
		self.recipient = Some(truncate(name.trim(), RECIPIENT_NAME_CHARS));

		self
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

	/// Overrides the payee note.
	pub fn with_payee_note(mut self, note: impl Into<String>) -> Self {
		self.payee_note = note.into();

		self
	}

	fn to_json(&self) -> JsonValue {
		let payer_message = match &self.recipient {
			Some(name) => format!("Transfer to {name}"),
			None => truncate(&self.payer_message, NOTE_MAX_CHARS),
		};

		serde_json::json!({
			"amount": self.amount.to_string(),
			"currency": self.currency,
			"externalId": self.external_id,
			"payee": Party::from(&self.payee),
			"payerMessage": payer_message,
			"payeeNote": truncate(&self.payee_note, NOTE_MAX_CHARS),
		})
	}
}

/// Body of a refund call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundRequest {
	/// Amount to give back.
	pub amount: Amount,
	/// Currency (`EUR` in the sandbox).
	pub currency: Currency,
	/// Reference of the transaction being refunded.
	pub reference_to_refund: ReferenceId,
	/// Caller-side identifier.
	pub external_id: String,
	/// Refund reason (truncated to 20 characters).
	pub payer_message: String,
	/// Note shown to the payee (truncated to 20 characters).
	pub payee_note: String,
}
impl RefundRequest {
	/// Creates a refund of `amount` against `reference_to_refund`.
	pub fn new(reference_to_refund: ReferenceId, amount: Amount) -> Self {
		Self {
			amount,
			currency: Currency::default(),
			reference_to_refund,
			external_id: Uuid::new_v4().to_string(),
			payer_message: "Transaction refund".into(),
			payee_note: "Refund processed".into(),
		}
	}

	/// Overrides the refund reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.payer_message = reason.into();

		self
	}

	/// Overrides the currency.
	pub fn with_currency(mut self, currency: Currency) -> Self {
		self.currency = currency;

		self
	}

	fn to_json(&self) -> JsonValue {
		serde_json::json!({
			"amount": self.amount.to_string(),
			"currency": self.currency,
			"externalId": self.external_id,
			"referenceIdToRefund": self.reference_to_refund,
			"payerMessage": truncate(&self.payer_message, NOTE_MAX_CHARS),
			"payeeNote": truncate(&self.payee_note, NOTE_MAX_CHARS),
		})
	}
}

/// Disbursement product client.
pub struct Disbursements<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	executor: SignedRequestExecutor<C, M>,
	credential: Credential,
	callback_url: Option<Url>,
}
impl<C, M> Disbursements<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client for a Disbursement `credential`.
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

	/// Sends money to `request.payee`; returns the transaction reference.
	pub async fn transfer(&self, request: &TransferRequest) -> Result<ReferenceId> {
		self.initiate("/disbursement/v1_0/transfer", request.to_json()).await
	}

	/// Fetches the status of a transfer.
	pub async fn transfer_status(&self, reference: &ReferenceId) -> Result<TransactionStatus> {
		self.status(&format!("/disbursement/v1_0/transfer/{reference}")).await
	}

	/// Deposits (cash in) money into `request.payee`'s wallet.
	pub async fn deposit(&self, request: &TransferRequest) -> Result<ReferenceId> {
		self.initiate("/disbursement/v1_0/deposit", request.to_json()).await
	}

	/// Fetches the status of a deposit.
	pub async fn deposit_status(&self, reference: &ReferenceId) -> Result<TransactionStatus> {
		self.status(&format!("/disbursement/v1_0/deposit/{reference}")).await
	}

	/// Refunds an earlier transaction; returns the refund's own reference.
	pub async fn refund(&self, request: &RefundRequest) -> Result<ReferenceId> {
		self.initiate("/disbursement/v1_0/refund", request.to_json()).await
	}

	/// Fetches the status of a refund.
	pub async fn refund_status(&self, reference: &ReferenceId) -> Result<TransactionStatus> {
		self.status(&format!("/disbursement/v1_0/refund/{reference}")).await
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
impl<C, M> Debug for Disbursements<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Disbursements")
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
	fn transfer_body_addresses_recipient() {
		let body = TransferRequest::parse("256771234567", "250")
			.expect("Request should parse.")
			.for_recipient("Nakato Florence Namutebi")
			.to_json();

		assert_eq!(body["amount"], "250.00");
		assert_eq!(body["payee"]["partyId"], "256771234567");
		assert_eq!(body["payerMessage"], "Transfer to Nakato Florence");
		assert_eq!(body["payeeNote"], "Funds transfer");

		let body = TransferRequest::parse("256771234567", "250")
			.expect("Request should parse.")
			.with_payee_note("Salary advance for March")
			.to_json();

		assert_eq!(body["payerMessage"], "Funds transfer");
		assert_eq!(body["payeeNote"], "Salary advance for M");
	}

	#[test]
	fn refund_body_references_original() {
		let original = ReferenceId::generate();
		let amount = "5.25".parse().expect("Amount should parse.");
		let body = RefundRequest::new(original, amount).with_reason("Duplicate").to_json();

		assert_eq!(body["referenceIdToRefund"], original.to_string());
		assert_eq!(body["payerMessage"], "Duplicate");
		assert_eq!(body["amount"], "5.25");
	}
}

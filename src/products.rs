//! Thin product clients built on the signed request executor.
//!
//! Inputs are validated synchronously, before any I/O; remote business errors are passed
//! through as [`Error::Server`] with MoMo's body intact.

pub mod collection;
pub mod disbursement;
pub mod kyc;

pub use collection::*;
pub use disbursement::*;
pub use kyc::*;

// self
use crate::{_prelude::*, error::ValidationError};

/// Maximum length MoMo accepts for `payerMessage` and `payeeNote`.
pub const NOTE_MAX_CHARS: usize = 20;

/// Mobile subscriber number in international format without the leading `+`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Msisdn(String);
impl Msisdn {
	/// Validates `raw` (digits only, 9 to 15 long; a leading `+` and inner spaces are dropped).
	pub fn new(raw: &str) -> Result<Self, ValidationError> {
		let digits: String =
			raw.trim().trim_start_matches('+').chars().filter(|ch| *ch != ' ').collect();

		if !digits.chars().all(|ch| ch.is_ascii_digit()) {
			return Err(ValidationError::new("msisdn", "must contain only digits"));
		}
		if !(9..=15).contains(&digits.len()) {
			return Err(ValidationError::new("msisdn", "must be 9 to 15 digits long"));
		}

		Ok(Self(digits))
	}

	/// Returns the digits.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl FromStr for Msisdn {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl TryFrom<String> for Msisdn {
	type Error = ValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(&value)
	}
}
impl From<Msisdn> for String {
	fn from(value: Msisdn) -> Self {
		value.0
	}
}
impl Debug for Msisdn {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Msisdn({})", self.0)
	}
}
impl Display for Msisdn {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Positive monetary amount with at most two decimal places, held in minor units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);
impl Amount {
	/// Builds an amount from minor units (cents).
	pub fn from_minor(units: u64) -> Result<Self, ValidationError> {
		if units == 0 {
			return Err(ValidationError::new("amount", "must be positive"));
		}

		Ok(Self(units))
	}

	/// Returns the amount in minor units.
	pub fn minor_units(self) -> u64 {
		self.0
	}
}
impl FromStr for Amount {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let raw = s.trim();

		if raw.starts_with('-') {
			return Err(ValidationError::new("amount", "must be positive"));
		}

		let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));

		if (whole.is_empty() && fraction.is_empty())
			|| !whole.chars().all(|ch| ch.is_ascii_digit())
			|| !fraction.chars().all(|ch| ch.is_ascii_digit())
		{
			return Err(ValidationError::new("amount", "must be a decimal number"));
		}
		if fraction.len() > 2 {
			return Err(ValidationError::new("amount", "must have at most two decimal places"));
		}

		let whole =
			if whole.is_empty() { 0 } else { whole.parse::<u64>().map_err(|_| overflow())? };
		let fraction = format!("{fraction:0<2}").parse::<u64>().map_err(|_| overflow())?;
		let units =
			whole.checked_mul(100).and_then(|w| w.checked_add(fraction)).ok_or_else(overflow)?;

		Self::from_minor(units)
	}
}
impl Display for Amount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
	}
}

fn overflow() -> ValidationError {
	ValidationError::new("amount", "is too large")
}

/// ISO 4217 currency code.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);
impl Currency {
	/// Validates a three-letter uppercase code.
	pub fn new(code: &str) -> Result<Self, ValidationError> {
		if code.len() != 3 || !code.chars().all(|ch| ch.is_ascii_uppercase()) {
			return Err(ValidationError::new("currency", "must be a three-letter uppercase code"));
		}

		Ok(Self(code.to_owned()))
	}

	/// The only currency the MoMo sandbox accepts.
	pub fn eur() -> Self {
		Self("EUR".into())
	}

	/// Returns the code.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Default for Currency {
	fn default() -> Self {
		Self::eur()
	}
}
impl FromStr for Currency {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl TryFrom<String> for Currency {
	type Error = ValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(&value)
	}
}
impl From<Currency> for String {
	fn from(value: Currency) -> Self {
		value.0
	}
}
impl Debug for Currency {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Currency({})", self.0)
	}
}
impl Display for Currency {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// UUID v4 identifying a MoMo transaction (`X-Reference-Id`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(Uuid);
impl ReferenceId {
	/// Generates a fresh reference.
	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	/// Returns the inner UUID.
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}
impl FromStr for ReferenceId {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(s.trim())
			.map(Self)
			.map_err(|_| ValidationError::new("reference_id", "must be a UUID"))
	}
}
impl Debug for ReferenceId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ReferenceId({})", self.0)
	}
}
impl Display for ReferenceId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0.hyphenated(), f)
	}
}

/// Party identifier kinds MoMo accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyIdType {
	/// Mobile number.
	Msisdn,
	/// Email address.
	Email,
	/// Party code.
	PartyCode,
}

/// Payer or payee of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
	/// Identifier kind.
	pub party_id_type: PartyIdType,
	/// Identifier value.
	pub party_id: String,
}
impl From<&Msisdn> for Party {
	fn from(msisdn: &Msisdn) -> Self {
		Self { party_id_type: PartyIdType::Msisdn, party_id: msisdn.as_str().to_owned() }
	}
}

/// Status document MoMo returns for transfers, deposits, refunds, and payment requests.
///
/// Unknown fields are kept in `extra` so nothing MoMo sends is lost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
	/// `PENDING`, `SUCCESSFUL`, or `FAILED`.
	pub status: String,
	/// Amount echoed back by MoMo.
	#[serde(default)]
	pub amount: Option<String>,
	/// Currency echoed back by MoMo.
	#[serde(default)]
	pub currency: Option<String>,
	/// MoMo's own transaction identifier, once settled.
	#[serde(default)]
	pub financial_transaction_id: Option<String>,
	/// Caller-supplied external identifier.
	#[serde(default)]
	pub external_id: Option<String>,
	/// Failure reason, when `status` is `FAILED`.
	#[serde(default)]
	pub reason: Option<JsonValue>,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: BTreeMap<String, JsonValue>,
}
impl TransactionStatus {
	/// Returns `true` once MoMo settled the transaction.
	pub fn is_successful(&self) -> bool {
		self.status.eq_ignore_ascii_case("SUCCESSFUL")
	}

	/// Returns `true` while MoMo is still processing.
	pub fn is_pending(&self) -> bool {
		self.status.eq_ignore_ascii_case("PENDING")
	}
}

/// Truncates free-text notes to MoMo's field limit (counted in characters).
pub(crate) fn truncate(text: &str, max: usize) -> String {
	text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn msisdn_accepts_international_digits() {
		assert_eq!(
			Msisdn::new("+260 971234567").expect("MSISDN should parse.").as_str(),
			"260971234567"
		);
		assert_eq!(Msisdn::new("abc").expect_err("Letters must be rejected.").field, "msisdn");
		assert!(Msisdn::new("12345").is_err());
		assert!(Msisdn::new("1234567890123456").is_err());
	}

	#[test]
	fn amount_parses_and_formats_two_decimals() {
		let amount: Amount = "10".parse().expect("Whole amount should parse.");

		assert_eq!(amount.to_string(), "10.00");
		assert_eq!("0.5".parse::<Amount>().expect("Fraction should parse.").to_string(), "0.50");
		assert_eq!("12.34".parse::<Amount>().expect("Amount should parse.").minor_units(), 1234);
		assert!("0".parse::<Amount>().is_err());
		assert!("0.00".parse::<Amount>().is_err());
		assert!("-5".parse::<Amount>().is_err());
		assert!("1.234".parse::<Amount>().is_err());
		assert!("ten".parse::<Amount>().is_err());
		assert!(".".parse::<Amount>().is_err());
		assert!("99999999999999999999".parse::<Amount>().is_err());
	}

	#[test]
	fn currency_and_reference_validate_format() {
		assert_eq!(Currency::default().as_str(), "EUR");
		assert!(Currency::new("UGX").is_ok());
		assert!(Currency::new("eur").is_err());
		assert!(Currency::new("EURO").is_err());
		assert!("not-a-uuid".parse::<ReferenceId>().is_err());

		let reference = ReferenceId::generate();

		assert_eq!(
			reference.to_string().parse::<ReferenceId>().expect("Reference should parse."),
			reference
		);
	}

	#[test]
	fn party_serializes_in_momo_shape() {
		let party = Party::from(&Msisdn::new("256771234567").expect("MSISDN should parse."));

		assert_eq!(
			serde_json::to_value(&party).expect("Party should serialize."),
			serde_json::json!({ "partyIdType": "MSISDN", "partyId": "256771234567" })
		);
		assert_eq!(truncate("Payment for order #123456", NOTE_MAX_CHARS), "Payment for order #1");
	}
}

//! MoMo product identifiers and their URL conventions.

// self
use crate::{_prelude::*, error::ValidationError};

/// MoMo API products, each with its own subscription key and token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
	/// Payments from customers to the merchant.
	Collection,
	/// Payments from the merchant to customers.
	Disbursement,
	/// Cross-border transfers.
	Remittance,
}
impl Product {
	/// Every product in declaration order.
	pub const ALL: [Product; 3] = [Product::Collection, Product::Disbursement, Product::Remittance];

	/// Returns the URL path segment used by MoMo (`collection`, `disbursement`, `remittance`).
	pub const fn as_str(self) -> &'static str {
		match self {
			Product::Collection => "collection",
			Product::Disbursement => "disbursement",
			Product::Remittance => "remittance",
		}
	}

	/// Returns the prefix used by environment variables (`COLLECTION_KEY`, ...).
	pub const fn env_prefix(self) -> &'static str {
		match self {
			Product::Collection => "COLLECTION",
			Product::Disbursement => "DISBURSEMENT",
			Product::Remittance => "REMITTANCE",
		}
	}

	/// Path of the bearer token endpoint, relative to the base URL.
	pub fn token_path(self) -> String {
		format!("/{}/token/", self.as_str())
	}

	/// Path of the CIBA OAuth token endpoint, relative to the base URL.
	pub fn consent_token_path(self) -> String {
		format!("/{}/oauth2/token/", self.as_str())
	}
}
impl Display for Product {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Product {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Product::ALL
			.into_iter()
			.find(|product| product.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| ValidationError::new("product", format!("`{s}` is not a MoMo product")))
	}
}

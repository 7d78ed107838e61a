//! Optional observability helpers for manager and executor operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `momo_broker.operation` with the
//!   `operation` and `product` fields, plus an event whenever a rejected token is retried.
//! - Enable `metrics` to increment the `momo_broker_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`, and the
//!   `momo_broker_auth_retry_total` counter labeled by `product`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// API user and API key provisioning.
	Provision,
	/// Bearer token exchange.
	Token,
	/// CIBA consent token exchange.
	Consent,
	/// Signed product request.
	Execute,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Provision => "provision",
			OperationKind::Token => "token",
			OperationKind::Consent => "consent",
			OperationKind::Execute => "execute",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the attempt, runs `fut` inside an operation span, and records its outcome.
pub(crate) async fn observe<T, Fut>(
	kind: OperationKind,
	product: crate::auth::Product,
	fut: Fut,
) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OperationSpan::new(kind, product);

	record_operation_outcome(kind, OperationOutcome::Attempt);

	let result = span.instrument(fut).await;

	record_operation_outcome(
		kind,
		if result.is_ok() { OperationOutcome::Success } else { OperationOutcome::Failure },
	);

	result
}

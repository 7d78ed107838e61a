// self
use crate::{
	auth::Product,
	obs::{OperationKind, OperationOutcome},
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"momo_broker_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a retry triggered by a rejected bearer token.
pub fn record_auth_retry(product: Product) {
	#[cfg(feature = "tracing")]
	tracing::debug!(product = product.as_str(), "Bearer token rejected; retrying once.");

	#[cfg(feature = "metrics")]
	{
		metrics::counter!("momo_broker_auth_retry_total", "product" => product.as_str())
			.increment(1);
	}

	#[cfg(not(any(feature = "metrics", feature = "tracing")))]
	{
		let _ = product;
	}
}

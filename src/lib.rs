//! MTN Mobile Money client: API user provisioning, single-flight token caching, signed product
//! requests, and a typed error taxonomy in one async crate.
//!
//! The crate is layered leaf to root:
//!
//! - [`config`] holds the [`CredentialStore`](config::CredentialStore) (base URL, target
//!   environment, one subscription key per product).
//! - [`manager`] owns per-credential sessions: provisioning, token exchange, caching, refresh.
//! - [`executor`] signs and sends product requests, retrying once after a rejected token.
//! - [`products`] exposes thin Collections, Disbursements, and KYC clients.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod manager;
pub mod obs;
pub mod products;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;
	pub use uuid::Uuid;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};

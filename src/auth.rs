//! Auth-domain models: products, credentials, and token values.

pub mod credential;
pub mod product;
pub mod token;

pub use credential::*;
pub use product::*;
pub use token::{access::*, secret::*};

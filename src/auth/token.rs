//! Token values owned by the auth manager.

pub mod access;
pub mod secret;

//! Pesa session layer.
//!
//! Bearer tokens are 256 bits of OS entropy, stored only as BLAKE3 digests,
//! bound to one identity, one role, one scope, and an expiry. The resolver
//! turns an inbound `Authorization` value into an [`pesa_core::Identity`]
//! exactly once per request; everything downstream receives that identity as
//! an explicit argument.

pub mod error;
pub mod resolver;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use resolver::SessionResolver;
pub use store::ISessionStore;
pub use token::{SessionToken, SCOPE_AUTHENTICATION};

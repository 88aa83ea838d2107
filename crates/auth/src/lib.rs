//! `voucherdesk-auth`: identity boundary.
//!
//! Decoupled from HTTP and storage: resolves *who* the current owner is, nothing more.

pub mod claims;
pub mod error;
pub mod identity;
pub mod token;

pub use claims::{validate_claims, SessionClaims};
pub use error::AuthError;
pub use identity::{IdentityProvider, LocalIdentity, SessionIdentity};
pub use token::{Hs256TokenValidator, TokenValidator};

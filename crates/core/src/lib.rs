//! `voucherdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult, FieldViolation, ValidationErrors};
pub use id::{OwnerId, VoucherId};
pub use money::Amount;

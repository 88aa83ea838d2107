//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of the user that owns vouchers (the authenticated subject).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

/// Identifier of a persisted voucher.
///
/// Always assigned by the persistence backend: sequential `V001`-style ids for
/// the local store, UUIDs for the relational store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoucherId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Build an identifier from any non-blank string (surrounding whitespace is trimmed).
            pub fn parse(value: impl AsRef<str>) -> Result<Self, DomainError> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: must not be empty", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_string_newtype!(OwnerId, "OwnerId");
impl_string_newtype!(VoucherId, "VoucherId");

impl VoucherId {
    const SEQUENTIAL_PREFIX: char = 'V';

    /// Time-ordered random id (UUIDv7), used by backends that own id generation
    /// but have no native key generator.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Sequential id `V<n>` zero-padded to at least three digits (`V001`, `V042`, `V1000`).
    pub fn sequential(n: u64) -> Self {
        Self(format!("{}{n:03}", Self::SEQUENTIAL_PREFIX))
    }

    /// Numeric suffix of a sequential id, `None` for any other id shape.
    pub fn sequence_number(&self) -> Option<u64> {
        let digits = self.0.strip_prefix(Self::SEQUENTIAL_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Next sequential id after every sequential id in `existing` (`max + 1`, starting at `V001`).
    pub fn next_sequential<'a>(existing: impl IntoIterator<Item = &'a VoucherId>) -> Self {
        let max = existing
            .into_iter()
            .filter_map(VoucherId::sequence_number)
            .max()
            .unwrap_or(0);
        Self::sequential(max.saturating_add(1))
    }

    /// Interpret the id as a UUID (relational backend keys).
    pub fn to_uuid(&self) -> Option<Uuid> {
        Uuid::from_str(&self.0).ok()
    }
}

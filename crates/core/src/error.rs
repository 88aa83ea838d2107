//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A voucher field that failed save validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldViolation {
    Title,
    Type,
    DateRange,
    /// Submission requires at least one expense.
    Expenses,
}

impl FieldViolation {
    /// Stable field name a presentation layer can use to highlight inputs.
    pub fn field(&self) -> &'static str {
        match self {
            FieldViolation::Title => "title",
            FieldViolation::Type => "type",
            FieldViolation::DateRange => "dateRange",
            FieldViolation::Expenses => "expenses",
        }
    }
}

impl core::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.field())
    }
}

/// Every field that failed validation, in field order (never empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldViolation>);

impl ValidationErrors {
    /// `None` when there is nothing to report.
    pub fn from_violations(violations: Vec<FieldViolation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self(violations))
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(FieldViolation::field).collect()
    }

    pub fn contains(&self, violation: FieldViolation) -> bool {
        self.0.contains(&violation)
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid fields: {}", self.fields().join(", "))
    }
}

/// Domain-level error.
///
/// Deterministic business failures only (validation, lifecycle, malformed input).
/// Storage and transport failures belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more voucher fields are missing.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("invalid category: {0}")]
    InvalidCategory(String),

    /// Non-positive, non-finite or otherwise unusable amount/distance.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("missing date")]
    MissingDate,

    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Mutation attempted on a submitted voucher.
    #[error("voucher is submitted and can no longer be edited")]
    VoucherLocked,

    #[error("expense index {index} out of range (expense count: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid voucher status: {0}")]
    InvalidStatus(String),
}

impl DomainError {
    pub fn invalid_category(msg: impl Into<String>) -> Self {
        Self::InvalidCategory(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_date(msg: impl Into<String>) -> Self {
        Self::InvalidDate(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

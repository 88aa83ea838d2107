//! Monetary amounts in minor currency units.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Number of minor units per major unit (paise per rupee, cents per dollar).
pub const MINOR_PER_MAJOR: u64 = 100;

/// Non-negative amount in the smallest currency unit.
///
/// Integer arithmetic keeps totals exact; the two-decimal display form is
/// derived, never stored.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Convert a decimal major-unit value (e.g. `45.5`) rounding half away from
    /// zero to the nearest minor unit.
    pub fn from_major(major: f64) -> DomainResult<Self> {
        if !major.is_finite() {
            return Err(DomainError::invalid_amount("amount must be a finite number"));
        }
        if major < 0.0 {
            return Err(DomainError::invalid_amount("amount must not be negative"));
        }
        let minor = (major * MINOR_PER_MAJOR as f64).round();
        if minor > u64::MAX as f64 {
            return Err(DomainError::invalid_amount("amount is too large"));
        }
        Ok(Self(minor as u64))
    }

    /// Lossy major-unit view, for display and tolerance checks only.
    pub fn as_major(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / MINOR_PER_MAJOR, self.0 % MINOR_PER_MAJOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Amount::from_minor(35_000).to_string(), "350.00");
        assert_eq!(Amount::from_minor(5).to_string(), "0.05");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn from_major_rounds_to_nearest_minor_unit() {
        assert_eq!(Amount::from_major(45.0).unwrap().minor(), 4_500);
        assert_eq!(Amount::from_major(0.125).unwrap().minor(), 13);
        assert_eq!(Amount::from_major(12.344).unwrap().minor(), 1_234);
        assert_eq!(Amount::from_major(0.004).unwrap().minor(), 0);
    }

    #[test]
    fn from_major_rejects_unusable_values() {
        assert!(matches!(Amount::from_major(f64::NAN), Err(DomainError::InvalidAmount(_))));
        assert!(matches!(Amount::from_major(f64::INFINITY), Err(DomainError::InvalidAmount(_))));
        assert!(matches!(Amount::from_major(-1.0), Err(DomainError::InvalidAmount(_))));
    }

    #[test]
    fn checked_add_reports_overflow() {
        let big = Amount::from_minor(u64::MAX - 1);
        assert_eq!(big.checked_add(Amount::from_minor(1)), Some(Amount::from_minor(u64::MAX)));
        assert_eq!(big.checked_add(Amount::from_minor(2)), None);
        assert_eq!(big.saturating_add(Amount::from_minor(2)).minor(), u64::MAX);
    }

    proptest! {
        #[test]
        fn whole_minor_values_survive_major_conversion(minor in 0u64..10_000_000_000u64) {
            let amount = Amount::from_minor(minor);
            prop_assert_eq!(Amount::from_major(amount.as_major()).unwrap(), amount);
        }
    }
}

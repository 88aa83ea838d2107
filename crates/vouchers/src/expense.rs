use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use voucherdesk_core::{Amount, DomainError, DomainResult};

/// Reimbursement rate for fuel, in major currency units per kilometre.
pub const FUEL_RATE: f64 = 3.5;

/// Same rate in minor units per kilometre; the derivation uses this one.
pub const FUEL_RATE_MINOR_PER_KM: f64 = 350.0;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Expense category (fixed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Bus,
    Auto,
    Taxi,
    Food,
    Fuel,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Bus,
        ExpenseCategory::Auto,
        ExpenseCategory::Taxi,
        ExpenseCategory::Food,
        ExpenseCategory::Fuel,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Bus => "bus",
            ExpenseCategory::Auto => "auto",
            ExpenseCategory::Taxi => "taxi",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Fuel => "fuel",
            ExpenseCategory::Other => "other",
        }
    }

    /// Whether the amount is derived from a distance instead of entered directly.
    pub fn is_distance_based(&self) -> bool {
        matches!(self, ExpenseCategory::Fuel)
    }
}

impl core::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.is_empty() {
            return Err(DomainError::invalid_category("category is required"));
        }
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::invalid_category(format!("unknown category '{wanted}'")))
    }
}

/// The two mutually exclusive ways an expense value is entered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExpenseInput {
    /// Fuel: the amount is `distance_km * FUEL_RATE`.
    Fuel { distance_km: f64 },
    /// Every other category: the amount as entered, in major units.
    Direct { amount: f64 },
}

impl ExpenseInput {
    /// Interpret a single numeric input according to the category.
    pub fn for_category(category: ExpenseCategory, amount_or_distance: f64) -> Self {
        if category.is_distance_based() {
            ExpenseInput::Fuel {
                distance_km: amount_or_distance,
            }
        } else {
            ExpenseInput::Direct {
                amount: amount_or_distance,
            }
        }
    }
}

/// Fuel amount for a distance, rounded to the nearest minor unit.
pub fn fuel_amount(distance_km: f64) -> DomainResult<Amount> {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return Err(DomainError::invalid_amount(
            "distance must be a finite number greater than zero",
        ));
    }
    let minor = (distance_km * FUEL_RATE_MINOR_PER_KM).round();
    if minor > u64::MAX as f64 {
        return Err(DomainError::invalid_amount("distance is too large"));
    }
    // A very short distance may round to 0.00; that is still a valid fuel entry.
    Ok(Amount::from_minor(minor as u64))
}

/// A single dated, categorized cost entry.
///
/// Only constructible through validation: for fuel the amount is always the
/// rate-derived value of `distance_km` (zero for a negligible distance), for anything else it is positive and
/// there is no distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExpenseRecord", into = "ExpenseRecord")]
pub struct Expense {
    date: NaiveDate,
    category: ExpenseCategory,
    amount: Amount,
    distance_km: Option<f64>,
    description: String,
}

impl Expense {
    /// Build an expense from raw form values.
    ///
    /// `amount_or_distance` is a distance in km for fuel and a major-unit amount
    /// for every other category.
    pub fn create(
        category: &str,
        description: Option<&str>,
        date: &str,
        amount_or_distance: f64,
    ) -> DomainResult<Self> {
        let category: ExpenseCategory = category.parse()?;
        let date = parse_date(date)?;
        Self::from_input(
            category,
            description.unwrap_or_default(),
            date,
            ExpenseInput::for_category(category, amount_or_distance),
        )
    }

    /// Typed constructor: resolves the input once into a normalized amount.
    pub fn from_input(
        category: ExpenseCategory,
        description: impl Into<String>,
        date: NaiveDate,
        input: ExpenseInput,
    ) -> DomainResult<Self> {
        let (amount, distance_km) = match (category.is_distance_based(), input) {
            (true, ExpenseInput::Fuel { distance_km }) => (fuel_amount(distance_km)?, Some(distance_km)),
            (false, ExpenseInput::Direct { amount }) => (direct_amount(amount)?, None),
            (true, ExpenseInput::Direct { .. }) => {
                return Err(DomainError::invalid_amount(
                    "fuel expenses are entered as a distance",
                ));
            }
            (false, ExpenseInput::Fuel { .. }) => {
                return Err(DomainError::invalid_amount(format!(
                    "{category} expenses are entered as an amount"
                )));
            }
        };

        Ok(Self {
            date,
            category,
            amount,
            distance_km,
            description: description.into(),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn category(&self) -> ExpenseCategory {
        self.category
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn distance_km(&self) -> Option<f64> {
        self.distance_km
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

fn direct_amount(amount: f64) -> DomainResult<Amount> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DomainError::invalid_amount(
            "amount must be a finite number greater than zero",
        ));
    }
    let amount = Amount::from_major(amount)?;
    if amount.is_zero() {
        return Err(DomainError::invalid_amount("amount rounds to zero"));
    }
    Ok(amount)
}

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`).
pub fn parse_date(raw: &str) -> DomainResult<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DomainError::MissingDate);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| DomainError::invalid_date(format!("'{raw}': {e}")))
}

/// Flat persisted shape of an expense (`{ date, category, amount, distanceKm?, description }`).
///
/// Converting back into an [`Expense`] re-checks every invariant, so records
/// coming from storage cannot smuggle in a fuel amount that disagrees with its
/// distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    /// Minor currency units.
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub description: String,
}

impl TryFrom<ExpenseRecord> for Expense {
    type Error = DomainError;

    fn try_from(record: ExpenseRecord) -> Result<Self, Self::Error> {
        let input = match (record.category.is_distance_based(), record.distance_km) {
            (true, Some(distance_km)) => ExpenseInput::Fuel { distance_km },
            (true, None) => {
                return Err(DomainError::invalid_amount("fuel expense without a distance"));
            }
            (false, None) => ExpenseInput::Direct {
                amount: record.amount.as_major(),
            },
            (false, Some(_)) => {
                return Err(DomainError::invalid_amount(format!(
                    "{} expense must not carry a distance",
                    record.category
                )));
            }
        };

        let expense = Expense::from_input(record.category, record.description, record.date, input)?;
        if expense.amount != record.amount {
            return Err(DomainError::invalid_amount(format!(
                "stored amount {} does not match derived amount {}",
                record.amount, expense.amount
            )));
        }
        Ok(expense)
    }
}

impl From<Expense> for ExpenseRecord {
    fn from(expense: Expense) -> Self {
        Self {
            date: expense.date,
            category: expense.category,
            amount: expense.amount,
            distance_km: expense.distance_km,
            description: expense.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn fuel_amount_is_derived_from_distance() {
        let e = Expense::create("fuel", Some("site visit"), "2025-01-16", 30.0).unwrap();
        assert_eq!(e.category(), ExpenseCategory::Fuel);
        assert_eq!(e.amount().to_string(), "105.00");
        assert_eq!(e.distance_km(), Some(30.0));
    }

    #[test]
    fn direct_amount_is_taken_as_entered() {
        let e = Expense::create("Bus", None, "2025-01-15", 45.0).unwrap();
        assert_eq!(e.category(), ExpenseCategory::Bus);
        assert_eq!(e.amount().minor(), 4_500);
        assert_eq!(e.distance_km(), None);
        assert_eq!(e.description(), "");
    }

    #[test]
    fn unknown_or_missing_category_is_rejected() {
        assert!(matches!(
            Expense::create("train", None, "2025-01-15", 10.0),
            Err(DomainError::InvalidCategory(_))
        ));
        assert!(matches!(
            Expense::create("  ", None, "2025-01-15", 10.0),
            Err(DomainError::InvalidCategory(_))
        ));
    }

    #[test]
    fn non_positive_values_are_rejected() {
        for value in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    Expense::create("food", None, "2025-01-15", value),
                    Err(DomainError::InvalidAmount(_))
                ),
                "food amount {value} accepted"
            );
            assert!(
                matches!(
                    Expense::create("fuel", None, "2025-01-15", value),
                    Err(DomainError::InvalidAmount(_))
                ),
                "fuel distance {value} accepted"
            );
        }
        assert!(matches!(
            Expense::create("food", None, "2025-01-15", 0.001),
            Err(DomainError::InvalidAmount(_))
        ));
    }

    #[test]
    fn tiny_fuel_distance_rounds_to_zero_amount() {
        let e = Expense::create("fuel", None, "2025-01-15", 0.001).unwrap();
        assert_eq!(e.amount(), Amount::ZERO);
        assert_eq!(e.distance_km(), Some(0.001));

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["amount"], 0);
        assert_eq!(serde_json::from_value::<Expense>(json).unwrap(), e);
    }

    #[test]
    fn missing_and_malformed_dates_are_distinguished() {
        assert_eq!(
            Expense::create("taxi", None, "", 10.0).unwrap_err(),
            DomainError::MissingDate
        );
        assert!(matches!(
            Expense::create("taxi", None, "2025-02-30", 10.0),
            Err(DomainError::InvalidDate(_))
        ));
    }

    #[test]
    fn input_mode_must_match_category() {
        let date = day("2025-01-15");
        assert!(matches!(
            Expense::from_input(ExpenseCategory::Fuel, "", date, ExpenseInput::Direct { amount: 50.0 }),
            Err(DomainError::InvalidAmount(_))
        ));
        assert!(matches!(
            Expense::from_input(ExpenseCategory::Taxi, "", date, ExpenseInput::Fuel { distance_km: 5.0 }),
            Err(DomainError::InvalidAmount(_))
        ));
    }

    #[test]
    fn record_round_trip_rechecks_fuel_derivation() {
        let fuel = Expense::create("fuel", Some("depot"), "2025-01-16", 12.5).unwrap();
        let json = serde_json::to_value(&fuel).unwrap();
        assert_eq!(json["amount"], 4_375);
        assert_eq!(json["distanceKm"], 12.5);
        let back: Expense = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, fuel);

        let mut tampered = json;
        tampered["amount"] = serde_json::json!(9_999);
        assert!(serde_json::from_value::<Expense>(tampered).is_err());
    }

    #[test]
    fn record_without_distance_for_fuel_is_rejected() {
        let record = ExpenseRecord {
            date: day("2025-01-16"),
            category: ExpenseCategory::Fuel,
            amount: Amount::from_minor(10_500),
            distance_km: None,
            description: String::new(),
        };
        assert!(Expense::try_from(record).is_err());
    }

    proptest! {
        #[test]
        fn fuel_amount_is_distance_times_rate_rounded(distance in 0.000_001f64..100_000.0f64) {
            let e = Expense::from_input(
                ExpenseCategory::Fuel,
                "",
                day("2025-01-01"),
                ExpenseInput::Fuel { distance_km: distance },
            ).unwrap();
            prop_assert_eq!(e.amount().minor(), (distance * FUEL_RATE_MINOR_PER_KM).round() as u64);
            prop_assert!((e.amount().as_major() - distance * FUEL_RATE).abs() <= 0.005 + 1e-6);
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voucherdesk_core::{DomainError, DomainResult, OwnerId, VoucherId};
use voucherdesk_vouchers::{
    parse_date, Expense, ExpenseCategory, ExpenseInput, ExpenseRecord, Voucher, VoucherFields,
    VoucherStatus,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveVoucherRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub voucher_type: String,
    #[serde(default)]
    pub date_range: String,
    #[serde(default)]
    pub expenses: Vec<ExpenseRequest>,
}

/// One expense as entered: `amount` for most categories, `distanceKm` for fuel.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

impl SaveVoucherRequest {
    pub fn fields(&self) -> VoucherFields {
        VoucherFields::new(&self.title, &self.voucher_type, &self.date_range)
    }

    /// Resolve every expense; the first malformed one fails the whole request.
    pub fn expenses(&self) -> DomainResult<Vec<Expense>> {
        self.expenses.iter().map(ExpenseRequest::to_expense).collect()
    }
}

impl ExpenseRequest {
    pub fn to_expense(&self) -> DomainResult<Expense> {
        let category: ExpenseCategory = self.category.parse()?;
        let date = parse_date(&self.date)?;
        let input = match (self.amount, self.distance_km) {
            (Some(amount), None) => ExpenseInput::Direct { amount },
            (None, Some(distance_km)) => ExpenseInput::Fuel { distance_km },
            (Some(_), Some(_)) => {
                return Err(DomainError::invalid_amount(
                    "give either amount or distanceKm, not both",
                ));
            }
            (None, None) => {
                return Err(DomainError::invalid_amount(if category.is_distance_based() {
                    "distanceKm is required for fuel"
                } else {
                    "amount is required"
                }));
            }
        };
        Expense::from_input(category, self.description.clone().unwrap_or_default(), date, input)
    }
}

pub fn parse_status(raw: Option<&str>) -> DomainResult<Option<VoucherStatus>> {
    raw.map(str::parse::<VoucherStatus>).transpose()
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherResponse {
    pub id: Option<VoucherId>,
    pub owner_id: OwnerId,
    pub title: String,
    #[serde(rename = "type")]
    pub voucher_type: String,
    pub date_range: String,
    pub status: VoucherStatus,
    /// Minor currency units.
    pub total_amount: u64,
    /// `totalAmount` formatted as `<major>.<minor>`.
    pub total: String,
    pub expenses: Vec<ExpenseRecord>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Voucher> for VoucherResponse {
    fn from(v: &Voucher) -> Self {
        let fields = v.fields();
        Self {
            id: v.id().cloned(),
            owner_id: v.owner_id().clone(),
            title: fields.title.clone(),
            voucher_type: fields.voucher_type.clone(),
            date_range: fields.date_range.clone(),
            status: v.status(),
            total_amount: v.total_amount().minor(),
            total: v.total_amount().to_string(),
            expenses: v.expenses().iter().cloned().map(ExpenseRecord::from).collect(),
            created_at: v.created_at(),
            updated_at: v.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub id: VoucherId,
}

//! Backend-agnostic persisted shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voucherdesk_core::{Amount, OwnerId, VoucherId};

use crate::expense::Expense;
use crate::voucher::{VoucherDraft, VoucherFields, VoucherStatus};

/// A voucher row together with its expense set, as a store keeps it.
///
/// `total_amount` always comes from the draft the record was built or replaced
/// with; readers rebuilding a [`crate::Voucher`] recompute it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRecord {
    pub id: VoucherId,
    pub owner_id: OwnerId,
    pub title: String,
    #[serde(rename = "type")]
    pub voucher_type: String,
    pub date_range: String,
    pub status: VoucherStatus,
    pub total_amount: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expenses: Vec<Expense>,
}

impl VoucherRecord {
    /// First write of a voucher: `created_at` is fixed here for good.
    pub fn new(id: VoucherId, owner_id: OwnerId, draft: VoucherDraft, now: DateTime<Utc>) -> Self {
        let (fields, status, expenses, total_amount) = draft.into_parts();
        Self {
            id,
            owner_id,
            title: fields.title,
            voucher_type: fields.voucher_type,
            date_range: fields.date_range,
            status,
            total_amount,
            created_at: now,
            updated_at: now,
            expenses,
        }
    }

    /// Replace every field and the whole expense set, keeping id, owner and `created_at`.
    pub fn replace(&mut self, draft: VoucherDraft, now: DateTime<Utc>) {
        let (fields, status, expenses, total_amount) = draft.into_parts();
        self.title = fields.title;
        self.voucher_type = fields.voucher_type;
        self.date_range = fields.date_range;
        self.status = status;
        self.total_amount = total_amount;
        self.expenses = expenses;
        self.updated_at = now;
    }

    pub fn fields(&self) -> VoucherFields {
        VoucherFields::new(&self.title, &self.voucher_type, &self.date_range)
    }

    pub fn summary(&self) -> VoucherSummary {
        VoucherSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            voucher_type: self.voucher_type.clone(),
            date_range: self.date_range.clone(),
            status: self.status,
            total_amount: self.total_amount,
            expense_count: self.expenses.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// List-view projection of a voucher (no expense lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherSummary {
    pub id: VoucherId,
    pub title: String,
    #[serde(rename = "type")]
    pub voucher_type: String,
    pub date_range: String,
    pub status: VoucherStatus,
    pub total_amount: Amount,
    pub expense_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voucherdesk_core::{
    Amount, DomainError, DomainResult, FieldViolation, OwnerId, ValidationErrors, VoucherId,
};

use crate::expense::Expense;
use crate::record::VoucherRecord;

/// Voucher lifecycle: `Draft -> Submitted`, one-directional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    Draft,
    Submitted,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Draft => "Draft",
            VoucherStatus::Submitted => "Submitted",
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, VoucherStatus::Draft)
    }
}

impl core::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for VoucherStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(VoucherStatus::Draft),
            "submitted" => Ok(VoucherStatus::Submitted),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// Header fields of a voucher, all required (non-blank) in every state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherFields {
    pub title: String,
    /// Classification tag, e.g. "Project" or "Month".
    #[serde(rename = "type")]
    pub voucher_type: String,
    /// Covered period, free text (e.g. "2025-01-15 to 2025-01-20").
    pub date_range: String,
}

impl VoucherFields {
    pub fn new(
        title: impl Into<String>,
        voucher_type: impl Into<String>,
        date_range: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            voucher_type: voucher_type.into(),
            date_range: date_range.into(),
        }
    }

    fn violations(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.title.trim().is_empty() {
            violations.push(FieldViolation::Title);
        }
        if self.voucher_type.trim().is_empty() {
            violations.push(FieldViolation::Type);
        }
        if self.date_range.trim().is_empty() {
            violations.push(FieldViolation::DateRange);
        }
        violations
    }
}

fn total_overflow() -> DomainError {
    DomainError::invalid_amount("voucher total exceeds the largest representable amount")
}

fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> DomainResult<Amount> {
    amounts
        .into_iter()
        .try_fold(Amount::ZERO, |acc, a| acc.checked_add(a).ok_or_else(total_overflow))
}

/// Sum of expense amounts; zero for no expenses. Overflow is an error, never capped.
pub fn compute_total(expenses: &[Expense]) -> DomainResult<Amount> {
    checked_sum(expenses.iter().map(Expense::amount))
}

/// Check the fields required to persist a voucher.
///
/// `require_expenses` is set for submission, which also needs at least one expense.
/// Every violated field is reported, not just the first.
pub fn validate_for_save(
    fields: &VoucherFields,
    expenses: &[Expense],
    require_expenses: bool,
) -> Result<(), ValidationErrors> {
    let mut violations = fields.violations();
    if require_expenses && expenses.is_empty() {
        violations.push(FieldViolation::Expenses);
    }
    match ValidationErrors::from_violations(violations) {
        Some(errors) => Err(errors),
        None => Ok(()),
    }
}

/// Write payload handed to a store.
///
/// The total is fixed at construction and always equals the sum of `expenses`;
/// an expense set whose sum does not fit an [`Amount`] never becomes a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct VoucherDraft {
    fields: VoucherFields,
    status: VoucherStatus,
    expenses: Vec<Expense>,
    total_amount: Amount,
}

impl VoucherDraft {
    pub fn new(
        fields: VoucherFields,
        status: VoucherStatus,
        expenses: Vec<Expense>,
    ) -> DomainResult<Self> {
        let total_amount = compute_total(&expenses)?;
        Ok(Self {
            fields,
            status,
            expenses,
            total_amount,
        })
    }

    pub fn fields(&self) -> &VoucherFields {
        &self.fields
    }

    pub fn status(&self) -> VoucherStatus {
        self.status
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn total_amount(&self) -> Amount {
        self.total_amount
    }

    pub(crate) fn into_parts(self) -> (VoucherFields, VoucherStatus, Vec<Expense>, Amount) {
        (self.fields, self.status, self.expenses, self.total_amount)
    }
}

/// Aggregate root: Voucher.
///
/// Doubles as the explicit editing-session value: a fresh voucher is unsaved
/// (`id() == None`), a loaded one carries its store-assigned id. All expense
/// mutations happen here, in memory, before anything is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Voucher {
    id: Option<VoucherId>,
    owner_id: OwnerId,
    fields: VoucherFields,
    status: VoucherStatus,
    expenses: Vec<Expense>,
    total_amount: Amount,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Voucher {
    /// Empty, unsaved draft.
    pub fn new(owner_id: OwnerId) -> Self {
        Self::with_fields(owner_id, VoucherFields::default())
    }

    pub fn with_fields(owner_id: OwnerId, fields: VoucherFields) -> Self {
        Self {
            id: None,
            owner_id,
            fields,
            status: VoucherStatus::Draft,
            expenses: Vec::new(),
            total_amount: Amount::ZERO,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn id(&self) -> Option<&VoucherId> {
        self.id.as_ref()
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn fields(&self) -> &VoucherFields {
        &self.fields
    }

    pub fn status(&self) -> VoucherStatus {
        self.status
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn total_amount(&self) -> Amount {
        self.total_amount
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_editable(&self) -> bool {
        self.status.is_editable()
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(DomainError::VoucherLocked)
        }
    }

    fn ensure_index(&self, index: usize) -> DomainResult<()> {
        if index < self.expenses.len() {
            Ok(())
        } else {
            Err(DomainError::IndexOutOfRange {
                index,
                len: self.expenses.len(),
            })
        }
    }

    /// Record the outcome of a successful save on the working copy.
    ///
    /// A fresh copy takes the id the store assigned, so saving it again updates
    /// that voucher instead of creating another one. An id already held is kept.
    pub fn mark_saved(&mut self, id: VoucherId, status: VoucherStatus) {
        if self.id.is_none() {
            self.id = Some(id);
        }
        self.status = status;
    }

    /// Replace title/type/date range.
    pub fn set_fields(&mut self, fields: VoucherFields) -> DomainResult<()> {
        self.ensure_editable()?;
        self.fields = fields;
        Ok(())
    }

    /// Append an expense (entry order is preserved).
    pub fn add_expense(&mut self, expense: Expense) -> DomainResult<()> {
        self.ensure_editable()?;
        let total = self
            .total_amount
            .checked_add(expense.amount())
            .ok_or_else(total_overflow)?;
        self.expenses.push(expense);
        self.total_amount = total;
        Ok(())
    }

    /// Remove the expense at `index`, returning it.
    pub fn remove_expense(&mut self, index: usize) -> DomainResult<Expense> {
        self.ensure_editable()?;
        self.ensure_index(index)?;
        let total = checked_sum(
            self.expenses
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, e)| e.amount()),
        )?;
        let removed = self.expenses.remove(index);
        self.total_amount = total;
        Ok(removed)
    }

    /// Replace the expense at `index` in place, returning the previous one.
    pub fn update_expense(&mut self, index: usize, expense: Expense) -> DomainResult<Expense> {
        self.ensure_editable()?;
        self.ensure_index(index)?;
        let total = checked_sum(self.expenses.iter().enumerate().map(|(i, e)| {
            if i == index {
                expense.amount()
            } else {
                e.amount()
            }
        }))?;
        let previous = core::mem::replace(&mut self.expenses[index], expense);
        self.total_amount = total;
        Ok(previous)
    }

    pub fn validate_for_save(&self, require_expenses: bool) -> Result<(), ValidationErrors> {
        validate_for_save(&self.fields, &self.expenses, require_expenses)
    }

    pub fn compute_total(&self) -> DomainResult<Amount> {
        compute_total(&self.expenses)
    }
}

impl TryFrom<VoucherRecord> for Voucher {
    type Error = DomainError;

    /// Rehydrate from storage; the total is recomputed, never read back.
    fn try_from(record: VoucherRecord) -> Result<Self, Self::Error> {
        let total_amount = compute_total(&record.expenses)?;
        Ok(Self {
            id: Some(record.id),
            owner_id: record.owner_id,
            fields: VoucherFields {
                title: record.title,
                voucher_type: record.voucher_type,
                date_range: record.date_range,
            },
            status: record.status,
            expenses: record.expenses,
            total_amount,
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
        })
    }
}

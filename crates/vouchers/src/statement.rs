//! Read-only export view of a submitted voucher.

use serde::{Deserialize, Serialize};

use voucherdesk_core::{Amount, VoucherId};

use crate::expense::Expense;
use crate::voucher::{Voucher, VoucherStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementLine {
    pub date: String,
    pub category: String,
    pub amount: Amount,
    pub description: String,
}

impl StatementLine {
    fn from_expense(expense: &Expense) -> Self {
        Self {
            date: expense.date().format("%Y-%m-%d").to_string(),
            category: expense.category().as_str().to_ascii_uppercase(),
            amount: expense.amount(),
            description: expense.description().to_string(),
        }
    }

    /// `date | CATEGORY | amount | description`
    pub fn render(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.date, self.category, self.amount, self.description
        )
    }
}

/// Fully resolved voucher handed to a document renderer.
///
/// The total always equals the sum of the line amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherStatement {
    pub id: VoucherId,
    pub title: String,
    #[serde(rename = "type")]
    pub voucher_type: String,
    pub date_range: String,
    pub lines: Vec<StatementLine>,
    pub total_amount: Amount,
}

impl VoucherStatement {
    /// `None` unless the voucher is persisted and submitted.
    pub fn for_voucher(voucher: &Voucher) -> Option<Self> {
        if voucher.status() != VoucherStatus::Submitted {
            return None;
        }
        let id = voucher.id()?.clone();
        let fields = voucher.fields();
        Some(Self {
            id,
            title: fields.title.clone(),
            voucher_type: fields.voucher_type.clone(),
            date_range: fields.date_range.clone(),
            lines: voucher.expenses().iter().map(StatementLine::from_expense).collect(),
            total_amount: voucher.total_amount(),
        })
    }

    pub fn to_text(&self) -> String {
        let mut out = format!(
            "Voucher {}: {}\nType: {}\nPeriod: {}\n",
            self.id, self.title, self.voucher_type, self.date_range
        );
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        out.push_str(&format!("Total: {}\n", self.total_amount));
        out
    }
}

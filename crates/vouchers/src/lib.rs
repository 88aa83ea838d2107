//! Voucher domain: expenses, the voucher aggregate and its read-side views.
//!
//! Pure domain logic. Persistence lives behind the store trait in `voucherdesk-infra`.

pub mod dashboard;
pub mod expense;
pub mod record;
pub mod statement;
pub mod voucher;

pub use dashboard::DashboardStats;
pub use expense::{
    fuel_amount, parse_date, Expense, ExpenseCategory, ExpenseInput, ExpenseRecord, FUEL_RATE,
    FUEL_RATE_MINOR_PER_KM,
};
pub use record::{VoucherRecord, VoucherSummary};
pub use statement::{StatementLine, VoucherStatement};
pub use voucher::{compute_total, validate_for_save, Voucher, VoucherDraft, VoucherFields, VoucherStatus};

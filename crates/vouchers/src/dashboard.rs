use serde::{Deserialize, Serialize};

use voucherdesk_core::Amount;

use crate::record::VoucherSummary;
use crate::voucher::VoucherStatus;

/// Per-owner counters shown on the landing view.
///
/// The amounts add up totals of different vouchers and cap at the largest
/// representable amount; per-voucher totals never cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub voucher_count: usize,
    pub draft_count: usize,
    pub submitted_count: usize,
    pub total_amount: Amount,
    pub submitted_amount: Amount,
}

impl DashboardStats {
    pub fn from_summaries<'a>(summaries: impl IntoIterator<Item = &'a VoucherSummary>) -> Self {
        summaries.into_iter().fold(Self::default(), |mut stats, s| {
            stats.voucher_count += 1;
            stats.total_amount = stats.total_amount.saturating_add(s.total_amount);
            match s.status {
                VoucherStatus::Draft => stats.draft_count += 1,
                VoucherStatus::Submitted => {
                    stats.submitted_count += 1;
                    stats.submitted_amount = stats.submitted_amount.saturating_add(s.total_amount);
                }
            }
            stats
        })
    }
}

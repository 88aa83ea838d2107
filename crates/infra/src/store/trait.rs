use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use voucherdesk_core::{OwnerId, VoucherId};
use voucherdesk_vouchers::{Voucher, VoucherDraft, VoucherRecord, VoucherStatus, VoucherSummary};

/// Persistence failure.
///
/// `NotFound` covers both "absent" and "owned by someone else": callers must
/// not be able to tell the two apart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("voucher not found")]
    NotFound,

    /// Write attempted on a voucher whose stored status is `Submitted`.
    #[error("voucher is submitted and can no longer be edited")]
    VoucherLocked,

    /// Transport, driver or decoding failure; retryable by the caller.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Rebuild the aggregate from a stored record; a record that breaks the
/// voucher invariants is a backend fault, not a caller error.
pub(crate) fn rehydrate(record: VoucherRecord) -> Result<Voucher, StoreError> {
    let id = record.id.clone();
    Voucher::try_from(record)
        .map_err(|e| StoreError::unavailable(format!("corrupt voucher {id}: {e}")))
}

/// Owner-scoped voucher persistence.
///
/// Every operation takes the owner explicitly; no implementation may return or
/// modify a voucher belonging to a different owner. Writes replace a voucher's
/// expense set as one unit: a reader sees either the old set or the new one.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Persist a new voucher and return the id the backend assigned.
    async fn create(&self, owner_id: &OwnerId, draft: VoucherDraft) -> Result<VoucherId, StoreError>;

    async fn get(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<Voucher, StoreError>;

    /// Summaries, newest-created first.
    async fn list(
        &self,
        owner_id: &OwnerId,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<VoucherSummary>, StoreError>;

    /// Replace fields and the whole expense set; the total is recomputed here.
    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &VoucherId,
        draft: VoucherDraft,
    ) -> Result<(), StoreError>;

    /// Remove the voucher together with its expenses.
    async fn delete(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> VoucherStore for Arc<S>
where
    S: VoucherStore + ?Sized,
{
    async fn create(&self, owner_id: &OwnerId, draft: VoucherDraft) -> Result<VoucherId, StoreError> {
        (**self).create(owner_id, draft).await
    }

    async fn get(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<Voucher, StoreError> {
        (**self).get(owner_id, id).await
    }

    async fn list(
        &self,
        owner_id: &OwnerId,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<VoucherSummary>, StoreError> {
        (**self).list(owner_id, status).await
    }

    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &VoucherId,
        draft: VoucherDraft,
    ) -> Result<(), StoreError> {
        (**self).update(owner_id, id, draft).await
    }

    async fn delete(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<(), StoreError> {
        (**self).delete(owner_id, id).await
    }
}

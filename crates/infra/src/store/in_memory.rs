use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use voucherdesk_core::{OwnerId, VoucherId};
use voucherdesk_vouchers::{Voucher, VoucherDraft, VoucherRecord, VoucherStatus, VoucherSummary};

use super::r#trait::{rehydrate, StoreError, VoucherStore};

#[derive(Debug, Clone)]
struct Entry {
    /// Insertion order; breaks `created_at` ties when listing.
    seq: u64,
    record: VoucherRecord,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    vouchers: HashMap<VoucherId, Entry>,
}

/// In-memory voucher store.
///
/// Intended for tests/dev. A single lock guards every record, so each write
/// (fields plus expense set) is observed whole or not at all.
#[derive(Debug, Default)]
pub struct InMemoryVoucherStore {
    inner: RwLock<Inner>,
}

impl InMemoryVoucherStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of vouchers across every owner.
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.vouchers.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::unavailable("lock poisoned")
}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    async fn create(&self, owner_id: &OwnerId, draft: VoucherDraft) -> Result<VoucherId, StoreError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;

        let id = VoucherId::generate();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let record = VoucherRecord::new(id.clone(), owner_id.clone(), draft, Utc::now());
        inner.vouchers.insert(id.clone(), Entry { seq, record });
        Ok(id)
    }

    async fn get(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<Voucher, StoreError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        let entry = inner
            .vouchers
            .get(id)
            .filter(|e| &e.record.owner_id == owner_id)
            .ok_or(StoreError::NotFound)?;
        rehydrate(entry.record.clone())
    }

    async fn list(
        &self,
        owner_id: &OwnerId,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<VoucherSummary>, StoreError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        let mut entries: Vec<&Entry> = inner
            .vouchers
            .values()
            .filter(|e| &e.record.owner_id == owner_id)
            .filter(|e| status.is_none_or(|s| e.record.status == s))
            .collect();

        entries.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(entries.into_iter().map(|e| e.record.summary()).collect())
    }

    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &VoucherId,
        draft: VoucherDraft,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        let entry = inner
            .vouchers
            .get_mut(id)
            .filter(|e| &e.record.owner_id == owner_id)
            .ok_or(StoreError::NotFound)?;

        if !entry.record.status.is_editable() {
            return Err(StoreError::VoucherLocked);
        }
        entry.record.replace(draft, Utc::now());
        Ok(())
    }

    async fn delete(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        match inner.vouchers.get(id) {
            Some(e) if &e.record.owner_id == owner_id => {
                inner.vouchers.remove(id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

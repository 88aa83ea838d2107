//! Change notifications for live list refreshes.
//!
//! Subscribers receive *that* something changed, never the data itself: the
//! reaction is always a re-list or re-fetch through the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use voucherdesk_core::{OwnerId, VoucherId};
use voucherdesk_vouchers::{Voucher, VoucherDraft, VoucherStatus, VoucherSummary};

use crate::store::{StoreError, VoucherStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherChange {
    pub owner_id: OwnerId,
    pub voucher_id: VoucherId,
    pub kind: ChangeKind,
    pub occurred_at: DateTime<Utc>,
}

/// Fan-out channel of committed voucher changes.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<VoucherChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoucherChange> {
        self.tx.subscribe()
    }

    /// Returns the number of subscribers reached (zero is not an error).
    pub fn publish(&self, change: VoucherChange) -> usize {
        self.tx.send(change).unwrap_or(0)
    }
}

/// Store decorator that publishes a change only after the write succeeded.
pub struct NotifyingVoucherStore<S> {
    store: S,
    feed: ChangeFeed,
}

impl<S> NotifyingVoucherStore<S> {
    pub fn new(store: S, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn announce(&self, owner_id: &OwnerId, voucher_id: &VoucherId, kind: ChangeKind) {
        let reached = self.feed.publish(VoucherChange {
            owner_id: owner_id.clone(),
            voucher_id: voucher_id.clone(),
            kind,
            occurred_at: Utc::now(),
        });
        tracing::debug!(owner_id = %owner_id, voucher_id = %voucher_id, ?kind, reached, "voucher change published");
    }
}

#[async_trait]
impl<S> VoucherStore for NotifyingVoucherStore<S>
where
    S: VoucherStore,
{
    async fn create(&self, owner_id: &OwnerId, draft: VoucherDraft) -> Result<VoucherId, StoreError> {
        let id = self.store.create(owner_id, draft).await?;
        self.announce(owner_id, &id, ChangeKind::Created);
        Ok(id)
    }

    async fn get(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<Voucher, StoreError> {
        self.store.get(owner_id, id).await
    }

    async fn list(
        &self,
        owner_id: &OwnerId,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<VoucherSummary>, StoreError> {
        self.store.list(owner_id, status).await
    }

    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &VoucherId,
        draft: VoucherDraft,
    ) -> Result<(), StoreError> {
        self.store.update(owner_id, id, draft).await?;
        self.announce(owner_id, id, ChangeKind::Updated);
        Ok(())
    }

    async fn delete(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<(), StoreError> {
        self.store.delete(owner_id, id).await?;
        self.announce(owner_id, id, ChangeKind::Deleted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryVoucherStore;
    use voucherdesk_vouchers::{VoucherFields, VoucherStatus};

    fn draft() -> VoucherDraft {
        VoucherDraft::new(
            VoucherFields::new("Trip", "Project", "2025-05"),
            VoucherStatus::Draft,
            vec![],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn successful_writes_are_announced_in_order() {
        let feed = ChangeFeed::new(16);
        let mut rx = feed.subscribe();
        let store = NotifyingVoucherStore::new(InMemoryVoucherStore::new(), feed);
        let owner = OwnerId::parse("alice").unwrap();

        let id = store.create(&owner, draft()).await.unwrap();
        store.update(&owner, &id, draft()).await.unwrap();
        store.delete(&owner, &id).await.unwrap();

        let kinds: Vec<ChangeKind> = (0..3).map(|_| rx.try_recv().unwrap().kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]);
    }

    #[tokio::test]
    async fn failed_writes_publish_nothing() {
        let feed = ChangeFeed::new(16);
        let mut rx = feed.subscribe();
        let store = NotifyingVoucherStore::new(InMemoryVoucherStore::new(), feed);
        let owner = OwnerId::parse("alice").unwrap();
        let missing = VoucherId::sequential(9);

        assert_eq!(store.update(&owner, &missing, draft()).await, Err(StoreError::NotFound));
        assert_eq!(store.delete(&owner, &missing).await, Err(StoreError::NotFound));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let feed = ChangeFeed::new(4);
        let reached = feed.publish(VoucherChange {
            owner_id: OwnerId::parse("bob").unwrap(),
            voucher_id: VoucherId::sequential(1),
            kind: ChangeKind::Created,
            occurred_at: Utc::now(),
        });
        assert_eq!(reached, 0);
    }
}

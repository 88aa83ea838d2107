use async_trait::async_trait;

use voucherdesk_core::{OwnerId, VoucherId};
use voucherdesk_vouchers::{Voucher, VoucherDraft, VoucherStatus, VoucherSummary};

use super::{InMemoryVoucherStore, LocalVoucherStore, PostgresVoucherStore, StoreError, VoucherStore};
use crate::config::StoreBackend;

/// The one backend chosen for this deployment.
#[derive(Debug)]
pub enum AnyVoucherStore {
    InMemory(InMemoryVoucherStore),
    Local(LocalVoucherStore),
    Postgres(PostgresVoucherStore),
}

impl AnyVoucherStore {
    pub async fn connect(backend: &StoreBackend) -> anyhow::Result<Self> {
        let store = match backend {
            StoreBackend::InMemory => Self::InMemory(InMemoryVoucherStore::new()),
            StoreBackend::Local { url } => Self::Local(
                LocalVoucherStore::connect(url)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to open local store at {url}: {e}"))?,
            ),
            StoreBackend::Postgres { url } => Self::Postgres(
                PostgresVoucherStore::connect(url)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to connect to postgres store: {e}"))?,
            ),
        };
        tracing::info!(backend = store.backend_name(), "voucher store ready");
        Ok(store)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::Local(_) => "local",
            Self::Postgres(_) => "postgres",
        }
    }
}

#[async_trait]
impl VoucherStore for AnyVoucherStore {
    async fn create(&self, owner_id: &OwnerId, draft: VoucherDraft) -> Result<VoucherId, StoreError> {
        match self {
            Self::InMemory(s) => s.create(owner_id, draft).await,
            Self::Local(s) => s.create(owner_id, draft).await,
            Self::Postgres(s) => s.create(owner_id, draft).await,
        }
    }

    async fn get(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<Voucher, StoreError> {
        match self {
            Self::InMemory(s) => s.get(owner_id, id).await,
            Self::Local(s) => s.get(owner_id, id).await,
            Self::Postgres(s) => s.get(owner_id, id).await,
        }
    }

    async fn list(
        &self,
        owner_id: &OwnerId,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<VoucherSummary>, StoreError> {
        match self {
            Self::InMemory(s) => s.list(owner_id, status).await,
            Self::Local(s) => s.list(owner_id, status).await,
            Self::Postgres(s) => s.list(owner_id, status).await,
        }
    }

    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &VoucherId,
        draft: VoucherDraft,
    ) -> Result<(), StoreError> {
        match self {
            Self::InMemory(s) => s.update(owner_id, id, draft).await,
            Self::Local(s) => s.update(owner_id, id, draft).await,
            Self::Postgres(s) => s.update(owner_id, id, draft).await,
        }
    }

    async fn delete(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<(), StoreError> {
        match self {
            Self::InMemory(s) => s.delete(owner_id, id).await,
            Self::Local(s) => s.delete(owner_id, id).await,
            Self::Postgres(s) => s.delete(owner_id, id).await,
        }
    }
}

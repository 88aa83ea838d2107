//! Voucher orchestration (application-level use cases).
//!
//! `VoucherService` sits between a presentation layer and a [`VoucherStore`]:
//!
//! ```text
//! fields + expenses (working copy)
//!   ↓
//! 1. Validate (field-level; submission also needs >= 1 expense)
//!   ↓
//! 2. Force the target status (Draft or Submitted)
//!   ↓
//! 3. store.create (no id yet) or store.update (id present)
//! ```
//!
//! Validation failures never reach the store. Store failures are surfaced
//! unchanged in kind; nothing is retried or swallowed here.

use thiserror::Error;
use tracing::instrument;

use voucherdesk_core::{DomainError, OwnerId, ValidationErrors, VoucherId};
use voucherdesk_vouchers::{
    validate_for_save, DashboardStats, Expense, Voucher, VoucherDraft, VoucherFields,
    VoucherStatement, VoucherStatus, VoucherSummary,
};

use crate::store::{StoreError, VoucherStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// One or more fields are missing; every offending field is listed.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Malformed expense input or another deterministic domain failure.
    #[error(transparent)]
    Domain(DomainError),

    #[error("voucher is submitted and can no longer be edited")]
    VoucherLocked,

    #[error("voucher not found")]
    NotFound,

    /// Export requested for a voucher that is still a draft.
    #[error("voucher has not been submitted")]
    NotSubmitted,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::VoucherLocked => ServiceError::VoucherLocked,
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(errors) => ServiceError::Validation(errors),
            DomainError::VoucherLocked => ServiceError::VoucherLocked,
            other => ServiceError::Domain(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        ServiceError::Validation(value)
    }
}

#[derive(Debug)]
pub struct VoucherService<S> {
    store: S,
}

impl<S> VoucherService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> VoucherService<S>
where
    S: VoucherStore,
{
    /// Persist as a draft; expenses are optional at this stage.
    #[instrument(skip(self, fields, expenses), fields(owner_id = %owner_id, voucher_id = ?voucher_id), err)]
    pub async fn save_draft(
        &self,
        owner_id: &OwnerId,
        voucher_id: Option<&VoucherId>,
        fields: VoucherFields,
        expenses: Vec<Expense>,
    ) -> Result<VoucherId, ServiceError> {
        self.persist(owner_id, voucher_id, fields, expenses, VoucherStatus::Draft)
            .await
    }

    /// Finalize: needs every field and at least one expense. One-directional.
    #[instrument(skip(self, fields, expenses), fields(owner_id = %owner_id, voucher_id = ?voucher_id), err)]
    pub async fn submit(
        &self,
        owner_id: &OwnerId,
        voucher_id: Option<&VoucherId>,
        fields: VoucherFields,
        expenses: Vec<Expense>,
    ) -> Result<VoucherId, ServiceError> {
        self.persist(owner_id, voucher_id, fields, expenses, VoucherStatus::Submitted)
            .await
    }

    /// Save an editing session's working copy as a draft.
    ///
    /// On success the copy carries the stored id, so saving it again updates
    /// the same voucher. On failure it is left untouched for a retry.
    pub async fn save_working_copy(&self, voucher: &mut Voucher) -> Result<VoucherId, ServiceError> {
        self.persist_working_copy(voucher, VoucherStatus::Draft).await
    }

    /// Submit an editing session's working copy; afterwards the copy is locked too.
    pub async fn submit_working_copy(&self, voucher: &mut Voucher) -> Result<VoucherId, ServiceError> {
        self.persist_working_copy(voucher, VoucherStatus::Submitted).await
    }

    async fn persist_working_copy(
        &self,
        voucher: &mut Voucher,
        status: VoucherStatus,
    ) -> Result<VoucherId, ServiceError> {
        if !voucher.is_editable() {
            return Err(ServiceError::VoucherLocked);
        }
        let id = self
            .persist(
                voucher.owner_id(),
                voucher.id(),
                voucher.fields().clone(),
                voucher.expenses().to_vec(),
                status,
            )
            .await?;
        voucher.mark_saved(id.clone(), status);
        Ok(id)
    }

    async fn persist(
        &self,
        owner_id: &OwnerId,
        voucher_id: Option<&VoucherId>,
        fields: VoucherFields,
        expenses: Vec<Expense>,
        status: VoucherStatus,
    ) -> Result<VoucherId, ServiceError> {
        let require_expenses = status == VoucherStatus::Submitted;
        if let Err(errors) = validate_for_save(&fields, &expenses, require_expenses) {
            tracing::warn!(fields = ?errors.fields(), "voucher rejected by validation");
            return Err(errors.into());
        }

        let draft = VoucherDraft::new(fields, status, expenses)?;
        match voucher_id {
            Some(id) => {
                self.store.update(owner_id, id, draft).await?;
                Ok(id.clone())
            }
            None => Ok(self.store.create(owner_id, draft).await?),
        }
    }

    /// Delete a voucher, draft or submitted.
    #[instrument(skip(self), fields(owner_id = %owner_id, voucher_id = %voucher_id), err)]
    pub async fn remove(&self, owner_id: &OwnerId, voucher_id: &VoucherId) -> Result<(), ServiceError> {
        Ok(self.store.delete(owner_id, voucher_id).await?)
    }

    pub async fn get(&self, owner_id: &OwnerId, voucher_id: &VoucherId) -> Result<Voucher, ServiceError> {
        Ok(self.store.get(owner_id, voucher_id).await?)
    }

    pub async fn list(
        &self,
        owner_id: &OwnerId,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<VoucherSummary>, ServiceError> {
        Ok(self.store.list(owner_id, status).await?)
    }

    /// Load a stored draft as the working copy for an editing session.
    #[instrument(skip(self), fields(owner_id = %owner_id, voucher_id = %voucher_id), err)]
    pub async fn open_for_edit(
        &self,
        owner_id: &OwnerId,
        voucher_id: &VoucherId,
    ) -> Result<Voucher, ServiceError> {
        let voucher = self.store.get(owner_id, voucher_id).await?;
        if !voucher.is_editable() {
            return Err(ServiceError::VoucherLocked);
        }
        Ok(voucher)
    }

    pub async fn dashboard(&self, owner_id: &OwnerId) -> Result<DashboardStats, ServiceError> {
        let summaries = self.store.list(owner_id, None).await?;
        Ok(DashboardStats::from_summaries(&summaries))
    }

    /// Export view of a submitted voucher.
    #[instrument(skip(self), fields(owner_id = %owner_id, voucher_id = %voucher_id), err)]
    pub async fn statement(
        &self,
        owner_id: &OwnerId,
        voucher_id: &VoucherId,
    ) -> Result<VoucherStatement, ServiceError> {
        let voucher = self.store.get(owner_id, voucher_id).await?;
        VoucherStatement::for_voucher(&voucher).ok_or(ServiceError::NotSubmitted)
    }

    /// Submitted vouchers, newest first: the ones that can be exported.
    pub async fn exportable(&self, owner_id: &OwnerId) -> Result<Vec<VoucherSummary>, ServiceError> {
        Ok(self.store.list(owner_id, Some(VoucherStatus::Submitted)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryVoucherStore;
    use voucherdesk_core::FieldViolation;

    fn owner() -> OwnerId {
        OwnerId::parse("alice").unwrap()
    }

    fn service() -> VoucherService<InMemoryVoucherStore> {
        VoucherService::new(InMemoryVoucherStore::new())
    }

    fn fields() -> VoucherFields {
        VoucherFields::new("Field Visit", "Project", "2025-01-15 to 2025-01-20")
    }

    fn expenses() -> Vec<Expense> {
        vec![
            Expense::create("bus", None, "2025-01-15", 45.0).unwrap(),
            Expense::create("fuel", None, "2025-01-16", 30.0).unwrap(),
            Expense::create("food", None, "2025-01-17", 200.0).unwrap(),
        ]
    }

    #[tokio::test]
    async fn save_draft_then_get_round_trips() {
        let svc = service();
        let id = svc.save_draft(&owner(), None, fields(), expenses()).await.unwrap();

        let loaded = svc.get(&owner(), &id).await.unwrap();
        assert_eq!(loaded.status(), VoucherStatus::Draft);
        assert_eq!(loaded.expenses(), expenses().as_slice());
        assert_eq!(loaded.total_amount().to_string(), "350.00");
    }

    #[tokio::test]
    async fn draft_may_be_saved_without_expenses() {
        let svc = service();
        assert!(svc.save_draft(&owner(), None, fields(), vec![]).await.is_ok());
    }

    #[tokio::test]
    async fn submit_without_expenses_writes_nothing() {
        let svc = service();
        let err = svc.submit(&owner(), None, fields(), vec![]).await.unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                assert_eq!(errors.violations(), &[FieldViolation::Expenses]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(svc.store().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_are_all_reported() {
        let svc = service();
        let err = svc
            .save_draft(&owner(), None, VoucherFields::new("", "", ""), vec![])
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.fields(), vec!["title", "type", "dateRange"]);
    }

    #[tokio::test]
    async fn submitted_voucher_cannot_be_saved_or_resubmitted() {
        let svc = service();
        let id = svc.submit(&owner(), None, fields(), expenses()).await.unwrap();

        assert_eq!(
            svc.save_draft(&owner(), Some(&id), fields(), vec![]).await,
            Err(ServiceError::VoucherLocked)
        );
        assert_eq!(
            svc.submit(&owner(), Some(&id), fields(), expenses()).await,
            Err(ServiceError::VoucherLocked)
        );
        assert_eq!(svc.open_for_edit(&owner(), &id).await.unwrap_err(), ServiceError::VoucherLocked);

        let stored = svc.get(&owner(), &id).await.unwrap();
        assert_eq!(stored.status(), VoucherStatus::Submitted);
        assert_eq!(stored.expenses().len(), 3);
    }

    #[tokio::test]
    async fn field_visit_scenario_end_to_end() {
        let svc = service();
        let mut working = Voucher::with_fields(owner(), fields());
        for e in expenses() {
            working.add_expense(e).unwrap();
        }
        assert_eq!(working.total_amount().to_string(), "350.00");

        let id = svc.submit_working_copy(&mut working).await.unwrap();
        assert_eq!(working.id(), Some(&id));
        assert!(!working.is_editable());
        let mut stored = svc.get(&owner(), &id).await.unwrap();
        assert_eq!(stored.total_amount().to_string(), "350.00");
        assert_eq!(
            stored.add_expense(expenses().remove(0)).unwrap_err(),
            DomainError::VoucherLocked
        );
        assert_eq!(
            svc.submit_working_copy(&mut stored).await,
            Err(ServiceError::VoucherLocked)
        );
    }

    #[tokio::test]
    async fn editing_session_updates_in_place() {
        let svc = service();
        let id = svc.save_draft(&owner(), None, fields(), expenses()).await.unwrap();

        let mut working = svc.open_for_edit(&owner(), &id).await.unwrap();
        working.remove_expense(2).unwrap();
        let saved = svc.save_working_copy(&mut working).await.unwrap();
        assert_eq!(saved, id);

        let stored = svc.get(&owner(), &id).await.unwrap();
        assert_eq!(stored.total_amount().to_string(), "150.00");
        assert_eq!(svc.list(&owner(), None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn new_working_copy_saved_twice_stays_one_voucher() {
        let svc = service();
        let mut working = Voucher::with_fields(owner(), fields());
        working.add_expense(expenses().remove(0)).unwrap();

        let first = svc.save_working_copy(&mut working).await.unwrap();
        working.add_expense(expenses().remove(1)).unwrap();
        let second = svc.save_working_copy(&mut working).await.unwrap();
        let third = svc.submit_working_copy(&mut working).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        let listed = svc.list(&owner(), None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, VoucherStatus::Submitted);
        assert_eq!(listed[0].expense_count, 2);
        assert_eq!(listed[0].total_amount.to_string(), "150.00");
    }

    #[tokio::test]
    async fn failed_working_copy_save_leaves_copy_unsaved() {
        let svc = service();
        let mut working = Voucher::with_fields(owner(), VoucherFields::new("", "Project", "2025-01"));

        assert!(matches!(
            svc.save_working_copy(&mut working).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(working.id(), None);
        assert!(working.is_editable());
        assert!(svc.store().is_empty());
    }

    #[tokio::test]
    async fn overflowing_expense_set_is_rejected_before_the_store() {
        let svc = service();
        let huge = || Expense::create("other", None, "2025-01-15", 1e17).unwrap();

        let err = svc
            .save_draft(&owner(), None, fields(), vec![huge(), huge()])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidAmount(_))));
        assert!(svc.store().is_empty());
    }

    #[tokio::test]
    async fn statement_needs_submission() {
        let svc = service();
        let draft = svc.save_draft(&owner(), None, fields(), expenses()).await.unwrap();
        assert_eq!(svc.statement(&owner(), &draft).await, Err(ServiceError::NotSubmitted));

        let done = svc.submit(&owner(), None, fields(), expenses()).await.unwrap();
        let statement = svc.statement(&owner(), &done).await.unwrap();
        assert_eq!(statement.lines.len(), 3);
        assert_eq!(statement.total_amount.to_string(), "350.00");

        let exportable = svc.exportable(&owner()).await.unwrap();
        assert_eq!(exportable.len(), 1);
        assert_eq!(exportable[0].id, done);
    }

    #[tokio::test]
    async fn dashboard_counts_by_status() {
        let svc = service();
        svc.save_draft(&owner(), None, fields(), vec![]).await.unwrap();
        svc.submit(&owner(), None, fields(), expenses()).await.unwrap();

        let stats = svc.dashboard(&owner()).await.unwrap();
        assert_eq!(stats.voucher_count, 2);
        assert_eq!(stats.draft_count, 1);
        assert_eq!(stats.submitted_count, 1);
        assert_eq!(stats.submitted_amount.to_string(), "350.00");
    }

    #[tokio::test]
    async fn remove_deletes_submitted_vouchers_too() {
        let svc = service();
        let id = svc.submit(&owner(), None, fields(), expenses()).await.unwrap();
        svc.remove(&owner(), &id).await.unwrap();
        assert_eq!(svc.get(&owner(), &id).await.unwrap_err(), ServiceError::NotFound);
        assert_eq!(svc.remove(&owner(), &id).await, Err(ServiceError::NotFound));
    }

    #[test]
    fn store_errors_keep_their_kind() {
        assert_eq!(ServiceError::from(StoreError::NotFound), ServiceError::NotFound);
        assert_eq!(ServiceError::from(StoreError::VoucherLocked), ServiceError::VoucherLocked);
        assert_eq!(
            ServiceError::from(StoreError::unavailable("down")),
            ServiceError::StoreUnavailable("down".into())
        );
    }
}

//! Postgres-backed voucher store.
//!
//! Relational layout: one `vouchers` row per voucher and one
//! `voucher_expenses` row per expense, cascading on delete. The database
//! assigns voucher ids (UUID).
//!
//! ## Ownership
//!
//! Every statement filters on `owner_id`, so a voucher owned by someone else
//! is indistinguishable from a missing one.
//!
//! ## Atomicity
//!
//! Create and update run in a single transaction: header row, then
//! delete-then-insert of the expense set. Reads fetch header and expenses in
//! one statement, so they observe one snapshot.
//!
//! ## Error Mapping
//!
//! Every `sqlx::Error` and every undecodable row maps to `StoreError::Unavailable`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};
use uuid::Uuid;

use voucherdesk_core::{Amount, OwnerId, VoucherId};
use voucherdesk_vouchers::{
    Expense, ExpenseCategory, ExpenseRecord, Voucher, VoucherDraft, VoucherRecord, VoucherStatus,
    VoucherSummary,
};

use super::r#trait::{rehydrate, StoreError, VoucherStore};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS vouchers (
        id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        owner_id     TEXT NOT NULL,
        title        TEXT NOT NULL,
        voucher_type TEXT NOT NULL,
        date_range   TEXT NOT NULL,
        status       TEXT NOT NULL CHECK (status IN ('Draft', 'Submitted')),
        total_amount BIGINT NOT NULL CHECK (total_amount >= 0),
        created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS vouchers_owner_created_idx
        ON vouchers (owner_id, created_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS voucher_expenses (
        voucher_id   UUID NOT NULL REFERENCES vouchers(id) ON DELETE CASCADE,
        position     INTEGER NOT NULL,
        expense_date DATE NOT NULL,
        category     TEXT NOT NULL,
        amount       BIGINT NOT NULL CHECK (amount > 0 OR (category = 'fuel' AND amount = 0)),
        distance_km  DOUBLE PRECISION NULL,
        description  TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (voucher_id, position)
    )
    "#,
];

#[derive(Debug, Clone)]
pub struct PostgresVoucherStore {
    pool: Arc<PgPool>,
}

impl PostgresVoucherStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn insert_expenses(
        tx: &mut Transaction<'_, Postgres>,
        voucher_id: Uuid,
        expenses: &[Expense],
    ) -> Result<(), StoreError> {
        for (position, expense) in expenses.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| StoreError::unavailable("too many expenses"))?;
            sqlx::query(
                r#"
                INSERT INTO voucher_expenses (
                    voucher_id,
                    position,
                    expense_date,
                    category,
                    amount,
                    distance_km,
                    description
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(voucher_id)
            .bind(position)
            .bind(expense.date())
            .bind(expense.category().as_str())
            .bind(to_db_amount(expense.amount())?)
            .bind(expense.distance_km())
            .bind(expense.description())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_expense", e))?;
        }
        Ok(())
    }
}

fn to_db_amount(amount: Amount) -> Result<i64, StoreError> {
    i64::try_from(amount.minor())
        .map_err(|_| StoreError::unavailable(format!("amount {amount} exceeds column range")))
}

fn from_db_amount(minor: i64) -> Result<Amount, StoreError> {
    u64::try_from(minor)
        .map(Amount::from_minor)
        .map_err(|_| StoreError::unavailable(format!("negative stored amount {minor}")))
}

fn decode_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::unavailable(format!("failed to decode voucher row: {e}"))
}

/// Decode the header columns shared by `get` and `list`.
struct HeaderRow {
    id: VoucherId,
    owner_id: OwnerId,
    title: String,
    voucher_type: String,
    date_range: String,
    status: VoucherStatus,
    total_amount: Amount,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HeaderRow {
    fn from_row(row: &PgRow) -> Result<Self, StoreError> {
        let id: Uuid = row.try_get("id").map_err(decode_err)?;
        let owner_id: String = row.try_get("owner_id").map_err(decode_err)?;
        let status: String = row.try_get("status").map_err(decode_err)?;
        Ok(Self {
            id: VoucherId::from_uuid(id),
            owner_id: OwnerId::parse(owner_id).map_err(decode_err)?,
            title: row.try_get("title").map_err(decode_err)?,
            voucher_type: row.try_get("voucher_type").map_err(decode_err)?,
            date_range: row.try_get("date_range").map_err(decode_err)?,
            status: status.parse().map_err(decode_err)?,
            total_amount: from_db_amount(row.try_get("total_amount").map_err(decode_err)?)?,
            created_at: row.try_get("created_at").map_err(decode_err)?,
            updated_at: row.try_get("updated_at").map_err(decode_err)?,
        })
    }
}

fn expense_from_row(row: &PgRow) -> Result<Option<Expense>, StoreError> {
    // LEFT JOIN: a voucher without expenses yields one row with NULL columns.
    let position: Option<i32> = row.try_get("position").map_err(decode_err)?;
    if position.is_none() {
        return Ok(None);
    }
    let date: NaiveDate = row.try_get("expense_date").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let amount: i64 = row.try_get("amount").map_err(decode_err)?;
    let record = ExpenseRecord {
        date,
        category: category.parse::<ExpenseCategory>().map_err(decode_err)?,
        amount: from_db_amount(amount)?,
        distance_km: row.try_get("distance_km").map_err(decode_err)?,
        description: row.try_get("description").map_err(decode_err)?,
    };
    Expense::try_from(record).map(Some).map_err(decode_err)
}

#[async_trait]
impl VoucherStore for PostgresVoucherStore {
    #[instrument(skip(self, draft), fields(owner_id = %owner_id, voucher_id = tracing::field::Empty), err)]
    async fn create(&self, owner_id: &OwnerId, draft: VoucherDraft) -> Result<VoucherId, StoreError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO vouchers (
                owner_id,
                title,
                voucher_type,
                date_range,
                status,
                total_amount,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            "#,
        )
        .bind(owner_id.as_str())
        .bind(&draft.fields().title)
        .bind(&draft.fields().voucher_type)
        .bind(&draft.fields().date_range)
        .bind(draft.status().as_str())
        .bind(to_db_amount(draft.total_amount())?)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_voucher", e))?;

        let id: Uuid = row.try_get("id").map_err(decode_err)?;
        Self::insert_expenses(&mut tx, id, draft.expenses()).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        let voucher_id = VoucherId::from_uuid(id);
        Span::current().record("voucher_id", voucher_id.as_str());
        Ok(voucher_id)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, voucher_id = %id), err)]
    async fn get(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<Voucher, StoreError> {
        let Some(uuid) = id.to_uuid() else {
            return Err(StoreError::NotFound);
        };

        let rows = sqlx::query(
            r#"
            SELECT
                v.id,
                v.owner_id,
                v.title,
                v.voucher_type,
                v.date_range,
                v.status,
                v.total_amount,
                v.created_at,
                v.updated_at,
                e.position,
                e.expense_date,
                e.category,
                e.amount,
                e.distance_km,
                e.description
            FROM vouchers v
            LEFT JOIN voucher_expenses e ON e.voucher_id = v.id
            WHERE v.id = $1 AND v.owner_id = $2
            ORDER BY e.position ASC
            "#,
        )
        .bind(uuid)
        .bind(owner_id.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_voucher", e))?;

        let Some(first) = rows.first() else {
            return Err(StoreError::NotFound);
        };
        let header = HeaderRow::from_row(first)?;

        let mut expenses = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(expense) = expense_from_row(row)? {
                expenses.push(expense);
            }
        }

        rehydrate(VoucherRecord {
            id: header.id,
            owner_id: header.owner_id,
            title: header.title,
            voucher_type: header.voucher_type,
            date_range: header.date_range,
            status: header.status,
            total_amount: header.total_amount,
            created_at: header.created_at,
            updated_at: header.updated_at,
            expenses,
        })
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, count = tracing::field::Empty), err)]
    async fn list(
        &self,
        owner_id: &OwnerId,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<VoucherSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                v.id,
                v.owner_id,
                v.title,
                v.voucher_type,
                v.date_range,
                v.status,
                v.total_amount,
                v.created_at,
                v.updated_at,
                (SELECT COUNT(*) FROM voucher_expenses e WHERE e.voucher_id = v.id) AS expense_count
            FROM vouchers v
            WHERE v.owner_id = $1
              AND ($2::text IS NULL OR v.status = $2)
            ORDER BY v.created_at DESC, v.id DESC
            "#,
        )
        .bind(owner_id.as_str())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_vouchers", e))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let header = HeaderRow::from_row(row)?;
            let expense_count: i64 = row.try_get("expense_count").map_err(decode_err)?;
            summaries.push(VoucherSummary {
                id: header.id,
                title: header.title,
                voucher_type: header.voucher_type,
                date_range: header.date_range,
                status: header.status,
                total_amount: header.total_amount,
                expense_count: usize::try_from(expense_count).map_err(decode_err)?,
                created_at: header.created_at,
                updated_at: header.updated_at,
            });
        }

        Span::current().record("count", summaries.len());
        Ok(summaries)
    }

    #[instrument(skip(self, draft), fields(owner_id = %owner_id, voucher_id = %id), err)]
    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &VoucherId,
        draft: VoucherDraft,
    ) -> Result<(), StoreError> {
        let Some(uuid) = id.to_uuid() else {
            return Err(StoreError::NotFound);
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Row lock: a concurrent submit cannot slip in between check and write.
        let current = sqlx::query(
            "SELECT status FROM vouchers WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(uuid)
        .bind(owner_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_voucher", e))?;

        let Some(current) = current else {
            return Err(StoreError::NotFound);
        };
        let status: String = current.try_get("status").map_err(decode_err)?;
        let status: VoucherStatus = status.parse().map_err(decode_err)?;
        if !status.is_editable() {
            tracing::warn!("update rejected: voucher already submitted");
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::VoucherLocked);
        }

        sqlx::query(
            r#"
            UPDATE vouchers
            SET title = $3,
                voucher_type = $4,
                date_range = $5,
                status = $6,
                total_amount = $7,
                updated_at = $8
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(uuid)
        .bind(owner_id.as_str())
        .bind(&draft.fields().title)
        .bind(&draft.fields().voucher_type)
        .bind(&draft.fields().date_range)
        .bind(draft.status().as_str())
        .bind(to_db_amount(draft.total_amount())?)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_voucher", e))?;

        sqlx::query("DELETE FROM voucher_expenses WHERE voucher_id = $1")
            .bind(uuid)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_expenses", e))?;

        Self::insert_expenses(&mut tx, uuid, draft.expenses()).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, voucher_id = %id), err)]
    async fn delete(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<(), StoreError> {
        let Some(uuid) = id.to_uuid() else {
            return Err(StoreError::NotFound);
        };

        let result = sqlx::query("DELETE FROM vouchers WHERE id = $1 AND owner_id = $2")
            .bind(uuid)
            .bind(owner_id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_voucher", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    tracing::error!(operation, error = %err, "postgres store error");
    match err {
        sqlx::Error::Database(db_err) => StoreError::unavailable(format!(
            "database error in {operation}: {}",
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            StoreError::unavailable(format!("connection pool closed in {operation}"))
        }
        other => StoreError::unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

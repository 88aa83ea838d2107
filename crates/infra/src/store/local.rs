//! SQLite-backed local voucher store.
//!
//! Single-process persistence for the desktop/offline deployment: every
//! voucher, whatever its owner, lives as one JSON document in a single
//! key/value table. Owner isolation is enforced here by comparing the
//! document's `ownerId` with the caller, which is adequate only because one
//! identity is logged in per running instance.
//!
//! Ids are sequential (`V001`, `V002`, ...). The next number is computed inside
//! the same write transaction that inserts the row.
//!
//! The pool holds a single connection. Every read-then-write transaction runs
//! alone, so concurrent callers queue for the connection instead of failing
//! with `database is locked` when two deferred transactions both try to
//! upgrade to a write lock. Should two processes share one file anyway, the
//! primary key still rejects a duplicate id with `Unavailable`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{instrument, Span};

use voucherdesk_core::{OwnerId, VoucherId};
use voucherdesk_vouchers::{Voucher, VoucherDraft, VoucherRecord, VoucherStatus, VoucherSummary};

use super::r#trait::{rehydrate, StoreError, VoucherStore};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS vouchers (
        seq        INTEGER PRIMARY KEY,
        voucher_id TEXT NOT NULL UNIQUE,
        owner_id   TEXT NOT NULL,
        status     TEXT NOT NULL,
        created_at TEXT NOT NULL,
        data       TEXT NOT NULL
    )
"#;

#[derive(Debug, Clone)]
pub struct LocalVoucherStore {
    pool: SqlitePool,
}

impl LocalVoucherStore {
    /// Open (creating if missing) the database at `url`, e.g. `sqlite://voucherdesk.db`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_url", e))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database; one connection so every query sees the same data.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Self::with_pool(pool).await
    }

    /// Use an existing pool; it should hold at most one connection (see module docs).
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| map_sqlx_error("create_schema", e))?;
        Ok(Self { pool })
    }

    /// Fetch and decode one document by id, whoever owns it.
    async fn load<'e, E>(executor: E, id: &VoucherId) -> Result<Option<VoucherRecord>, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let row = sqlx::query("SELECT data FROM vouchers WHERE voucher_id = ?1")
            .bind(id.as_str())
            .fetch_optional(executor)
            .await
            .map_err(|e| map_sqlx_error("load", e))?;

        row.map(|row| decode_record(&row)).transpose()
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    // Fixed-width so lexical order in SQL equals chronological order.
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn encode_record(record: &VoucherRecord) -> Result<String, StoreError> {
    serde_json::to_string(record)
        .map_err(|e| StoreError::unavailable(format!("failed to encode voucher {}: {e}", record.id)))
}

fn decode_record(row: &sqlx::sqlite::SqliteRow) -> Result<VoucherRecord, StoreError> {
    let data: String = row
        .try_get("data")
        .map_err(|e| map_sqlx_error("decode_row", e))?;
    serde_json::from_str(&data)
        .map_err(|e| StoreError::unavailable(format!("corrupt voucher document: {e}")))
}

#[async_trait]
impl VoucherStore for LocalVoucherStore {
    #[instrument(skip(self, draft), fields(owner_id = %owner_id, voucher_id = tracing::field::Empty), err)]
    async fn create(&self, owner_id: &OwnerId, draft: VoucherDraft) -> Result<VoucherId, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let next: i64 = sqlx::query("SELECT COALESCE(MAX(seq), 0) + 1 AS next FROM vouchers")
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get::<i64, _>("next"))
            .map_err(|e| map_sqlx_error("next_id", e))?;
        let seq = u64::try_from(next)
            .map_err(|_| StoreError::unavailable(format!("invalid voucher sequence {next}")))?;

        let id = VoucherId::sequential(seq);
        let record = VoucherRecord::new(id.clone(), owner_id.clone(), draft, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO vouchers (seq, voucher_id, owner_id, status, created_at, data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(next)
        .bind(id.as_str())
        .bind(owner_id.as_str())
        .bind(record.status.as_str())
        .bind(timestamp(record.created_at))
        .bind(encode_record(&record)?)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_voucher", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("voucher_id", id.as_str());
        Ok(id)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, voucher_id = %id), err)]
    async fn get(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<Voucher, StoreError> {
        match Self::load(&self.pool, id).await? {
            Some(record) if &record.owner_id == owner_id => rehydrate(record),
            _ => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, count = tracing::field::Empty), err)]
    async fn list(
        &self,
        owner_id: &OwnerId,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<VoucherSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT data
            FROM vouchers
            WHERE owner_id = ?1
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .bind(owner_id.as_str())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = decode_record(row)?;
            // The indexed column and the document must agree on the owner.
            if &record.owner_id == owner_id {
                summaries.push(record.summary());
            }
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
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut record = match Self::load(&mut *tx, id).await? {
            Some(record) if &record.owner_id == owner_id => record,
            _ => return Err(StoreError::NotFound),
        };
        if !record.status.is_editable() {
            tracing::warn!("update rejected: voucher already submitted");
            return Err(StoreError::VoucherLocked);
        }

        record.replace(draft, Utc::now());

        sqlx::query("UPDATE vouchers SET status = ?1, data = ?2 WHERE voucher_id = ?3")
            .bind(record.status.as_str())
            .bind(encode_record(&record)?)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_voucher", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, voucher_id = %id), err)]
    async fn delete(&self, owner_id: &OwnerId, id: &VoucherId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM vouchers WHERE voucher_id = ?1 AND owner_id = ?2")
            .bind(id.as_str())
            .bind(owner_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_voucher", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    tracing::error!(operation, error = %err, "sqlite store error");
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::unavailable(
            format!("conflicting concurrent write in {operation}: {}", db_err.message()),
        ),
        other => StoreError::unavailable(format!("sqlite error in {operation}: {other}")),
    }
}

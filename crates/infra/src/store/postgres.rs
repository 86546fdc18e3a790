//! Postgres-backed stores.
//!
//! Every record lives in one JSONB table keyed by `(kind, id)`; `kind` names
//! the collection (`coupons`, `orders`, ...). Singletons use the id
//! `"current"` in their own kind.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use gasdesk_core::Entity;

use super::{RecordStore, SingletonStore, StoreError, StoreResult};

const SINGLETON_ID: &str = "current";

/// Create the backing table if it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            kind TEXT NOT NULL,
            id TEXT NOT NULL,
            data JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (kind, id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    Ok(())
}

pub struct PostgresRecordStore<V> {
    pool: PgPool,
    kind: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V> PostgresRecordStore<V> {
    pub fn new(pool: PgPool, kind: &'static str) -> Self {
        Self {
            pool,
            kind,
            _value: PhantomData,
        }
    }
}

#[async_trait]
impl<V> RecordStore<V> for PostgresRecordStore<V>
where
    V: Entity + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    V::Id: Send + Sync,
{
    #[instrument(skip(self), fields(kind = self.kind), err)]
    async fn get(&self, id: &V::Id) -> StoreResult<Option<V>> {
        let row = sqlx::query("SELECT data FROM records WHERE kind = $1 AND id = $2")
            .bind(self.kind)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|r| decode(&r)).transpose()
    }

    #[instrument(skip(self), fields(kind = self.kind), err)]
    async fn list(&self) -> StoreResult<Vec<V>> {
        let rows = sqlx::query("SELECT data FROM records WHERE kind = $1 ORDER BY id")
            .bind(self.kind)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(decode).collect()
    }

    #[instrument(skip(self, value), fields(kind = self.kind), err)]
    async fn upsert(&self, value: V) -> StoreResult<()> {
        let data = serde_json::to_value(&value)?;
        write_record(&self.pool, self.kind, &value.id().to_string(), data).await
    }

    #[instrument(skip(self, value, conflicts), fields(kind = self.kind), err)]
    async fn put_unique(
        &self,
        value: V,
        conflicts: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
    ) -> StoreResult<()> {
        let id = value.id().to_string();
        let data = serde_json::to_value(&value)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Serializes concurrent unique writers of the same kind until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(self.kind)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("advisory_lock", e))?;

        let rows = sqlx::query("SELECT id, data FROM records WHERE kind = $1 AND id <> $2")
            .bind(self.kind)
            .bind(&id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("scan", e))?;

        for row in &rows {
            let existing: V = decode(row)?;
            if conflicts(&existing) {
                rollback(tx).await?;
                return Err(StoreError::Conflict);
            }
        }

        write_record(&mut *tx, self.kind, &id, data).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(kind = self.kind), err)]
    async fn remove(&self, id: &V::Id) -> StoreResult<Option<V>> {
        let row = sqlx::query("DELETE FROM records WHERE kind = $1 AND id = $2 RETURNING data")
            .bind(self.kind)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove", e))?;

        row.map(|r| decode(&r)).transpose()
    }
}

pub struct PostgresSingletonStore<V> {
    pool: PgPool,
    kind: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V> PostgresSingletonStore<V> {
    pub fn new(pool: PgPool, kind: &'static str) -> Self {
        Self {
            pool,
            kind,
            _value: PhantomData,
        }
    }
}

#[async_trait]
impl<V> SingletonStore<V> for PostgresSingletonStore<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self) -> StoreResult<Option<V>> {
        let row = sqlx::query("SELECT data FROM records WHERE kind = $1 AND id = $2")
            .bind(self.kind)
            .bind(SINGLETON_ID)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_singleton", e))?;

        row.map(|r| decode(&r)).transpose()
    }

    async fn set(&self, value: V) -> StoreResult<()> {
        let data = serde_json::to_value(&value)?;
        write_record(&self.pool, self.kind, SINGLETON_ID, data).await
    }

    async fn clear(&self) -> StoreResult<Option<V>> {
        let row = sqlx::query("DELETE FROM records WHERE kind = $1 AND id = $2 RETURNING data")
            .bind(self.kind)
            .bind(SINGLETON_ID)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_singleton", e))?;

        row.map(|r| decode(&r)).transpose()
    }
}

async fn write_record<'e, E>(executor: E, kind: &str, id: &str, data: JsonValue) -> StoreResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO records (kind, id, data)
        VALUES ($1, $2, $3)
        ON CONFLICT (kind, id)
        DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
        "#,
    )
    .bind(kind.to_string())
    .bind(id.to_string())
    .bind(data)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("write_record", e))?;
    Ok(())
}

async fn rollback(tx: Transaction<'_, Postgres>) -> StoreResult<()> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))
}

fn decode<V: DeserializeOwned>(row: &sqlx::postgres::PgRow) -> StoreResult<V> {
    let data: JsonValue = row
        .try_get("data")
        .map_err(|e| map_sqlx_error("decode_row", e))?;
    Ok(serde_json::from_value(data)?)
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    StoreError::Database {
        operation,
        message: err.to_string(),
    }
}

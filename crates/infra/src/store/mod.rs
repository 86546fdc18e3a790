//! Record storage abstractions.
//!
//! Two shapes cover every resource the API manages:
//!
//! - [`RecordStore`]: a keyed collection of entities (coupons, orders, ...).
//! - [`SingletonStore`]: at most one value (tax config, platform charge).
//!
//! Both are async so the Postgres implementation can sit behind the same
//! trait object as the in-memory one.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use gasdesk_core::Entity;

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::{InMemoryRecordStore, InMemorySingletonStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// `put_unique` found another record matching the conflict predicate.
    #[error("record conflicts with an existing record")]
    Conflict,

    #[error("store lock poisoned")]
    Poisoned,

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },
}

/// Keyed entity collection.
#[async_trait]
pub trait RecordStore<V>: Send + Sync
where
    V: Entity + Clone + Send + Sync + 'static,
    V::Id: Send + Sync,
{
    async fn get(&self, id: &V::Id) -> StoreResult<Option<V>>;

    /// All records, ordered by id.
    async fn list(&self) -> StoreResult<Vec<V>>;

    /// Insert or replace (last write wins).
    async fn upsert(&self, value: V) -> StoreResult<()>;

    /// Insert or replace, unless a record with a *different* id matches
    /// `conflicts`. The scan and the write are atomic.
    async fn put_unique(
        &self,
        value: V,
        conflicts: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
    ) -> StoreResult<()>;

    /// Remove and return the record, if it existed.
    async fn remove(&self, id: &V::Id) -> StoreResult<Option<V>>;
}

#[async_trait]
impl<V, S> RecordStore<V> for Arc<S>
where
    V: Entity + Clone + Send + Sync + 'static,
    V::Id: Send + Sync,
    S: RecordStore<V> + ?Sized,
{
    async fn get(&self, id: &V::Id) -> StoreResult<Option<V>> {
        (**self).get(id).await
    }

    async fn list(&self) -> StoreResult<Vec<V>> {
        (**self).list().await
    }

    async fn upsert(&self, value: V) -> StoreResult<()> {
        (**self).upsert(value).await
    }

    async fn put_unique(
        &self,
        value: V,
        conflicts: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
    ) -> StoreResult<()> {
        (**self).put_unique(value, conflicts).await
    }

    async fn remove(&self, id: &V::Id) -> StoreResult<Option<V>> {
        (**self).remove(id).await
    }
}

/// Zero-or-one value.
#[async_trait]
pub trait SingletonStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self) -> StoreResult<Option<V>>;

    async fn set(&self, value: V) -> StoreResult<()>;

    /// Clear and return the previous value.
    async fn clear(&self) -> StoreResult<Option<V>>;
}

#[async_trait]
impl<V, S> SingletonStore<V> for Arc<S>
where
    V: Clone + Send + Sync + 'static,
    S: SingletonStore<V> + ?Sized,
{
    async fn get(&self) -> StoreResult<Option<V>> {
        (**self).get().await
    }

    async fn set(&self, value: V) -> StoreResult<()> {
        (**self).set(value).await
    }

    async fn clear(&self) -> StoreResult<Option<V>> {
        (**self).clear().await
    }
}

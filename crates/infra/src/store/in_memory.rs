use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use gasdesk_core::Entity;

use super::{RecordStore, SingletonStore, StoreError, StoreResult};

/// In-memory record store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRecordStore<V: Entity> {
    inner: RwLock<BTreeMap<V::Id, V>>,
}

impl<V: Entity> InMemoryRecordStore<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<V: Entity> Default for InMemoryRecordStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> RecordStore<V> for InMemoryRecordStore<V>
where
    V: Entity + Clone + Send + Sync + 'static,
    V::Id: Send + Sync,
{
    async fn get(&self, id: &V::Id) -> StoreResult<Option<V>> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<V>> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }

    async fn upsert(&self, value: V) -> StoreResult<()> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(value.id().clone(), value);
        Ok(())
    }

    async fn put_unique(
        &self,
        value: V,
        conflicts: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
    ) -> StoreResult<()> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let clash = map
            .iter()
            .any(|(id, existing)| id != value.id() && conflicts(existing));
        if clash {
            return Err(StoreError::Conflict);
        }
        map.insert(value.id().clone(), value);
        Ok(())
    }

    async fn remove(&self, id: &V::Id) -> StoreResult<Option<V>> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(id))
    }
}

/// In-memory singleton slot.
#[derive(Debug)]
pub struct InMemorySingletonStore<V> {
    inner: RwLock<Option<V>>,
}

impl<V> InMemorySingletonStore<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }
}

impl<V> Default for InMemorySingletonStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> SingletonStore<V> for InMemorySingletonStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self) -> StoreResult<Option<V>> {
        let slot = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(slot.clone())
    }

    async fn set(&self, value: V) -> StoreResult<()> {
        let mut slot = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        *slot = Some(value);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<Option<V>> {
        let mut slot = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(slot.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        id: String,
        label: String,
    }

    impl Entity for Tag {
        type Id = String;

        fn id(&self) -> &Self::Id {
            &self.id
        }
    }

    fn tag(id: &str, label: &str) -> Tag {
        Tag {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    fn same_label(label: &'static str) -> impl Fn(&Tag) -> bool + Send + Sync {
        move |t: &Tag| t.label.eq_ignore_ascii_case(label)
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let store = InMemoryRecordStore::new();
        store.upsert(tag("1", "a")).await.unwrap();
        store.upsert(tag("1", "b")).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec![tag("1", "b")]);
    }

    #[tokio::test]
    async fn put_unique_rejects_clash_with_other_ids() {
        let store = InMemoryRecordStore::new();
        store.put_unique(tag("1", "gold"), &same_label("gold")).await.unwrap();

        let err = store.put_unique(tag("2", "GOLD"), &same_label("GOLD")).await;
        assert!(matches!(err, Err(StoreError::Conflict)));
        assert_eq!(store.list().await.unwrap().len(), 1);

        // Rewriting the same record is not a clash with itself.
        store.put_unique(tag("1", "gold"), &same_label("gold")).await.unwrap();
    }

    #[tokio::test]
    async fn remove_reports_missing() {
        let store: InMemoryRecordStore<Tag> = InMemoryRecordStore::new();
        assert_eq!(store.remove(&"nope".to_string()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn singleton_set_and_clear() {
        let slot = InMemorySingletonStore::new();
        assert_eq!(slot.get().await.unwrap(), None::<u32>);
        slot.set(5).await.unwrap();
        assert_eq!(slot.clear().await.unwrap(), Some(5));
        assert_eq!(slot.clear().await.unwrap(), None);
    }
}

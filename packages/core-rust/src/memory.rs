//! In-memory [`Storage`] implementation backed by [`DashMap`].
//!
//! Provides concurrent read/write access without external locking and
//! emits change notifications for every committed mutation. Suitable as the
//! fast top layer of a composite and as a fixture in tests.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{StorageError, StorageResult};
use crate::event::{EventKind, Listener, ListenerRegistry, SubscriptionId};
use crate::key::{Entity, KeyField, StorageKey};
use crate::storage::Storage;

/// In-memory storage keyed by the entity's key field.
///
/// Shard guards are always released before listeners run, so a listener
/// may read from or write back into the same storage.
pub struct MemoryStorage<T, K> {
    key_field: KeyField<T, K>,
    entries: DashMap<K, T>,
    listeners: ListenerRegistry<T>,
}

impl<T: Entity, K: StorageKey> MemoryStorage<T, K> {
    /// Creates an empty storage addressing entries by `key_field`.
    #[must_use]
    pub fn new(key_field: KeyField<T, K>) -> Self {
        Self {
            key_field,
            entries: DashMap::new(),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the storage holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl<T: Entity, K: StorageKey> Storage<T, K> for MemoryStorage<T, K> {
    fn key_field(&self) -> &KeyField<T, K> {
        &self.key_field
    }

    async fn exists(&self, key: &K) -> StorageResult<bool> {
        Ok(self.entries.contains_key(key))
    }

    async fn create(&self, entry: T) -> StorageResult<()> {
        let key = self.key_field.key_of(&entry);
        match self.entries.entry(key) {
            Entry::Occupied(occupied) => {
                return Err(StorageError::duplicate_key("create", occupied.key()));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry.clone());
            }
        }
        self.listeners.emit(EventKind::Create, &entry).await;
        Ok(())
    }

    async fn get(&self, key: &K) -> StorageResult<Option<T>> {
        Ok(self.entries.get(key).map(|r| r.value().clone()))
    }

    async fn get_all(&self) -> StorageResult<Vec<T>> {
        Ok(self.entries.iter().map(|r| r.value().clone()).collect())
    }

    async fn get_keys(&self) -> StorageResult<Vec<K>> {
        Ok(self.entries.iter().map(|r| r.key().clone()).collect())
    }

    async fn update(&self, entry: T) -> StorageResult<()> {
        let key = self.key_field.key_of(&entry);
        match self.entries.get_mut(&key) {
            Some(mut slot) => *slot = entry.clone(),
            None => return Err(StorageError::key_not_found("update", &key)),
        }
        self.listeners.emit(EventKind::Update, &entry).await;
        Ok(())
    }

    async fn delete(&self, key: &K) -> StorageResult<()> {
        let Some((_, removed)) = self.entries.remove(key) else {
            return Err(StorageError::key_not_found("delete", key));
        };
        self.listeners.emit(EventKind::Delete, &removed).await;
        Ok(())
    }

    fn on(&self, kind: EventKind, listener: Listener<T>) -> SubscriptionId {
        self.listeners.subscribe(kind, listener)
    }

    fn off(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

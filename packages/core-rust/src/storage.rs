//! Storage capability trait.
//!
//! [`Storage`] is the contract every backend implements and every composite
//! re-exposes. It is object-safe and used as `Arc<dyn Storage<T, K>>`.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::error::StorageResult;
use crate::event::{EventKind, Listener, SubscriptionId};
use crate::key::{Entity, KeyField, StorageKey};

/// Lazy, finite sequence of entries returned by [`Storage::stream_all`].
pub type EntryStream<'a, T> = BoxStream<'a, StorageResult<T>>;

/// CRUD capability over a keyed collection of entities.
///
/// Leaf semantics:
/// - `create` fails with `DuplicateKey` if the key is present.
/// - `update` and `delete` fail with `KeyNotFound` if the key is absent.
/// - Reads never fail on a miss. They return `None` or omit the entry.
#[async_trait]
pub trait Storage<T: Entity, K: StorageKey>: Send + Sync {
    /// Descriptor of the key attribute shared by all entries.
    fn key_field(&self) -> &KeyField<T, K>;

    /// Whether an entry with `key` is present.
    async fn exists(&self, key: &K) -> StorageResult<bool>;

    /// Inserts a new entry.
    async fn create(&self, entry: T) -> StorageResult<()>;

    /// Point read. Returns `None` on a miss.
    async fn get(&self, key: &K) -> StorageResult<Option<T>>;

    /// Reads every key in `keys`, silently dropping misses.
    async fn get_many(&self, keys: &[K]) -> StorageResult<Vec<T>> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.get(key).await? {
                found.push(entry);
            }
        }
        Ok(found)
    }

    /// Reads every entry.
    async fn get_all(&self) -> StorageResult<Vec<T>>;

    /// Lists every key.
    async fn get_keys(&self) -> StorageResult<Vec<K>>;

    /// Streams every entry.
    ///
    /// Defaults to [`snapshot_stream`]. Nothing is read until the stream is
    /// first polled; the key set is captured then, not when `stream_all` is
    /// called, so entries created in between are included.
    fn stream_all(&self) -> EntryStream<'_, T> {
        snapshot_stream(self)
    }

    /// Replaces an existing entry.
    async fn update(&self, entry: T) -> StorageResult<()>;

    /// Removes the entry with `key`.
    async fn delete(&self, key: &K) -> StorageResult<()>;

    /// Subscribes `listener` to mutations of `kind`.
    fn on(&self, kind: EventKind, listener: Listener<T>) -> SubscriptionId;

    /// Cancels a subscription made with [`on`](Storage::on).
    fn off(&self, id: SubscriptionId) -> bool;
}

enum Cursor<K> {
    Snapshot,
    Keys(std::vec::IntoIter<K>),
    Done,
}

/// Streams `storage` by snapshotting its key set, then point-reading each key.
///
/// The key set is fixed when the stream is first polled. Values reflect the
/// storage state at the time each key is visited, and keys deleted in the
/// meantime are skipped. Nothing is held open between items, so the stream
/// may be dropped at any point.
pub fn snapshot_stream<'a, T, K, S>(storage: &'a S) -> EntryStream<'a, T>
where
    T: Entity,
    K: StorageKey,
    S: Storage<T, K> + ?Sized,
{
    stream::unfold(Cursor::Snapshot, move |mut cursor| async move {
        loop {
            match cursor {
                Cursor::Snapshot => match storage.get_keys().await {
                    Ok(keys) => cursor = Cursor::Keys(keys.into_iter()),
                    Err(err) => return Some((Err(err), Cursor::Done)),
                },
                Cursor::Keys(mut keys) => {
                    let key = keys.next()?;
                    match storage.get(&key).await {
                        Ok(Some(entry)) => return Some((Ok(entry), Cursor::Keys(keys))),
                        Ok(None) => cursor = Cursor::Keys(keys),
                        Err(err) => return Some((Err(err), Cursor::Keys(keys))),
                    }
                }
                Cursor::Done => return None,
            }
        }
    })
    .boxed()
}

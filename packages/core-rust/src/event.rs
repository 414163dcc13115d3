//! Change notifications emitted by storages.
//!
//! Every storage keeps a [`ListenerRegistry`] and notifies it after a
//! create, update, or delete commits. Subscribers get back a
//! [`SubscriptionId`] and cancel with it explicitly; there are no
//! unsubscribe closures.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Kind of mutation a listener is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A new entry was inserted.
    Create,
    /// An existing entry was replaced.
    Update,
    /// An entry was removed. The listener receives the removed entry.
    Delete,
}

/// Handle identifying one subscription on one storage.
///
/// IDs start at 1 and increase monotonically per registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Asynchronous callback invoked with the affected entry.
pub type Listener<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into a [`Listener`].
pub fn listener<T, F, Fut>(f: F) -> Listener<T>
where
    T: 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |entry: T| -> BoxFuture<'static, ()> { Box::pin(f(entry)) })
}

/// Ordered set of listeners keyed by subscription id.
///
/// Emission visits matching listeners in subscription order and awaits each
/// one in turn. The internal lock is released before any listener runs, so
/// listeners may subscribe, unsubscribe, or write back into storages freely.
pub struct ListenerRegistry<T> {
    listeners: Mutex<BTreeMap<SubscriptionId, (EventKind, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + 'static> ListenerRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `listener` for events of `kind`.
    pub fn subscribe(&self, kind: EventKind, listener: Listener<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(id, (kind, listener));
        id
    }

    /// Cancels a subscription. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.lock().remove(&id).is_some()
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether there are no active subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Notifies every listener subscribed to `kind`.
    pub async fn emit(&self, kind: EventKind, entry: &T) {
        let targets: Vec<Listener<T>> = {
            let listeners = self.listeners.lock();
            listeners
                .values()
                .filter(|(k, _)| *k == kind)
                .map(|(_, l)| Arc::clone(l))
                .collect()
        };
        if targets.is_empty() {
            return;
        }

        tracing::trace!(event = ?kind, listeners = targets.len(), "emitting storage event");
        for target in targets {
            target(entry.clone()).await;
        }
    }
}

impl<T: Clone + Send + 'static> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

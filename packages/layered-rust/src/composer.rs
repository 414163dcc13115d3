//! Cache-aside composition of several storages into one.
//!
//! [`LayeredStorage`] wraps an ordered list of layers, top (fast) first, and
//! presents them as a single [`Storage`]:
//!
//! - **Reads** fall through from the top; a hit on a lower layer is copied
//!   into every layer above it ("bubble-up").
//! - **Writes** fan out to every layer concurrently.
//! - **Full reads** merge all layers with top-layer values winning, then
//!   backfill layers that lacked a key.
//! - **Events** from each layer are replayed on the layer above it (see
//!   `propagation`).
//!
//! Multi-layer writes are best-effort: there is no rollback if a layer
//! fails half way through a fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use strata_core::{
    Entity, EventKind, KeyField, Listener, Storage, StorageError, StorageKey, StorageResult,
    StorageResultExt, SubscriptionId,
};

use crate::config::LayeredConfig;
use crate::error::ConfigError;
use crate::propagation::{self, Wire};

/// One participant of a composite, shared with whoever else owns it.
pub type Layer<T, K> = Arc<dyn Storage<T, K>>;

/// Storage composed of ordered layers with cache-aside semantics.
///
/// Holds no data of its own. Layers are fixed at construction; dropping the
/// composite cancels the event subscriptions it placed on them.
pub struct LayeredStorage<T: Entity, K: StorageKey> {
    layers: Vec<Layer<T, K>>,
    key_field: KeyField<T, K>,
    config: LayeredConfig,
    wires: Vec<Wire>,
}

impl<T: Entity, K: StorageKey> LayeredStorage<T, K> {
    /// Composes `layers` with the default [`LayeredConfig`].
    ///
    /// # Errors
    ///
    /// See [`with_config`](Self::with_config).
    pub fn new(layers: Vec<Layer<T, K>>) -> Result<Self, ConfigError> {
        Self::with_config(layers, LayeredConfig::default())
    }

    /// Composes `layers`, ordered top to bottom.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoLayers`] for an empty list and
    /// [`ConfigError::KeyFieldMismatch`] if any layer's key field differs
    /// from the top layer's. No layer is touched in either case.
    pub fn with_config(
        layers: Vec<Layer<T, K>>,
        config: LayeredConfig,
    ) -> Result<Self, ConfigError> {
        let Some(top) = layers.first() else {
            return Err(ConfigError::NoLayers);
        };
        let key_field = top.key_field().clone();

        for (index, layer) in layers.iter().enumerate().skip(1) {
            if *layer.key_field() != key_field {
                return Err(ConfigError::KeyFieldMismatch {
                    layer: index,
                    expected: key_field.name().to_string(),
                    found: layer.key_field().name().to_string(),
                });
            }
        }

        let wires = if config.propagate_events {
            propagation::wire(&layers, &config.name)
        } else {
            Vec::new()
        };

        Ok(Self {
            layers,
            key_field,
            config,
            wires,
        })
    }

    /// The layers, top first.
    #[must_use]
    pub fn layers(&self) -> &[Layer<T, K>] {
        &self.layers
    }

    /// Number of layers. Always at least one.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Configuration this composite was built with.
    #[must_use]
    pub fn config(&self) -> &LayeredConfig {
        &self.config
    }

    fn top(&self) -> &Layer<T, K> {
        &self.layers[0]
    }

    /// Reads `key` from each layer concurrently.
    async fn presence(&self, key: &K) -> StorageResult<Vec<bool>> {
        try_join_all(self.layers.iter().map(|layer| layer.exists(key))).await
    }

    /// Creates `entry` in each of `targets`, ignoring duplicates.
    async fn bubble_up(&self, targets: &[&Layer<T, K>], entry: &T) -> StorageResult<()> {
        tracing::debug!(
            storage = %self.config.name,
            key = %self.key_field.key_of(entry),
            layers = targets.len(),
            "bubbling entry up"
        );
        try_join_all(
            targets
                .iter()
                .map(|layer| async move { layer.create(entry.clone()).await.ignore_duplicate_key() }),
        )
        .await?;
        Ok(())
    }
}

impl<T: Entity, K: StorageKey> Drop for LayeredStorage<T, K> {
    fn drop(&mut self) {
        propagation::unwire(&self.layers, &self.wires);
    }
}

/// `stream_all` keeps the trait default: it snapshots the merged key set,
/// then point-reads each key through [`get`](Storage::get), so every visited
/// key may bubble up.
#[async_trait]
impl<T: Entity, K: StorageKey> Storage<T, K> for LayeredStorage<T, K> {
    fn key_field(&self) -> &KeyField<T, K> {
        &self.key_field
    }

    async fn exists(&self, key: &K) -> StorageResult<bool> {
        for layer in &self.layers {
            if layer.exists(key).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn create(&self, entry: T) -> StorageResult<()> {
        let key = self.key_field.key_of(&entry);
        if self.exists(&key).await? {
            return Err(StorageError::duplicate_key("create", &key));
        }

        // A racing writer or a replayed event may get there first.
        try_join_all(self.layers.iter().map(|layer| {
            let entry = entry.clone();
            async move { layer.create(entry).await.ignore_duplicate_key() }
        }))
        .await?;
        Ok(())
    }

    async fn get(&self, key: &K) -> StorageResult<Option<T>> {
        let mut skipped = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            if let Some(entry) = layer.get(key).await? {
                if self.config.bubble_up_reads && !skipped.is_empty() {
                    self.bubble_up(&skipped, &entry).await?;
                }
                return Ok(Some(entry));
            }
            skipped.push(layer);
        }

        Ok(None)
    }

    async fn get_many(&self, keys: &[K]) -> StorageResult<Vec<T>> {
        let found = try_join_all(keys.iter().map(|key| self.get(key))).await?;
        Ok(found.into_iter().flatten().collect())
    }

    async fn get_all(&self) -> StorageResult<Vec<T>> {
        let per_layer = try_join_all(self.layers.iter().map(|layer| layer.get_all())).await?;

        // Bottom first, so values from higher layers overwrite lower ones.
        let mut slots: HashMap<K, usize> = HashMap::new();
        let mut merged: Vec<T> = Vec::new();
        for entries in per_layer.iter().rev() {
            for entry in entries {
                let key = self.key_field.key_of(entry);
                match slots.get(&key) {
                    Some(&slot) => merged[slot] = entry.clone(),
                    None => {
                        slots.insert(key, merged.len());
                        merged.push(entry.clone());
                    }
                }
            }
        }

        if self.config.bubble_up_reads {
            // Only absent keys are backfilled; stale lower values stay as they are.
            let mut backfill = Vec::new();
            for (layer, entries) in self.layers.iter().zip(&per_layer) {
                let held: HashSet<K> = entries.iter().map(|e| self.key_field.key_of(e)).collect();
                for entry in &merged {
                    if !held.contains(&self.key_field.key_of(entry)) {
                        backfill.push((layer, entry));
                    }
                }
            }

            if !backfill.is_empty() {
                tracing::debug!(
                    storage = %self.config.name,
                    entries = backfill.len(),
                    "backfilling layers after full read"
                );
                try_join_all(backfill.into_iter().map(|(layer, entry)| async move {
                    layer.create(entry.clone()).await.ignore_duplicate_key()
                }))
                .await?;
            }
        }

        Ok(merged)
    }

    async fn get_keys(&self) -> StorageResult<Vec<K>> {
        let per_layer = try_join_all(self.layers.iter().map(|layer| layer.get_keys())).await?;

        let mut seen = HashSet::new();
        Ok(per_layer
            .into_iter()
            .flatten()
            .filter(|key| seen.insert(key.clone()))
            .collect())
    }

    async fn update(&self, entry: T) -> StorageResult<()> {
        let key = self.key_field.key_of(&entry);
        let presence = self.presence(&key).await?;
        if !presence.contains(&true) {
            return Err(StorageError::key_not_found("update", &key));
        }

        try_join_all(self.layers.iter().zip(presence).map(|(layer, present)| {
            let entry = entry.clone();
            async move {
                if present {
                    match layer.update(entry.clone()).await {
                        Err(err) if err.is_key_not_found() => layer.create(entry).await,
                        other => other,
                    }
                } else {
                    match layer.create(entry.clone()).await {
                        Err(err) if err.is_duplicate_key() => layer.update(entry).await,
                        other => other,
                    }
                }
            }
        }))
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &K) -> StorageResult<()> {
        let presence = self.presence(key).await?;
        if !presence.contains(&true) {
            return Err(StorageError::key_not_found("delete", key));
        }

        try_join_all(
            self.layers
                .iter()
                .zip(presence)
                .filter(|(_, present)| *present)
                .map(|(layer, _)| async move { layer.delete(key).await.ignore_key_not_found() }),
        )
        .await?;
        Ok(())
    }

    /// Subscribes on the top layer, which also receives changes replayed up
    /// from lower layers. A composite `update` of a key held by several
    /// layers therefore notifies once per holding layer: the direct write on
    /// the top layer, then each replay arriving from below.
    fn on(&self, kind: EventKind, listener: Listener<T>) -> SubscriptionId {
        self.top().on(kind, listener)
    }

    fn off(&self, id: SubscriptionId) -> bool {
        self.top().off(id)
    }
}

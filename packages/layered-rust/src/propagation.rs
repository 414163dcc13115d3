//! Bottom-to-top replay of layer change events.
//!
//! For every adjacent pair `(upper, lower)`, the composite subscribes to the
//! lower layer's create, update, and delete events and repeats the mutation
//! on the upper layer. Changes made directly on a lower backend therefore
//! climb through every intermediate layer to the top.

use std::sync::Arc;

use strata_core::{
    listener, Entity, EventKind, Listener, StorageKey, StorageResultExt, SubscriptionId,
};

use crate::composer::Layer;

/// Subscription registered on one layer by the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Wire {
    /// Index of the layer that holds the subscription.
    pub layer: usize,
    pub id: SubscriptionId,
}

/// Subscribes every layer below the top to replay its events on the layer
/// directly above it.
pub(crate) fn wire<T: Entity, K: StorageKey>(layers: &[Layer<T, K>], name: &str) -> Vec<Wire> {
    let name: Arc<str> = Arc::from(name);
    let mut wires = Vec::with_capacity(layers.len().saturating_sub(1) * 3);

    for (upper_index, pair) in layers.windows(2).enumerate() {
        let upper = &pair[0];
        let lower = &pair[1];
        let lower_index = upper_index + 1;

        for kind in [EventKind::Create, EventKind::Update, EventKind::Delete] {
            let replayer = replay(kind, Arc::clone(upper), Arc::clone(&name), lower_index);
            wires.push(Wire {
                layer: lower_index,
                id: lower.on(kind, replayer),
            });
        }
    }

    wires
}

/// Cancels subscriptions made by [`wire`].
pub(crate) fn unwire<T: Entity, K: StorageKey>(layers: &[Layer<T, K>], wires: &[Wire]) {
    for wire in wires {
        if let Some(layer) = layers.get(wire.layer) {
            layer.off(wire.id);
        }
    }
}

fn replay<T: Entity, K: StorageKey>(
    kind: EventKind,
    upper: Layer<T, K>,
    name: Arc<str>,
    source: usize,
) -> Listener<T> {
    listener(move |entry: T| {
        let upper = Arc::clone(&upper);
        let name = Arc::clone(&name);
        async move {
            let key = upper.key_field().key_of(&entry);
            let outcome = match kind {
                EventKind::Create => upper.create(entry).await.ignore_duplicate_key(),
                EventKind::Update => match upper.update(entry.clone()).await {
                    Ok(()) => Ok(()),
                    // Not on the upper layer yet: populate it instead.
                    Err(_) => upper.create(entry).await.ignore_duplicate_key(),
                },
                EventKind::Delete => upper.delete(&key).await.ignore_key_not_found(),
            };

            match outcome {
                Ok(()) => tracing::debug!(
                    storage = %name,
                    key = %key,
                    source_layer = source,
                    event = ?kind,
                    "replayed layer event upward"
                ),
                Err(err) => tracing::warn!(
                    storage = %name,
                    key = %key,
                    source_layer = source,
                    event = ?kind,
                    error = %err,
                    "failed to replay layer event upward"
                ),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use strata_core::{KeyField, MemoryStorage, Storage};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Doc {
        id: u32,
        body: String,
    }

    fn doc_id(doc: &Doc) -> u32 {
        doc.id
    }

    fn doc(id: u32, body: &str) -> Doc {
        Doc {
            id,
            body: body.to_string(),
        }
    }

    fn memory() -> Arc<MemoryStorage<Doc, u32>> {
        Arc::new(MemoryStorage::new(KeyField::new("id", doc_id)))
    }

    fn layers_of(stores: &[Arc<MemoryStorage<Doc, u32>>]) -> Vec<Layer<Doc, u32>> {
        stores
            .iter()
            .map(|s| Arc::clone(s) as Layer<Doc, u32>)
            .collect()
    }

    #[test]
    fn wires_three_events_per_adjacent_pair() {
        let stores = [memory(), memory(), memory()];
        let layers = layers_of(&stores);

        let wires = wire(&layers, "test");
        assert_eq!(wires.len(), 6);
        assert!(wires.iter().all(|w| w.layer == 1 || w.layer == 2));

        unwire(&layers, &wires);
        for wire in &wires {
            assert!(!layers[wire.layer].off(wire.id), "already cancelled");
        }
    }

    #[test]
    fn single_layer_needs_no_wires() {
        let layers = layers_of(&[memory()]);
        assert!(wire(&layers, "test").is_empty());
    }

    #[tokio::test]
    async fn lower_create_climbs_to_top() {
        let stores = [memory(), memory(), memory()];
        let layers = layers_of(&stores);
        let _wires = wire(&layers, "test");

        stores[2].create(doc(1, "disk")).await.unwrap();

        assert_eq!(stores[1].get(&1).await.unwrap(), Some(doc(1, "disk")));
        assert_eq!(stores[0].get(&1).await.unwrap(), Some(doc(1, "disk")));
    }

    #[tokio::test]
    async fn lower_update_falls_back_to_create_on_upper() {
        let stores = [memory(), memory()];
        stores[1].create(doc(1, "old")).await.unwrap();
        let layers = layers_of(&stores);
        let _wires = wire(&layers, "test");

        stores[1].update(doc(1, "new")).await.unwrap();
        assert_eq!(stores[0].get(&1).await.unwrap(), Some(doc(1, "new")));

        stores[1].update(doc(1, "newer")).await.unwrap();
        assert_eq!(stores[0].get(&1).await.unwrap(), Some(doc(1, "newer")));
    }

    #[tokio::test]
    async fn lower_delete_removes_from_upper_and_tolerates_absence() {
        let stores = [memory(), memory()];
        let layers = layers_of(&stores);
        let _wires = wire(&layers, "test");

        stores[1].create(doc(1, "x")).await.unwrap();
        stores[1].delete(&1).await.unwrap();
        assert!(!stores[0].exists(&1).await.unwrap());

        // Upper already lost key 3; the replayed delete is a quiet no-op.
        stores[0].create(doc(2, "top-only")).await.unwrap();
        stores[1].create(doc(3, "y")).await.unwrap();
        stores[0].delete(&3).await.unwrap();
        stores[1].delete(&3).await.unwrap();
        assert!(!stores[1].exists(&3).await.unwrap());
        assert!(stores[0].exists(&2).await.unwrap());
    }

    #[tokio::test]
    async fn upper_changes_do_not_flow_down() {
        let stores = [memory(), memory()];
        let layers = layers_of(&stores);
        let _wires = wire(&layers, "test");

        stores[0].create(doc(1, "top")).await.unwrap();
        assert!(!stores[1].exists(&1).await.unwrap());
    }

    #[tokio::test]
    async fn unwired_layers_stop_replaying() {
        let stores = [memory(), memory()];
        let layers = layers_of(&stores);
        let wires = wire(&layers, "test");
        unwire(&layers, &wires);

        stores[1].create(doc(1, "x")).await.unwrap();
        assert!(!stores[0].exists(&1).await.unwrap());
    }
}

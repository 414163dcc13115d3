//! Entity and key abstractions.
//!
//! Storages never inspect entity fields beyond the key. The key is pulled
//! out through a [`KeyField`] descriptor, which also names the field so that
//! composites can check that their layers agree on it.

use std::borrow::Cow;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// A record that can be held by a [`Storage`](crate::Storage).
pub trait Entity: Clone + Send + Sync + 'static {}

impl<T> Entity for T where T: Clone + Send + Sync + 'static {}

/// A key addressing one entity within a storage namespace.
///
/// `Display` is required so errors can name the offending key.
pub trait StorageKey: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {}

impl<K> StorageKey for K where K: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// Names the key attribute of `T` and knows how to read it.
///
/// Equality compares names only: two storages with the same key field name
/// address entities the same way.
pub struct KeyField<T, K> {
    name: Cow<'static, str>,
    extract: fn(&T) -> K,
}

impl<T, K> KeyField<T, K> {
    /// Creates a descriptor for the field called `name`.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, extract: fn(&T) -> K) -> Self {
        Self {
            name: name.into(),
            extract,
        }
    }

    /// Name of the key attribute.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the key of `entry`.
    pub fn key_of(&self, entry: &T) -> K {
        (self.extract)(entry)
    }
}

impl<T, K> Clone for KeyField<T, K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            extract: self.extract,
        }
    }
}

impl<T, K> PartialEq for KeyField<T, K> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T, K> Eq for KeyField<T, K> {}

impl<T, K> Debug for KeyField<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyField").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Item {
        id: u32,
        sku: String,
    }

    fn item_id(item: &Item) -> u32 {
        item.id
    }

    fn item_id_alt(item: &Item) -> u32 {
        item.id + 1
    }

    fn item_sku(item: &Item) -> String {
        item.sku.clone()
    }

    #[test]
    fn key_of_reads_field() {
        let item = Item {
            id: 7,
            sku: "A-7".to_string(),
        };
        assert_eq!(KeyField::new("id", item_id).key_of(&item), 7);
        assert_eq!(KeyField::new("sku", item_sku).key_of(&item), "A-7");
    }

    #[test]
    fn equality_is_by_name() {
        let a = KeyField::new("id", item_id);
        let b = KeyField::new(String::from("id"), item_id_alt);
        let c = KeyField::new("uid", item_id);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clone_keeps_name_and_extractor() {
        let field = KeyField::new("id", item_id);
        let cloned = field.clone();
        assert_eq!(cloned.name(), "id");
        let item = Item {
            id: 3,
            sku: String::new(),
        };
        assert_eq!(cloned.key_of(&item), 3);
        assert_eq!(format!("{field:?}"), "KeyField { name: \"id\" }");
    }
}

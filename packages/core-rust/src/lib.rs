//! Strata Core — storage capability trait, key fields, change events, and an
//! in-memory backend.

pub mod error;
pub mod event;
pub mod key;
pub mod memory;
pub mod storage;

pub use error::{StorageError, StorageResult, StorageResultExt};
pub use event::{listener, EventKind, Listener, ListenerRegistry, SubscriptionId};
pub use key::{Entity, KeyField, StorageKey};
pub use memory::MemoryStorage;
pub use storage::{snapshot_stream, EntryStream, Storage};

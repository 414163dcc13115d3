//! Error taxonomy shared by every storage backend and composite.
//!
//! [`StorageError`] separates the two data-state conflicts a caller can
//! react to (duplicate key, missing key) from opaque backend failures,
//! which pass through unmodified as [`anyhow::Error`].

use std::fmt::Display;

/// Errors returned by [`Storage`](crate::Storage) operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// `create` was called for a key that is already present.
    #[error("{operation}: duplicate key `{key}`")]
    DuplicateKey {
        /// Name of the failing operation.
        operation: &'static str,
        /// The offending key, rendered with `Display`.
        key: String,
    },
    /// `update` or `delete` was called for a key that is absent.
    #[error("{operation}: key `{key}` not found")]
    KeyNotFound {
        /// Name of the failing operation.
        operation: &'static str,
        /// The offending key, rendered with `Display`.
        key: String,
    },
    /// Failure surfaced by an underlying backend (I/O, connectivity, ...).
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    /// Builds a [`StorageError::DuplicateKey`] for `key`.
    pub fn duplicate_key(operation: &'static str, key: &impl Display) -> Self {
        Self::DuplicateKey {
            operation,
            key: key.to_string(),
        }
    }

    /// Builds a [`StorageError::KeyNotFound`] for `key`.
    pub fn key_not_found(operation: &'static str, key: &impl Display) -> Self {
        Self::KeyNotFound {
            operation,
            key: key.to_string(),
        }
    }

    /// Whether this is a [`StorageError::DuplicateKey`].
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Whether this is a [`StorageError::KeyNotFound`].
    #[must_use]
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

/// Result alias used throughout the storage interface.
pub type StorageResult<T> = Result<T, StorageError>;

/// Typed suppression of the two expected data-state conflicts.
///
/// Each method swallows exactly one error kind and propagates every other
/// error unchanged.
pub trait StorageResultExt {
    /// Maps `Err(DuplicateKey)` to `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns any error that is not [`StorageError::DuplicateKey`].
    fn ignore_duplicate_key(self) -> StorageResult<()>;

    /// Maps `Err(KeyNotFound)` to `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns any error that is not [`StorageError::KeyNotFound`].
    fn ignore_key_not_found(self) -> StorageResult<()>;
}

impl StorageResultExt for StorageResult<()> {
    fn ignore_duplicate_key(self) -> StorageResult<()> {
        match self {
            Err(StorageError::DuplicateKey { .. }) => Ok(()),
            other => other,
        }
    }

    fn ignore_key_not_found(self) -> StorageResult<()> {
        match self {
            Err(StorageError::KeyNotFound { .. }) => Ok(()),
            other => other,
        }
    }
}

//! In-memory storage backend for testing.
//!
//! Provides [`InMemoryStorage`], which keeps the encoded documents in
//! memory instead of on disk. Documents still go through the same codecs
//! as [`super::FileStorage`], so decode behaviour is identical.

use std::sync::Mutex;

use super::Storage;
use super::schema::{self, Backup, Snapshot, UsersDocument};
use crate::error::{Result, TpeError};

/// Thread-safe in-memory storage for testing.
///
/// # Example
///
/// ```rust
/// use tpe_registry::storage::InMemoryStorage;
/// use tpe_registry::Registry;
///
/// let registry = Registry::new(InMemoryStorage::new());
/// assert!(registry.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// All state behind a single mutex for interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Encoded snapshot.
    snapshot: Option<Vec<u8>>,
    /// Encoded backup.
    backup: Option<String>,
    /// Encoded user directory.
    users: Option<String>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored snapshot with raw bytes, bypassing the encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn put_raw_snapshot(&self, bytes: Vec<u8>) -> Result<()> {
        self.with_lock(|inner| inner.snapshot = Some(bytes))
    }

    /// Replaces the stored backup with raw text, bypassing the encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn put_raw_backup<T: Into<String>>(&self, text: T) -> Result<()> {
        self.with_lock(|inner| inner.backup = Some(text.into()))
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> TpeError {
    TpeError::Storage(err.to_string().into())
}

impl Storage for InMemoryStorage {
    #[inline]
    fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        self.with_lock(|inner| inner.snapshot.clone())?
            .map(|bytes| schema::decode_snapshot(&bytes))
            .transpose()
    }

    #[inline]
    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = schema::encode_snapshot(snapshot)?;
        self.with_lock(|inner| inner.snapshot = Some(bytes))
    }

    #[inline]
    fn load_backup(&self) -> Result<Option<Backup>> {
        self.with_lock(|inner| inner.backup.clone())?
            .map(|text| schema::decode_backup(&text))
            .transpose()
    }

    #[inline]
    fn save_backup(&self, backup: &Backup) -> Result<()> {
        let text = schema::encode_backup(backup)?;
        self.with_lock(|inner| inner.backup = Some(text))
    }

    #[inline]
    fn load_users(&self) -> Result<Option<UsersDocument>> {
        self.with_lock(|inner| inner.users.clone())?
            .map(|text| schema::decode_users(&text))
            .transpose()
    }

    #[inline]
    fn save_users(&self, document: &UsersDocument) -> Result<()> {
        let text = schema::encode_users(document)?;
        self.with_lock(|inner| inner.users = Some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initially_empty() {
        let storage = InMemoryStorage::new();
        assert!(storage.load_snapshot().unwrap().is_none());
        assert!(storage.load_backup().unwrap().is_none());
        assert!(storage.load_users().unwrap().is_none());
    }

    #[test]
    fn snapshot_roundtrip() {
        let storage = InMemoryStorage::new();
        let snapshot = Snapshot::new(Vec::new());
        storage.save_snapshot(&snapshot).unwrap();
        assert_eq!(storage.load_snapshot().unwrap(), Some(snapshot));
    }

    #[test]
    fn raw_garbage_fails_to_decode() {
        let storage = InMemoryStorage::new();
        storage.put_raw_snapshot(vec![0xff, 0x13, 0x37]).unwrap();
        assert!(storage.load_snapshot().is_err());
        storage.put_raw_backup("{ not json").unwrap();
        assert!(storage.load_backup().is_err());
    }
}

//! Terminal registry: the record store bound to a storage backend.

use std::path::Path;

use crate::error::{Result, TpeError};
use crate::models::{ShopId, Terminal, TerminalStats};
use crate::storage::{self, Backup, Snapshot, Storage};
use crate::store::{TerminalFilter, TerminalStore};

/// Builder for constructing a [`Registry`].
#[derive(Debug)]
pub struct RegistryBuilder<S: Storage> {
    /// Storage backend.
    storage: Option<S>,
    /// Save after every mutation.
    autosave: bool,
    /// Load the snapshot on build.
    load: bool,
}

impl<S: Storage> RegistryBuilder<S> {
    /// Sets the storage backend.
    #[inline]
    #[must_use]
    pub fn storage(mut self, storage: S) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Writes snapshot and backup after every successful mutation.
    #[inline]
    #[must_use]
    pub const fn autosave(mut self, enabled: bool) -> Self {
        self.autosave = enabled;
        self
    }

    /// Loads the existing snapshot when building, or the backup when the
    /// snapshot cannot be read.
    #[inline]
    #[must_use]
    pub const fn load_on_build(mut self, enabled: bool) -> Self {
        self.load = enabled;
        self
    }

    /// Builds the registry.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::Storage`] if no storage was provided, or the
    /// error of [`Registry::load_or_backup`] when loading on build.
    #[inline]
    pub fn build(self) -> Result<Registry<S>> {
        let storage = self
            .storage
            .ok_or_else(|| TpeError::Storage("storage backend is required".into()))?;
        let mut registry = Registry {
            store: TerminalStore::new(),
            storage,
            autosave: self.autosave,
        };
        if self.load {
            let _found = registry.load_or_backup()?;
        }
        Ok(registry)
    }
}

/// Record store with persistence.
///
/// All record operations go through the in-memory [`TerminalStore`];
/// [`Registry::save`] and the `load*` methods move whole snapshots between
/// the store and the storage backend.
#[derive(Debug)]
pub struct Registry<S: Storage> {
    /// In-memory records.
    store: TerminalStore,
    /// Storage backend.
    storage: S,
    /// Save after every mutation.
    autosave: bool,
}

impl<S: Storage> Registry<S> {
    /// Creates an empty registry without autosave.
    #[inline]
    #[must_use]
    pub const fn new(storage: S) -> Self {
        Self {
            store: TerminalStore::new(),
            storage,
            autosave: false,
        }
    }

    /// Creates a new builder for configuring the registry.
    #[inline]
    #[must_use]
    pub const fn builder() -> RegistryBuilder<S> {
        RegistryBuilder {
            storage: None,
            autosave: false,
            load: false,
        }
    }

    /// Inserts a record and returns its key.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::DuplicateShopId`] if the key is taken, or a
    /// storage error when autosave fails.
    #[inline]
    pub fn add(&mut self, record: Terminal) -> Result<ShopId> {
        let key = self.store.add(record)?;
        self.autosave()?;
        Ok(key)
    }

    /// Removes a record. An absent key is a no-op and still returns
    /// `Ok(true)`.
    ///
    /// # Errors
    ///
    /// Returns a storage error when autosave fails.
    #[inline]
    pub fn remove(&mut self, key: ShopId) -> Result<bool> {
        let _taken = self.take(key)?;
        Ok(true)
    }

    /// Removes and returns the record with the given key, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error when autosave fails.
    #[inline]
    pub fn take(&mut self, key: ShopId) -> Result<Option<Terminal>> {
        let taken = self.store.take(key);
        if taken.is_some() {
            self.autosave()?;
        }
        Ok(taken)
    }

    /// Replaces a record, keeping its key and creation time; returns
    /// `false` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns a storage error when autosave fails.
    #[inline]
    pub fn replace(&mut self, key: ShopId, record: Terminal) -> Result<bool> {
        let replaced = self.store.replace(key, record);
        if replaced {
            self.autosave()?;
        }
        Ok(replaced)
    }

    /// Looks up a record by key.
    #[inline]
    #[must_use]
    pub fn find(&self, key: ShopId) -> Option<&Terminal> {
        self.store.find(key)
    }

    /// All records in insertion order.
    #[inline]
    #[must_use]
    pub fn list(&self) -> &[Terminal] {
        self.store.list()
    }

    /// Records matching `filter`.
    #[inline]
    #[must_use]
    pub fn search(&self, filter: &TerminalFilter) -> Vec<&Terminal> {
        self.store.search(filter)
    }

    /// Aggregate counters over all records.
    #[inline]
    #[must_use]
    pub fn statistics(&self) -> TerminalStats {
        self.store.statistics()
    }

    /// Number of records.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if there are no records.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// In-memory record store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &TerminalStore {
        &self.store
    }

    /// Storage backend.
    #[inline]
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Writes the snapshot, then the backup.
    ///
    /// # Errors
    ///
    /// Returns an error if either document cannot be encoded or written.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn save(&self) -> Result<()> {
        let records = self.store.list().to_vec();
        self.storage.save_snapshot(&Snapshot::new(records.clone()))?;
        self.storage.save_backup(&Backup::new(records))?;
        tracing::debug!(records = self.store.len(), "registry saved");
        Ok(())
    }

    /// Replaces the records with those of the stored snapshot.
    ///
    /// Returns `Ok(false)` when no snapshot exists yet. On error the
    /// current records are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is unreadable, corrupt, holds an
    /// invalid record or duplicate keys, or has a newer schema.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn load(&mut self) -> Result<bool> {
        let Some(snapshot) = self.storage.load_snapshot()? else {
            return Ok(false);
        };
        self.swap_in(snapshot.records)?;
        Ok(true)
    }

    /// Loads the snapshot, falling back to the backup when the snapshot
    /// cannot be read.
    ///
    /// Returns `Ok(false)` when neither document exists yet.
    ///
    /// # Errors
    ///
    /// Returns the snapshot error when the backup is missing or fails too.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn load_or_backup(&mut self) -> Result<bool> {
        match self.load() {
            Ok(true) => Ok(true),
            Ok(false) => self.load_backup(),
            Err(snapshot_err) => {
                tracing::warn!(error = %snapshot_err, "snapshot unreadable, trying backup");
                match self.load_backup() {
                    Ok(true) => Ok(true),
                    Ok(false) => Err(snapshot_err),
                    Err(backup_err) => {
                        tracing::warn!(error = %backup_err, "backup unreadable too");
                        Err(snapshot_err)
                    }
                }
            }
        }
    }

    /// Replaces the records with those of the stored backup.
    ///
    /// Returns `Ok(false)` when no backup exists yet. On error the current
    /// records are left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::load`].
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn load_backup(&mut self) -> Result<bool> {
        let Some(backup) = self.storage.load_backup()? else {
            return Ok(false);
        };
        self.swap_in(backup.records)?;
        Ok(true)
    }

    /// Replaces the records with those of an explicit file.
    ///
    /// `.json` files are read as backups, anything else as a snapshot.
    /// On error the current records are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::MissingFile`] if `path` does not exist, plus the
    /// errors of [`Registry::load`].
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    #[inline]
    pub fn restore_from(&mut self, path: &Path) -> Result<()> {
        let records = storage::read_records_file(path)?;
        self.swap_in(records)
    }

    /// Writes all records to an `.xlsx` workbook.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::Export`] if the workbook cannot be written.
    #[cfg(feature = "xlsx")]
    #[inline]
    pub fn export_table(&self, path: &Path) -> Result<()> {
        crate::export::write_xlsx(self.store.list(), path)
    }

    /// Builds a fresh store from `records` and swaps it in.
    fn swap_in(&mut self, records: Vec<Terminal>) -> Result<()> {
        let store = TerminalStore::from_records(records)?;
        tracing::debug!(records = store.len(), "records loaded");
        self.store = store;
        Ok(())
    }

    /// Saves when autosave is enabled.
    fn autosave(&self) -> Result<()> {
        if self.autosave {
            self.save()?;
        }
        Ok(())
    }
}

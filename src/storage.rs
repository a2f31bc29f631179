//! Pluggable storage backends for the terminal registry and user directory.
//!
//! A backend persists three documents:
//!
//! - the binary [`Snapshot`] of the record store (primary copy),
//! - the human-readable [`Backup`] of the same records,
//! - the [`UsersDocument`] holding user accounts.
//!
//! Reading goes through the compatibility shim in [`schema`], so records
//! written by older versions come back upgraded and validated.

mod file;
mod memory;
mod schema;

use std::path::Path;

pub use file::{FileStorage, StorageConfig};
pub use memory::InMemoryStorage;
pub use schema::{Backup, SchemaVersion, Snapshot, UsersDocument};

use crate::error::{Result, TpeError};
use crate::models::Terminal;

/// Storage backend for registry and user data.
///
/// All methods take `&self`; implementations use interior mutability
/// where they keep state.
pub trait Storage: core::fmt::Debug {
    /// Reads the binary snapshot.
    ///
    /// Returns `Ok(None)` if no snapshot has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read, is corrupt, or was
    /// written by a newer schema.
    fn load_snapshot(&self) -> Result<Option<Snapshot>>;

    /// Replaces the binary snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Reads the human-readable backup.
    ///
    /// Returns `Ok(None)` if no backup has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup cannot be read or decoded.
    fn load_backup(&self) -> Result<Option<Backup>>;

    /// Replaces the human-readable backup.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn save_backup(&self, backup: &Backup) -> Result<()>;

    /// Reads the user directory.
    ///
    /// Returns `Ok(None)` if no directory has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or decoded.
    fn load_users(&self) -> Result<Option<UsersDocument>>;

    /// Replaces the user directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn save_users(&self, document: &UsersDocument) -> Result<()>;
}

/// Reads records from an arbitrary snapshot or backup file.
///
/// Files ending in `.json` are read as backups, anything else as a binary
/// snapshot.
///
/// # Errors
///
/// Returns [`TpeError::MissingFile`] if `path` does not exist, or a decode
/// error if the file is not a readable document.
#[inline]
pub fn read_records_file(path: &Path) -> Result<Vec<Terminal>> {
    if !path.exists() {
        return Err(TpeError::MissingFile(path.to_path_buf()));
    }
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let text = std::fs::read_to_string(path).map_err(file::storage_io_error)?;
        Ok(schema::decode_backup(&text)?.records)
    } else {
        let bytes = std::fs::read(path).map_err(file::storage_io_error)?;
        Ok(schema::decode_snapshot(&bytes)?.records)
    }
}

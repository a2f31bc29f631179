//! File-based storage backend.
//!
//! Keeps three files under a data directory (default:
//! `$XDG_DATA_HOME/tpe-registry/`):
//!
//! ```text
//! <dir>/
//!   tpe_data.cbor      (binary snapshot)
//!   tpe_backup.json    (readable backup)
//!   users.json         (user directory)
//! ```
//!
//! Every write goes to a `.tmp` sibling first and is then renamed over the
//! target, so a crash never leaves a half-written document behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::Storage;
use super::schema::{self, Backup, Snapshot, UsersDocument};
use crate::error::{Result, TpeError};

/// Application name used for the XDG data directory.
#[cfg(feature = "storage-file")]
const APP_NAME: &str = "tpe-registry";

/// Default snapshot file name.
const SNAPSHOT_FILE: &str = "tpe_data.cbor";
/// Default backup file name.
const BACKUP_FILE: &str = "tpe_backup.json";
/// Default user directory file name.
const USERS_FILE: &str = "users.json";

/// Locations of the persisted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Binary snapshot path.
    pub snapshot_path: PathBuf,
    /// Readable backup path.
    pub backup_path: PathBuf,
    /// User directory path.
    pub users_path: PathBuf,
}

impl StorageConfig {
    /// Uses the default file names inside `dir`.
    #[inline]
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            snapshot_path: dir.join(SNAPSHOT_FILE),
            backup_path: dir.join(BACKUP_FILE),
            users_path: dir.join(USERS_FILE),
        }
    }
}

/// File-backed storage.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Document locations.
    config: StorageConfig,
}

impl FileStorage {
    /// Creates a file storage writing to the configured paths.
    ///
    /// Creates the parent directories if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a parent directory cannot be created.
    #[inline]
    pub fn new(config: StorageConfig) -> Result<Self> {
        for path in [
            &config.snapshot_path,
            &config.backup_path,
            &config.users_path,
        ] {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(storage_io_error)?;
            }
        }
        Ok(Self { config })
    }

    /// Creates a file storage with the default file names inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    #[inline]
    pub fn in_dir(dir: &Path) -> Result<Self> {
        Self::new(StorageConfig::in_dir(dir))
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/tpe-registry/` (typically
    /// `~/.local/share/tpe-registry/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[cfg(feature = "storage-file")]
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| TpeError::Storage("could not determine platform data directory".into()))
    }

    /// Document locations.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }
}

impl Storage for FileStorage {
    #[tracing::instrument(skip_all)]
    #[inline]
    fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        read_optional(&self.config.snapshot_path, |path| fs::read(path))?
            .map(|bytes| schema::decode_snapshot(&bytes))
            .transpose()
    }

    #[tracing::instrument(skip_all)]
    #[inline]
    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = schema::encode_snapshot(snapshot)?;
        write_atomic(&self.config.snapshot_path, &bytes)?;
        tracing::debug!(
            records = snapshot.records.len(),
            path = %self.config.snapshot_path.display(),
            "snapshot written"
        );
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    #[inline]
    fn load_backup(&self) -> Result<Option<Backup>> {
        read_optional(&self.config.backup_path, |path| fs::read_to_string(path))?
            .map(|text| schema::decode_backup(&text))
            .transpose()
    }

    #[tracing::instrument(skip_all)]
    #[inline]
    fn save_backup(&self, backup: &Backup) -> Result<()> {
        let text = schema::encode_backup(backup)?;
        write_atomic(&self.config.backup_path, text.as_bytes())?;
        tracing::debug!(
            records = backup.records.len(),
            path = %self.config.backup_path.display(),
            "backup written"
        );
        Ok(())
    }

    #[inline]
    fn load_users(&self) -> Result<Option<UsersDocument>> {
        read_optional(&self.config.users_path, |path| fs::read_to_string(path))?
            .map(|text| schema::decode_users(&text))
            .transpose()
    }

    #[inline]
    fn save_users(&self, document: &UsersDocument) -> Result<()> {
        let text = schema::encode_users(document)?;
        write_atomic(&self.config.users_path, text.as_bytes())
    }
}

/// Reads a file, mapping "not found" to `None`.
fn read_optional<T, F>(path: &Path, read: F) -> Result<Option<T>>
where
    F: FnOnce(&Path) -> std::io::Result<T>,
{
    match read(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(storage_io_error(err)),
    }
}

/// Atomically replaces a file (write-to-tmp then rename).
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, contents).map_err(storage_io_error)?;
    fs::rename(&tmp_path, path).map_err(storage_io_error)?;
    Ok(())
}

/// Wraps an I/O error into a [`TpeError::Storage`].
pub(crate) fn storage_io_error(err: std::io::Error) -> TpeError {
    TpeError::Storage(Box::new(err))
}

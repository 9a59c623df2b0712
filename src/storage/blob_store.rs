// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path-addressed ciphertext blob storage.
//!
//! Blobs are opaque bytes addressed by a relative `/`-separated path such as
//! `seller-1/1706400000000_main.py.enc`. A path is written once and is
//! immutable afterwards; a second `put` to the same path fails with
//! [`StorageError::AlreadyExists`].
//!
//! The filesystem implementation stages each write in a temp file and
//! publishes it with a no-clobber hard link, so readers never observe a
//! partially written blob.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};

use super::StoragePaths;

/// Error type for blob store operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// No blob at the path
    NotFound(String),
    /// A blob already exists at the path
    AlreadyExists(String),
    /// Path is empty, absolute, or escapes the blob root
    InvalidPath(String),
    /// Record could not be encoded or decoded
    Serialization(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::NotFound(path) => write!(f, "Blob not found: {path}"),
            StorageError::AlreadyExists(path) => write!(f, "Blob already exists: {path}"),
            StorageError::InvalidPath(path) => write!(f, "Invalid path: {path}"),
            StorageError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A blob discovered by [`AssetStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub path: String,
    pub modified_at: DateTime<Utc>,
}

/// Blob storage used by the custody gateway.
pub trait AssetStore: Send + Sync {
    /// Store bytes at `path`. Fails if the path is already taken.
    fn put(&self, path: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Fetch the bytes at `path`.
    fn get(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Remove the blob at `path`.
    fn delete(&self, path: &str) -> StorageResult<()>;

    /// Last modification time of the blob at `path`.
    fn modified_at(&self, path: &str) -> StorageResult<DateTime<Utc>>;

    /// Every stored blob with its last modification time.
    fn list(&self) -> StorageResult<Vec<StoredBlob>>;

    /// Verify the store is reachable and writable.
    fn health_check(&self) -> StorageResult<()>;
}

/// Validate a relative blob path and convert it to a filesystem path.
///
/// Segments must be non-empty and may not be `.` or `..`. Backslashes and
/// NUL bytes are rejected outright.
pub fn validate_blob_path(path: &str) -> StorageResult<PathBuf> {
    let invalid = || StorageError::InvalidPath(path.to_string());

    if path.is_empty() || path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return Err(invalid());
    }

    let mut rel = PathBuf::new();
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        rel.push(segment);
    }

    // Rejects platform prefixes such as `C:`.
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(invalid());
    }

    Ok(rel)
}

/// Filesystem-backed [`AssetStore`] rooted at `{DATA_DIR}/blobs`.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    paths: StoragePaths,
}

impl FsAssetStore {
    /// Open the store, creating the blob and staging directories.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn open(paths: StoragePaths) -> StorageResult<Self> {
        fs::create_dir_all(paths.blobs_dir())?;
        fs::create_dir_all(paths.blob_staging_dir())?;
        Ok(Self { paths })
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        Ok(self.paths.blobs_dir().join(validate_blob_path(path)?))
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<StoredBlob>) -> StorageResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.collect(&entry.path(), &rel, out)?;
            } else if file_type.is_file() {
                let modified = entry.metadata()?.modified()?;
                out.push(StoredBlob {
                    path: rel,
                    modified_at: DateTime::<Utc>::from(modified),
                });
            }
        }
        Ok(())
    }
}

impl AssetStore for FsAssetStore {
    fn put(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let staged = self
            .paths
            .blob_staging_dir()
            .join(format!("{}.tmp", uuid::Uuid::new_v4()));
        {
            let mut file = File::create(&staged)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }

        // hard_link never replaces an existing target.
        let published = fs::hard_link(&staged, &target);
        let _ = fs::remove_file(&staged);

        match published {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let target = self.resolve(path)?;
        match fs::read(&target) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn modified_at(&self, path: &str) -> StorageResult<DateTime<Utc>> {
        let target = self.resolve(path)?;
        match fs::metadata(&target).and_then(|m| m.modified()) {
            Ok(modified) => Ok(DateTime::<Utc>::from(modified)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn list(&self) -> StorageResult<Vec<StoredBlob>> {
        let mut blobs = Vec::new();
        self.collect(&self.paths.blobs_dir(), "", &mut blobs)?;
        blobs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(blobs)
    }

    /// Performs a write-read-delete round trip in the staging directory.
    fn health_check(&self) -> StorageResult<()> {
        let test_file = self.paths.blob_staging_dir().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::Io(io::Error::other(
                "health check data mismatch",
            )));
        }
        Ok(())
    }
}

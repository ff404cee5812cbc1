// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File access used by the configuration store.
//!
//! The host application owns file access; this crate only needs three
//! primitives: read a whole file, write a whole file, and make sure a
//! directory exists. [`LocalFiles`] implements them on the local filesystem.
//!
//! ## Security Note
//!
//! Secrets are written as plain JSON here. Encryption at rest is the host's
//! job (see the envelope's info block); do not add crypto to this module.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Error type for file operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Host file primitives.
#[async_trait]
pub trait FilesManager: Send + Sync {
    /// Read a whole file. `Ok(None)` when it does not exist.
    async fn read_file(&self, path: &Path) -> StorageResult<Option<Vec<u8>>>;

    /// Replace a file's content as a unit.
    async fn write_file(&self, path: &Path, data: &[u8]) -> StorageResult<()>;

    /// Create a directory and its parents. Idempotent.
    async fn ensure_directory_exists(&self, path: &Path) -> StorageResult<()>;
}

/// [`FilesManager`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFiles;

#[async_trait]
impl FilesManager for LocalFiles {
    async fn read_file(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file first, then rename for atomicity.
    async fn write_file(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = std::path::PathBuf::from(temp_name);

        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await?;
        }

        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn ensure_directory_exists(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir_all(path).await?;
        Ok(())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistence of the home server configuration envelope.
//!
//! A missing or unparseable `config.json` reads as "no configuration yet" and
//! the manager generates a new one. [`ConfigurationStore::load_detailed`]
//! reports the corrupt case separately so the old file can be copied aside
//! first, and reports an unreadable file so the manager can refuse to touch it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::files::{FilesManager, StorageError, StorageResult};
use super::paths::HomeServerPaths;
use crate::error::ConfigurationError;
use crate::models::{ConfigurationEnvelope, ServerConfiguration};

/// Result of reading `config.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Missing,
    Loaded(ServerConfiguration),
    /// The file exists but is not a valid envelope.
    Corrupt(String),
    /// The file could not be read at all.
    Unreadable(String),
}

impl LoadOutcome {
    pub fn into_configuration(self) -> Option<ServerConfiguration> {
        match self {
            LoadOutcome::Loaded(configuration) => Some(configuration),
            _ => None,
        }
    }
}

/// Stateless codec between [`ServerConfiguration`] and the envelope file.
#[derive(Clone)]
pub struct ConfigurationStore {
    files: Arc<dyn FilesManager>,
}

impl ConfigurationStore {
    pub fn new(files: Arc<dyn FilesManager>) -> Self {
        Self { files }
    }

    /// Load the configuration, treating every failure as "absent".
    pub async fn load(&self, data_location: &Path) -> Option<ServerConfiguration> {
        self.load_detailed(data_location).await.into_configuration()
    }

    /// Load the configuration and say why nothing was loaded.
    pub async fn load_detailed(&self, data_location: &Path) -> LoadOutcome {
        let path = HomeServerPaths::new(data_location).config_file();

        let bytes = match self.files.read_file(&path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return LoadOutcome::Missing,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read home server configuration");
                return LoadOutcome::Unreadable(e.to_string());
            }
        };

        match serde_json::from_slice::<ConfigurationEnvelope>(&bytes) {
            Ok(envelope) => LoadOutcome::Loaded(envelope.configuration),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not parse home server configuration");
                LoadOutcome::Corrupt(e.to_string())
            }
        }
    }

    /// Wrap `configuration` in a fresh envelope and write it as `config.json`.
    pub async fn save(
        &self,
        data_location: Option<&Path>,
        configuration: &ServerConfiguration,
    ) -> Result<(), ConfigurationError> {
        let data_location = data_location.ok_or(ConfigurationError::NoDataLocation)?;
        let paths = HomeServerPaths::new(data_location);

        self.files.ensure_directory_exists(paths.root()).await?;

        let envelope = ConfigurationEnvelope::wrap(configuration.clone());
        let data = serde_json::to_vec_pretty(&envelope).map_err(StorageError::from)?;
        self.files.write_file(&paths.config_file(), &data).await?;

        info!(path = %paths.config_file().display(), "Saved home server configuration");
        Ok(())
    }

    /// Copy an unreadable `config.json` aside before it gets overwritten.
    ///
    /// Returns the backup path, or `None` when there was nothing to copy.
    pub async fn quarantine_corrupt(&self, data_location: &Path) -> StorageResult<Option<PathBuf>> {
        let paths = HomeServerPaths::new(data_location);
        let Some(bytes) = self.files.read_file(&paths.config_file()).await? else {
            return Ok(None);
        };

        let backup = paths.corrupt_config_backup(Utc::now());
        self.files.write_file(&backup, &bytes).await?;
        warn!(
            backup = %backup.display(),
            "Copied unreadable home server configuration aside"
        );
        Ok(Some(backup))
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout inside a home server data location.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::CONFIGURATION_FILE_NAME;

/// Storage path utilities for one data location.
#[derive(Debug, Clone)]
pub struct HomeServerPaths {
    root: PathBuf,
}

impl HomeServerPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the data location.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the persisted configuration envelope.
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIGURATION_FILE_NAME)
    }

    /// Where an unreadable configuration is moved aside before regeneration.
    pub fn corrupt_config_backup(&self, at: DateTime<Utc>) -> PathBuf {
        self.root.join(format!(
            "{CONFIGURATION_FILE_NAME}.corrupt-{}",
            at.format("%Y%m%dT%H%M%S%.3fZ")
        ))
    }
}

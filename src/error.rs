// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the home server manager.
//!
//! None of these cross the manager boundary as errors: [`crate::manager`]
//! converts them to their `Display` text and returns that string instead.

use crate::secrets::SecretError;
use crate::storage::StorageError;

/// Message reported when an operation needs a data location and none is set.
pub const NO_DATA_LOCATION_MESSAGE: &str = "Home server data location is not set.";

/// Failures while reading, validating or persisting the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{}", NO_DATA_LOCATION_MESSAGE)]
    NoDataLocation,

    /// `config.json` exists but could not be read. Nothing may overwrite it.
    #[error("Could not read home server configuration: {0}")]
    Unreadable(String),

    #[error("Invalid home server configuration: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Could not save server configuration: {0}")]
    Storage(#[from] StorageError),
}

/// Failures surfaced by the lifecycle supervisor.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Could not generate home server secrets: {0}")]
    Secret(#[from] SecretError),

    #[error("Home server is unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    StartFailure(String),

    #[error("{0}")]
    StopFailure(String),
}

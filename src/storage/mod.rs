// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Configuration Storage Module
//!
//! Persists the home server configuration under the data location.
//!
//! ## Storage Layout
//!
//! ```text
//! <data location>/
//!   config.json                   # ConfigurationEnvelope (version, info, configuration)
//!   config.json.corrupt-<stamp>   # copy of an unreadable configuration
//!   ...                           # everything else belongs to the home server
//! ```
//!
//! ## Important Notes
//!
//! - This module uses **normal filesystem I/O** through [`FilesManager`]
//! - Encryption at rest is provided by the host, not by this crate

pub mod config_store;
pub mod files;
pub mod paths;

pub use config_store::{ConfigurationStore, LoadOutcome};
pub use files::{FilesManager, LocalFiles, StorageError, StorageResult};
pub use paths::HomeServerPaths;

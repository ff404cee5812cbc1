// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used by
//! the `home-server` binary and the manager itself. Host settings are loaded
//! from the environment at startup; the home server's own configuration lives
//! in `config.json` under the data location (see [`crate::storage`]).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOME_SERVER_DATA_DIR` | Data location for the home server | Required |
//! | `HOME_SERVER_BIN` | Executable launched as the home server | `home-server-backend` |
//! | `HOME_SERVER_READY_TIMEOUT_MS` | How long to wait for the port to open | `60000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Environment variable name for the home server data location.
pub const DATA_DIR_ENV: &str = "HOME_SERVER_DATA_DIR";

/// Environment variable name for the home server executable.
pub const SERVER_BIN_ENV: &str = "HOME_SERVER_BIN";

/// Environment variable name for the readiness timeout in milliseconds.
pub const READY_TIMEOUT_ENV: &str = "HOME_SERVER_READY_TIMEOUT_MS";

/// Environment variable selecting `json` or `pretty` log output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Executable looked up on `PATH` when `HOME_SERVER_BIN` is unset.
pub const DEFAULT_SERVER_BIN: &str = "home-server-backend";

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

// ========== Home Server Defaults ==========

/// Port assigned to freshly generated configurations.
pub const DEFAULT_PORT: u16 = 3127;

/// Log level assigned to freshly generated configurations.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Value of the `VERSION` variable handed to the home server.
pub const SERVER_VERSION_TAG: &str = "desktop";

/// Name of the persisted configuration file inside the data location.
pub const CONFIGURATION_FILE_NAME: &str = "config.json";

/// Format version written into every configuration envelope.
pub const CONFIGURATION_FORMAT_VERSION: &str = "1.0.0";

/// Number of home server log lines kept in memory.
pub const LOGS_BUFFER_SIZE: usize = 1000;

/// Random bytes behind each generated secret (hex-encoded to twice as many chars).
pub const SECRET_KEY_BYTES: usize = 32;

/// Settings for the `home-server` binary, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    pub data_dir: Option<PathBuf>,
    pub server_bin: PathBuf,
    pub ready_timeout: Duration,
}

impl ManagerSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let server_bin = lookup(SERVER_BIN_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVER_BIN));

        let ready_timeout = match lookup(READY_TIMEOUT_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warn!(
                        variable = READY_TIMEOUT_ENV,
                        value = %raw,
                        "Invalid readiness timeout, using default"
                    );
                    DEFAULT_READY_TIMEOUT
                }
            },
            None => DEFAULT_READY_TIMEOUT,
        };

        Self {
            data_dir,
            server_bin,
            ready_timeout,
        }
    }
}

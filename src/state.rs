// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::ServerConfiguration;

/// Where the manager is in the start/stop cycle.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Mutable state owned by one [`crate::manager::HomeServerManager`].
///
/// Whether the server is running is not stored here; it is always asked of
/// the service handle.
#[derive(Debug, Default)]
pub struct LifecycleState {
    pub data_location: Option<PathBuf>,
    pub cached_configuration: Option<ServerConfiguration>,
    pub last_error: Option<String>,
    pub phase: LifecyclePhase,
    pub started_at: Option<DateTime<Utc>>,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed command. The phase follows what the handle reports,
    /// so a failed second start or a failed stop leaves a live server `Running`.
    pub fn fail(&mut self, message: impl Into<String>, still_running: bool) -> String {
        let message = message.into();
        self.last_error = Some(message.clone());
        self.phase = if still_running {
            LifecyclePhase::Running
        } else {
            LifecyclePhase::Stopped
        };
        message
    }
}

/// Snapshot for UI polling.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HomeServerStatus {
    pub running: bool,
    pub phase: LifecyclePhase,
    pub last_error: Option<String>,
    pub url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_stopped_and_empty() {
        let state = LifecycleState::new();
        assert_eq!(state.phase, LifecyclePhase::Stopped);
        assert!(state.data_location.is_none());
        assert!(state.cached_configuration.is_none());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn fail_records_error_and_stops() {
        let mut state = LifecycleState::new();
        state.phase = LifecyclePhase::Starting;
        let message = state.fail("boom", false);
        assert_eq!(message, "boom");
        assert_eq!(state.last_error.as_deref(), Some("boom"));
        assert_eq!(state.phase, LifecyclePhase::Stopped);
    }

    #[test]
    fn fail_on_live_server_stays_running() {
        let mut state = LifecycleState::new();
        state.phase = LifecyclePhase::Stopping;
        state.fail("still busy", true);
        assert_eq!(state.last_error.as_deref(), Some("still busy"));
        assert_eq!(state.phase, LifecyclePhase::Running);
    }

    #[test]
    fn status_serializes_camel_case() {
        let status = HomeServerStatus {
            running: false,
            phase: LifecyclePhase::Stopped,
            last_error: Some("x".into()),
            url: None,
            started_at: None,
        };
        let value = serde_json::to_value(status).unwrap();
        assert_eq!(value["lastError"], "x");
        assert_eq!(value["phase"], "stopped");
    }
}

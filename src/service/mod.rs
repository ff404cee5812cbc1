// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Home Server Service Handle
//!
//! The manager never launches anything itself; it drives a
//! [`HomeServerService`] handle. Whether such a handle can exist on this
//! platform is decided once, when [`ServiceAvailability::detect`] runs, and
//! the handle is then built lazily on the first start.

pub mod process;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::environment::Environment;

pub use process::{ChildProcessFactory, ChildProcessService, ProcessSettings};

/// Receives every line the home server prints.
pub type LogSink = Arc<dyn Fn(String) + Send + Sync>;

/// Everything the home server needs to boot.
#[derive(Clone)]
pub struct StartOptions {
    pub data_directory: PathBuf,
    pub environment: Environment,
    pub log_sink: LogSink,
}

impl fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartOptions")
            .field("data_directory", &self.data_directory)
            .field("environment_keys", &self.environment.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// The running/stoppable embedded backend.
///
/// Failures are reported as human-readable messages.
#[async_trait]
pub trait HomeServerService: Send + Sync {
    /// Launch the server and wait until it reports ready or failed.
    async fn start(&self, options: StartOptions) -> Result<(), String>;

    async fn stop(&self) -> Result<(), String>;

    async fn is_running(&self) -> bool;

    async fn activate_premium_features(&self, username: &str) -> Result<(), String>;
}

/// Builds the service handle on first use.
pub trait ServiceFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn HomeServerService>, String>;
}

impl<F> ServiceFactory for F
where
    F: Fn() -> Result<Arc<dyn HomeServerService>, String> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn HomeServerService>, String> {
        self()
    }
}

/// Result of the one-time platform capability check.
pub enum ServiceAvailability {
    Available(Box<dyn ServiceFactory>),
    Unavailable,
}

impl fmt::Debug for ServiceAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceAvailability::Available(_) => f.write_str("Available"),
            ServiceAvailability::Unavailable => f.write_str("Unavailable"),
        }
    }
}

impl ServiceAvailability {
    /// Whether the embedded home server can run on this platform.
    pub const fn platform_supported() -> bool {
        !cfg!(target_os = "windows")
    }

    /// Check the platform once and keep `factory` only if it can be used.
    pub fn detect(factory: impl ServiceFactory + 'static) -> Self {
        if Self::platform_supported() {
            ServiceAvailability::Available(Box::new(factory))
        } else {
            tracing::info!("Home server is not supported on this platform");
            ServiceAvailability::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ServiceAvailability::Available(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl HomeServerService for Noop {
        async fn start(&self, _options: StartOptions) -> Result<(), String> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), String> {
            Ok(())
        }
        async fn is_running(&self) -> bool {
            false
        }
        async fn activate_premium_features(&self, _username: &str) -> Result<(), String> {
            Ok(())
        }
    }

    fn noop_factory() -> Result<Arc<dyn HomeServerService>, String> {
        Ok(Arc::new(Noop))
    }

    #[test]
    fn detect_follows_platform_support() {
        let availability = ServiceAvailability::detect(noop_factory);
        assert_eq!(
            availability.is_available(),
            ServiceAvailability::platform_supported()
        );
    }

    #[test]
    fn closures_are_factories() {
        let factory: Box<dyn ServiceFactory> = Box::new(noop_factory);
        assert!(factory.create().is_ok());
    }

    #[test]
    fn start_options_debug_hides_values() {
        let mut environment = Environment::new();
        environment.insert("JWT_SECRET".into(), "super-secret".into());
        let options = StartOptions {
            data_directory: PathBuf::from("/data"),
            environment,
            log_sink: Arc::new(|_: String| {}),
        };
        let rendered = format!("{options:?}");
        assert!(rendered.contains("JWT_SECRET"));
        assert!(!rendered.contains("super-secret"));
    }
}

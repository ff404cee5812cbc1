// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Home Server Manager
//!
//! Lifecycle and configuration supervisor for the embedded home server.
//!
//! ## Start Sequence
//!
//! 1. Skip entirely when the platform cannot run the home server.
//! 2. Clear the last error and the log buffer.
//! 3. Use the cached or persisted configuration. Generate one (fresh secrets)
//!    only when none exists and persist it. An existing file that cannot be
//!    read fails the start and is left untouched.
//! 4. Fail with "Home server data location is not set." when there is no data
//!    location. The service handle is not touched.
//! 5. Build the environment descriptor.
//! 6. Start the service handle, streaming its output into the log buffer.
//! 7. On failure record the message as the last error and return it.
//! 8. On success push `HomeServerStarted` to the UI.
//!
//! ## Concurrency
//!
//! `start`, `stop` and `set_configuration` are serialised by a command gate.
//! The lifecycle state lock is only held for short updates, never while the
//! service handle is starting, so log lines and status queries keep flowing
//! during a start. A `stop` issued while a start is in flight waits for it.
//!
//! ## Errors
//!
//! Nothing is raised to the host: failures come back as message strings and
//! the most recent one stays readable through [`HomeServerManager::get_last_error`].
//! Service handle calls run on their own task, so a panicking handle is
//! reported like any other start or stop failure.

use std::any::Any;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, error, info, warn};

use crate::environment::{build_environment, describe_keys};
use crate::error::{ConfigurationError, SupervisorError};
use crate::log_buffer::LogBuffer;
use crate::models::ServerConfiguration;
use crate::network::{home_server_url, AddressResolver};
use crate::notifier::{MessageToWebApp, UiNotifier};
use crate::secrets::SecretGenerator;
use crate::service::{HomeServerService, LogSink, ServiceAvailability, ServiceFactory, StartOptions};
use crate::state::{HomeServerStatus, LifecyclePhase, LifecycleState};
use crate::storage::{ConfigurationStore, FilesManager, LoadOutcome};

/// Supervises one embedded home server for the lifetime of the host session.
pub struct HomeServerManager {
    availability: ServiceAvailability,
    service: OnceCell<Arc<dyn HomeServerService>>,
    store: ConfigurationStore,
    secrets: SecretGenerator,
    resolver: Arc<dyn AddressResolver>,
    notifier: Arc<dyn UiNotifier>,
    logs: Arc<LogBuffer>,
    state: RwLock<LifecycleState>,
    commands: Mutex<()>,
}

impl HomeServerManager {
    pub fn new(
        availability: ServiceAvailability,
        files: Arc<dyn FilesManager>,
        resolver: Arc<dyn AddressResolver>,
        notifier: Arc<dyn UiNotifier>,
    ) -> Self {
        Self {
            availability,
            service: OnceCell::new(),
            store: ConfigurationStore::new(files),
            secrets: SecretGenerator::new(),
            resolver,
            notifier,
            logs: Arc::new(LogBuffer::default()),
            state: RwLock::new(LifecycleState::new()),
            commands: Mutex::new(()),
        }
    }

    // ========== Data Location ==========

    pub async fn set_data_location(&self, location: impl Into<PathBuf>) {
        let location = location.into();
        info!(location = %location.display(), "Home server data location set");
        self.state.write().await.data_location = Some(location);
    }

    pub async fn data_location(&self) -> Option<PathBuf> {
        self.state.read().await.data_location.clone()
    }

    // ========== Configuration ==========

    /// Current configuration as JSON: cached copy first, then `config.json`.
    pub async fn get_configuration(&self) -> Option<String> {
        let configuration = self.load_configuration().await.into_configuration()?;
        match serde_json::to_string(&configuration) {
            Ok(json) => Some(json),
            Err(e) => {
                error!(error = %e, "Could not serialize home server configuration");
                None
            }
        }
    }

    /// Replace the configuration with `json`, persist it and cache it.
    ///
    /// Failures are logged and returned; the previous configuration stays in
    /// place.
    pub async fn set_configuration(&self, json: &str) -> Result<(), ConfigurationError> {
        let _command = self.commands.lock().await;

        let result = async {
            if self.state.read().await.data_location.is_none() {
                return Err(ConfigurationError::NoDataLocation);
            }
            let configuration: ServerConfiguration = serde_json::from_str(json)?;
            self.persist_configuration(&configuration).await
        }
        .await;

        if let Err(e) = &result {
            error!(error = %e, "Could not save server configuration");
        }
        result
    }

    async fn persist_configuration(
        &self,
        configuration: &ServerConfiguration,
    ) -> Result<(), ConfigurationError> {
        let location = self.state.read().await.data_location.clone();
        self.store.save(location.as_deref(), configuration).await?;
        self.state.write().await.cached_configuration = Some(configuration.clone());
        Ok(())
    }

    async fn load_configuration(&self) -> LoadOutcome {
        let (cached, location) = {
            let state = self.state.read().await;
            (state.cached_configuration.clone(), state.data_location.clone())
        };

        if let Some(configuration) = cached {
            return LoadOutcome::Loaded(configuration);
        }
        match location {
            Some(location) => self.store.load_detailed(&location).await,
            None => LoadOutcome::Missing,
        }
    }

    /// Existing configuration, or a freshly generated and persisted one.
    ///
    /// A corrupt `config.json` is copied aside before the new configuration
    /// replaces it. One that cannot be read at all is never replaced.
    async fn obtain_configuration(&self) -> Result<ServerConfiguration, SupervisorError> {
        match self.load_configuration().await {
            LoadOutcome::Loaded(configuration) => {
                self.state.write().await.cached_configuration = Some(configuration.clone());
                return Ok(configuration);
            }
            LoadOutcome::Missing => {}
            LoadOutcome::Corrupt(reason) => {
                error!(
                    reason = %reason,
                    "Home server configuration is corrupt; generating new secrets"
                );
                if let Some(location) = self.data_location().await {
                    if let Err(e) = self.store.quarantine_corrupt(&location).await {
                        warn!(error = %e, "Could not back up corrupt home server configuration");
                    }
                }
            }
            LoadOutcome::Unreadable(reason) => {
                return Err(ConfigurationError::Unreadable(reason).into());
            }
        }

        info!("Generating home server configuration");
        let configuration = ServerConfiguration::generate(&self.secrets)?;
        if let Err(e) = self.persist_configuration(&configuration).await {
            warn!(error = %e, "Could not persist home server configuration");
        }
        Ok(configuration)
    }

    // ========== Lifecycle ==========

    /// Start the home server. Returns an error message on failure, `None` on
    /// success or when the platform does not support the home server.
    pub async fn start(&self) -> Option<String> {
        let ServiceAvailability::Available(factory) = &self.availability else {
            debug!("Home server unavailable on this platform, ignoring start");
            return None;
        };

        let _command = self.commands.lock().await;

        match self.start_inner(factory.as_ref()).await {
            Ok(()) => None,
            Err(e) => {
                let still_running = self.is_running().await;
                let message = self.state.write().await.fail(e.to_string(), still_running);
                error!(error = %message, still_running, "Home server failed to start");
                Some(message)
            }
        }
    }

    async fn start_inner(&self, factory: &dyn ServiceFactory) -> Result<(), SupervisorError> {
        if let Some(service) = self.service.get() {
            if service.is_running().await {
                return Err(SupervisorError::StartFailure(
                    "Home server is already running.".to_string(),
                ));
            }
        }

        {
            let mut state = self.state.write().await;
            state.last_error = None;
            state.phase = LifecyclePhase::Starting;
        }
        self.logs.reset();

        let configuration = self.obtain_configuration().await?;

        let data_directory = self
            .data_location()
            .await
            .ok_or(ConfigurationError::NoDataLocation)?;

        let url = self.url_for(&configuration);
        let environment = build_environment(&configuration, url.as_deref());
        debug!(
            keys = ?describe_keys(&environment),
            "Built home server environment"
        );

        let service = self
            .service
            .get_or_try_init(|| async { factory.create() })
            .await
            .map_err(SupervisorError::ServiceUnavailable)?
            .clone();

        let logs = Arc::clone(&self.logs);
        let log_sink: LogSink = Arc::new(move |line: String| logs.append(line));

        info!(
            data_directory = %data_directory.display(),
            port = configuration.port,
            engine = %configuration.database_engine,
            "Starting home server"
        );
        let options = StartOptions {
            data_directory,
            environment,
            log_sink,
        };
        run_isolated("start", async move { service.start(options).await })
            .await
            .map_err(SupervisorError::StartFailure)?;

        {
            let mut state = self.state.write().await;
            state.phase = LifecyclePhase::Running;
            state.started_at = Some(Utc::now());
        }

        let url = self.url_for(&configuration);
        info!(url = ?url, "Home server started");
        self.notifier.notify(MessageToWebApp::HomeServerStarted { url });
        Ok(())
    }

    /// Stop the home server. No-op when it was never started.
    pub async fn stop(&self) -> Option<String> {
        let service = self.service.get().cloned()?;

        let _command = self.commands.lock().await;
        self.state.write().await.phase = LifecyclePhase::Stopping;

        let stopping = Arc::clone(&service);
        match run_isolated("stop", async move { stopping.stop().await }).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                state.phase = LifecyclePhase::Stopped;
                state.started_at = None;
                info!("Home server stopped");
                None
            }
            Err(message) => {
                let still_running = service.is_running().await;
                let message = self.state.write().await.fail(
                    SupervisorError::StopFailure(message).to_string(),
                    still_running,
                );
                error!(error = %message, still_running, "Home server failed to stop");
                Some(message)
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        match self.service.get() {
            Some(service) => service.is_running().await,
            None => false,
        }
    }

    pub async fn activate_premium_features(&self, username: &str) -> Option<String> {
        let service = self.service.get()?;
        match service.activate_premium_features(username).await {
            Ok(()) => None,
            Err(message) => {
                warn!(error = %message, "Premium activation failed");
                Some(message)
            }
        }
    }

    // ========== Queries ==========

    pub async fn get_last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    pub fn get_logs(&self) -> Vec<String> {
        self.logs.snapshot()
    }

    /// `http://<lan address>:<port>`, when both are known.
    pub async fn get_home_server_url(&self) -> Option<String> {
        let configuration = self.load_configuration().await.into_configuration()?;
        self.url_for(&configuration)
    }

    fn url_for(&self, configuration: &ServerConfiguration) -> Option<String> {
        let address = self.resolver.resolve_local_address()?;
        home_server_url(&address, configuration.port)
    }

    pub async fn status(&self) -> HomeServerStatus {
        let running = self.is_running().await;
        let url = self.get_home_server_url().await;
        let state = self.state.read().await;

        let phase = match state.phase {
            LifecyclePhase::Running if !running => LifecyclePhase::Stopped,
            phase => phase,
        };

        HomeServerStatus {
            running,
            phase,
            last_error: state.last_error.clone(),
            url,
            started_at: if running { state.started_at } else { None },
        }
    }
}

/// Run a service handle call on its own task so a panic in it comes back as
/// an error message instead of unwinding through the manager.
async fn run_isolated<F>(operation: &'static str, call: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>> + Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(format!(
            "Home server {operation} panicked: {}",
            panic_message(e.into_panic())
        )),
        Err(e) => Err(format!("Home server {operation} was cancelled: {e}")),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

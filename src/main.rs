// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use home_server_manager::config::{ManagerSettings, LOG_FORMAT_ENV};
use home_server_manager::logging::{init_tracing, LogFormat};
use home_server_manager::network::SystemAddressResolver;
use home_server_manager::notifier::ChannelNotifier;
use home_server_manager::service::{ChildProcessFactory, ProcessSettings, ServiceAvailability};
use home_server_manager::storage::LocalFiles;
use home_server_manager::HomeServerManager;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing(LogFormat::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref()));

    let settings = ManagerSettings::from_env();
    let Some(data_dir) = settings.data_dir.clone() else {
        error!("HOME_SERVER_DATA_DIR is not set");
        return ExitCode::FAILURE;
    };

    let process = ProcessSettings::new(settings.server_bin.clone())
        .with_ready_timeout(settings.ready_timeout);
    let availability = ServiceAvailability::detect(ChildProcessFactory::new(process));
    if !availability.is_available() {
        warn!("Home server is not supported on this platform");
        return ExitCode::FAILURE;
    }

    let (notifier, mut notifications) = ChannelNotifier::channel();
    let manager = HomeServerManager::new(
        availability,
        Arc::new(LocalFiles),
        Arc::new(SystemAddressResolver),
        Arc::new(notifier),
    );
    manager.set_data_location(data_dir).await;

    tokio::spawn(async move {
        while let Some(message) = notifications.recv().await {
            match serde_json::to_string(&message) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(error = %e, "Could not encode notification"),
            }
        }
    });

    if let Some(message) = manager.start().await {
        error!(error = %message, "Home server did not start");
        for line in manager.get_logs() {
            eprintln!("{line}");
        }
        return ExitCode::FAILURE;
    }

    match manager.get_home_server_url().await {
        Some(url) => info!(url = %url, "Home server reachable"),
        None => info!("Home server running; no LAN address found"),
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Could not listen for shutdown signal");
    }

    info!("Shutting down home server");
    match manager.stop().await {
        Some(message) => {
            error!(error = %message, "Home server did not stop cleanly");
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}

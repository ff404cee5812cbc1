// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Home Server Manager - Embedded Backend Lifecycle Supervisor
//!
//! Runs a self-hosted notes backend next to the desktop application: keeps
//! its configuration (secrets included) under the data directory, launches
//! and stops it, buffers its output and tells the UI where it can be reached.
//!
//! ## Modules
//!
//! - `manager` - Lifecycle supervisor (start, stop, configuration, status)
//! - `service` - Service handle contract and the child process implementation
//! - `storage` - `config.json` persistence
//! - `environment` - Environment descriptor passed to the backend
//! - `secrets` - Random hex secrets
//! - `network` - LAN address discovery and URL construction
//! - `notifier` - Messages pushed to the web application

pub mod config;
pub mod environment;
pub mod error;
pub mod log_buffer;
pub mod logging;
pub mod manager;
pub mod models;
pub mod network;
pub mod notifier;
pub mod secrets;
pub mod service;
pub mod state;
pub mod storage;

pub use manager::HomeServerManager;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Home Server Data Models
//!
//! [`ServerConfiguration`] is the authoritative runtime configuration of the
//! home server. It is persisted inside a [`ConfigurationEnvelope`], which adds
//! a format version and a human-readable info block.
//!
//! ## Secrets
//!
//! The five secret fields are generated exactly once per data location. Data
//! the home server encrypts under them becomes unrecoverable if they change,
//! so nothing in this crate rewrites them after the first save.

use serde::{Deserialize, Serialize};

use crate::config::{CONFIGURATION_FORMAT_VERSION, DEFAULT_LOG_LEVEL, DEFAULT_PORT};
use crate::secrets::{SecretError, SecretGenerator};

// =============================================================================
// Server Configuration
// =============================================================================

/// Database engine used by the home server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    #[default]
    Sqlite,
    Mysql,
}

impl DatabaseEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::Sqlite => "sqlite",
            DatabaseEngine::Mysql => "mysql",
        }
    }
}

impl std::fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for an external MySQL database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MysqlConfiguration {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub database: String,
}

/// Runtime configuration handed to the home server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfiguration {
    pub jwt_secret: String,
    pub auth_jwt_secret: String,
    pub encryption_server_key: String,
    pub pseudo_key_params_key: String,
    pub valet_token_secret: String,
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub database_engine: DatabaseEngine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql_configuration: Option<MysqlConfiguration>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl ServerConfiguration {
    /// Build a fresh configuration with newly generated secrets.
    ///
    /// Uses port 3127, SQLite and log level `info`.
    pub fn generate(secrets: &SecretGenerator) -> Result<Self, SecretError> {
        Ok(Self {
            jwt_secret: secrets.generate_key()?,
            auth_jwt_secret: secrets.generate_key()?,
            encryption_server_key: secrets.generate_key()?,
            pseudo_key_params_key: secrets.generate_key()?,
            valet_token_secret: secrets.generate_key()?,
            port: DEFAULT_PORT,
            log_level: default_log_level(),
            database_engine: DatabaseEngine::Sqlite,
            mysql_configuration: None,
        })
    }

    /// The five secrets, in environment order.
    pub fn secrets(&self) -> [&str; 5] {
        [
            &self.jwt_secret,
            &self.auth_jwt_secret,
            &self.encryption_server_key,
            &self.pseudo_key_params_key,
            &self.valet_token_secret,
        ]
    }
}

// =============================================================================
// Configuration Envelope
// =============================================================================

/// Informational block written next to the configuration. Never read back
/// into behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvelopeInfo {
    pub warning: String,
    pub information: String,
    pub instructions: String,
}

impl Default for EnvelopeInfo {
    fn default() -> Self {
        Self {
            warning: "Do not edit this file.".to_string(),
            information: "The values below are encrypted with a key created by the desktop application after installation. The key is stored in your secure device keychain.".to_string(),
            instructions: "Put this file inside your home server data location to restore your home server configuration.".to_string(),
        }
    }
}

/// On-disk wrapper around [`ServerConfiguration`] (`config.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigurationEnvelope {
    pub version: String,
    pub info: EnvelopeInfo,
    pub configuration: ServerConfiguration,
}

impl ConfigurationEnvelope {
    /// Wrap a configuration with the current format version and info block.
    pub fn wrap(configuration: ServerConfiguration) -> Self {
        Self {
            version: CONFIGURATION_FORMAT_VERSION.to_string(),
            info: EnvelopeInfo::default(),
            configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ServerConfiguration {
        ServerConfiguration {
            jwt_secret: "a".repeat(64),
            auth_jwt_secret: "b".repeat(64),
            encryption_server_key: "c".repeat(64),
            pseudo_key_params_key: "d".repeat(64),
            valet_token_secret: "e".repeat(64),
            port: 3127,
            log_level: "info".into(),
            database_engine: DatabaseEngine::Sqlite,
            mysql_configuration: None,
        }
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["jwtSecret"], "a".repeat(64));
        assert_eq!(value["pseudoKeyParamsKey"], "d".repeat(64));
        assert_eq!(value["databaseEngine"], "sqlite");
        assert_eq!(value["logLevel"], "info");
        assert!(value.get("mysqlConfiguration").is_none());
    }

    #[test]
    fn missing_log_level_defaults_to_info() {
        let json = r#"{
            "jwtSecret": "1", "authJwtSecret": "2", "encryptionServerKey": "3",
            "pseudoKeyParamsKey": "4", "valetTokenSecret": "5",
            "port": 4000, "databaseEngine": "mysql",
            "mysqlConfiguration": {
                "host": "db", "username": "u", "password": "p", "database": "sn"
            }
        }"#;
        let config: ServerConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database_engine, DatabaseEngine::Mysql);
        let mysql = config.mysql_configuration.unwrap();
        assert_eq!(mysql.port, None);
        assert_eq!(mysql.host, "db");
    }

    #[test]
    fn unknown_engine_is_rejected() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["databaseEngine"] = "postgres".into();
        assert!(serde_json::from_value::<ServerConfiguration>(value).is_err());
    }

    #[test]
    fn envelope_uses_current_version_and_info() {
        let envelope = ConfigurationEnvelope::wrap(sample());
        assert_eq!(envelope.version, "1.0.0");
        assert_eq!(envelope.info.warning, "Do not edit this file.");

        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value["info"]["information"].is_string());
        assert!(value["info"]["instructions"].is_string());
        assert_eq!(value["configuration"]["port"], 3127);
    }

    #[test]
    fn generate_uses_defaults_and_distinct_secrets() {
        let config = ServerConfiguration::generate(&SecretGenerator::new()).unwrap();
        assert_eq!(config.port, 3127);
        assert_eq!(config.database_engine, DatabaseEngine::Sqlite);
        assert_eq!(config.log_level, "info");
        assert!(config.mysql_configuration.is_none());

        let secrets = config.secrets();
        for secret in secrets {
            assert_eq!(secret.len(), 64);
            assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        }
        for i in 0..secrets.len() {
            for j in (i + 1)..secrets.len() {
                assert_ne!(secrets[i], secrets[j]);
            }
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Environment variables handed to the home server process.
//!
//! | Variable | Source |
//! |----------|--------|
//! | `JWT_SECRET` .. `VALET_TOKEN_SECRET` | generated secrets |
//! | `FILES_SERVER_URL` | resolved LAN URL (empty when offline) |
//! | `LOG_LEVEL` | configuration, `info` when blank |
//! | `VERSION` | always `desktop` |
//! | `PORT`, `DB_TYPE` | configuration |
//! | `DB_HOST`, `DB_PORT`, `DB_USERNAME`, `DB_PASSWORD`, `DB_DATABASE` | MySQL only |

use std::collections::BTreeMap;

use crate::config::{DEFAULT_LOG_LEVEL, SERVER_VERSION_TAG};
use crate::models::{DatabaseEngine, ServerConfiguration};

/// Variable names whose values must never reach a log line.
pub const SENSITIVE_KEYS: &[&str] = &[
    "JWT_SECRET",
    "AUTH_JWT_SECRET",
    "ENCRYPTION_SERVER_KEY",
    "PSEUDO_KEY_PARAMS_KEY",
    "VALET_TOKEN_SECRET",
    "DB_PASSWORD",
];

pub type Environment = BTreeMap<String, String>;

/// Build the environment descriptor for `configuration`.
pub fn build_environment(
    configuration: &ServerConfiguration,
    files_server_url: Option<&str>,
) -> Environment {
    let mut env = Environment::new();
    let mut set = |key: &str, value: &str| {
        env.insert(key.to_string(), value.to_string());
    };

    set("JWT_SECRET", &configuration.jwt_secret);
    set("AUTH_JWT_SECRET", &configuration.auth_jwt_secret);
    set("ENCRYPTION_SERVER_KEY", &configuration.encryption_server_key);
    set("PSEUDO_KEY_PARAMS_KEY", &configuration.pseudo_key_params_key);
    set("VALET_TOKEN_SECRET", &configuration.valet_token_secret);
    set("FILES_SERVER_URL", files_server_url.unwrap_or_default());

    let log_level = configuration.log_level.trim();
    set(
        "LOG_LEVEL",
        if log_level.is_empty() {
            DEFAULT_LOG_LEVEL
        } else {
            log_level
        },
    );
    set("VERSION", SERVER_VERSION_TAG);
    set("PORT", &configuration.port.to_string());
    set("DB_TYPE", configuration.database_engine.as_str());

    if configuration.database_engine == DatabaseEngine::Mysql {
        if let Some(mysql) = &configuration.mysql_configuration {
            set("DB_HOST", &mysql.host);
            if let Some(port) = mysql.port {
                set("DB_PORT", &port.to_string());
            }
            set("DB_USERNAME", &mysql.username);
            set("DB_PASSWORD", &mysql.password);
            set("DB_DATABASE", &mysql.database);
        }
    }

    env
}

/// Variable names present in `env`, for logging without values.
pub fn describe_keys(env: &Environment) -> Vec<&str> {
    env.keys().map(String::as_str).collect()
}

/// Copy of `env` with secret values masked.
pub fn redacted(env: &Environment) -> Environment {
    env.iter()
        .map(|(key, value)| {
            let shown = if SENSITIVE_KEYS.contains(&key.as_str()) {
                "***".to_string()
            } else {
                value.clone()
            };
            (key.clone(), shown)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MysqlConfiguration;

    const DB_KEYS: [&str; 5] = ["DB_HOST", "DB_PORT", "DB_USERNAME", "DB_PASSWORD", "DB_DATABASE"];

    fn sqlite() -> ServerConfiguration {
        ServerConfiguration {
            jwt_secret: "jwt".into(),
            auth_jwt_secret: "auth".into(),
            encryption_server_key: "enc".into(),
            pseudo_key_params_key: "pseudo".into(),
            valet_token_secret: "valet".into(),
            port: 3127,
            log_level: "info".into(),
            database_engine: DatabaseEngine::Sqlite,
            mysql_configuration: None,
        }
    }

    fn mysql(port: Option<u16>) -> ServerConfiguration {
        ServerConfiguration {
            database_engine: DatabaseEngine::Mysql,
            mysql_configuration: Some(MysqlConfiguration {
                host: "db.lan".into(),
                port,
                username: "sn".into(),
                password: "hunter2".into(),
                database: "standardnotes".into(),
            }),
            ..sqlite()
        }
    }

    #[test]
    fn sqlite_environment_has_base_keys_only() {
        let env = build_environment(&sqlite(), Some("http://192.168.1.2:3127"));

        assert_eq!(env["JWT_SECRET"], "jwt");
        assert_eq!(env["AUTH_JWT_SECRET"], "auth");
        assert_eq!(env["ENCRYPTION_SERVER_KEY"], "enc");
        assert_eq!(env["PSEUDO_KEY_PARAMS_KEY"], "pseudo");
        assert_eq!(env["VALET_TOKEN_SECRET"], "valet");
        assert_eq!(env["FILES_SERVER_URL"], "http://192.168.1.2:3127");
        assert_eq!(env["LOG_LEVEL"], "info");
        assert_eq!(env["VERSION"], "desktop");
        assert_eq!(env["PORT"], "3127");
        assert_eq!(env["DB_TYPE"], "sqlite");
        for key in DB_KEYS {
            assert!(!env.contains_key(key), "{key} should be absent");
        }
        assert_eq!(env.len(), 10);
    }

    #[test]
    fn mysql_environment_includes_database_settings() {
        let env = build_environment(&mysql(Some(3306)), None);
        assert_eq!(env["DB_TYPE"], "mysql");
        assert_eq!(env["DB_HOST"], "db.lan");
        assert_eq!(env["DB_PORT"], "3306");
        assert_eq!(env["DB_USERNAME"], "sn");
        assert_eq!(env["DB_PASSWORD"], "hunter2");
        assert_eq!(env["DB_DATABASE"], "standardnotes");
    }

    #[test]
    fn mysql_port_is_only_set_when_configured() {
        let env = build_environment(&mysql(None), None);
        assert!(env.contains_key("DB_HOST"));
        assert!(!env.contains_key("DB_PORT"));
    }

    #[test]
    fn unresolved_url_is_empty_and_blank_log_level_defaults() {
        let mut configuration = sqlite();
        configuration.log_level = "  ".into();
        let env = build_environment(&configuration, None);
        assert_eq!(env["FILES_SERVER_URL"], "");
        assert_eq!(env["LOG_LEVEL"], "info");
    }

    #[test]
    fn redaction_masks_secrets_only() {
        let env = build_environment(&mysql(Some(3306)), None);
        let masked = redacted(&env);
        assert_eq!(masked["JWT_SECRET"], "***");
        assert_eq!(masked["DB_PASSWORD"], "***");
        assert_eq!(masked["DB_HOST"], "db.lan");
        assert_eq!(describe_keys(&env).len(), env.len());
    }
}

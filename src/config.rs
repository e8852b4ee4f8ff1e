// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Secrets have no
//! defaults; the server refuses to start without them.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ACCESS_TOKEN_SECRET` | HS256 secret for access tokens | Required |
//! | `REFRESH_TOKEN_SECRET` | HS256 secret for refresh tokens (must differ) | Required |
//! | `ACCESS_TOKEN_TTL_SECS` | Access token lifetime | `900` |
//! | `REFRESH_TOKEN_TTL_SECS` | Refresh token lifetime | `604800` |
//! | `REGISTRY_PATH` | redb file for a durable refresh registry | unset (in-memory) |
//! | `REGISTRY_SWEEP_INTERVAL_SECS` | Expired-entry sweep period | `60` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `4000` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | unset (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{path::PathBuf, time::Duration};

use crate::auth::LifecyclePolicy;

pub const ACCESS_TOKEN_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_TOKEN_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";
pub const ACCESS_TOKEN_TTL_ENV: &str = "ACCESS_TOKEN_TTL_SECS";
pub const REFRESH_TOKEN_TTL_ENV: &str = "REFRESH_TOKEN_TTL_SECS";
pub const REGISTRY_PATH_ENV: &str = "REGISTRY_PATH";
pub const REGISTRY_SWEEP_INTERVAL_ENV: &str = "REGISTRY_SWEEP_INTERVAL_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ")]
    SharedSecret,

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone)]
pub struct Config {
    pub access_secret: String,
    pub refresh_secret: String,
    pub policy: LifecyclePolicy,
    pub registry_path: Option<PathBuf>,
    pub sweep_interval: Duration,
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("policy", &self.policy)
            .field("registry_path", &self.registry_path)
            .field("sweep_interval", &self.sweep_interval)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let access_secret = get(ACCESS_TOKEN_SECRET_ENV).ok_or(ConfigError::Missing(ACCESS_TOKEN_SECRET_ENV))?;
        let refresh_secret = get(REFRESH_TOKEN_SECRET_ENV).ok_or(ConfigError::Missing(REFRESH_TOKEN_SECRET_ENV))?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let access_ttl = seconds(get(ACCESS_TOKEN_TTL_ENV), ACCESS_TOKEN_TTL_ENV, DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl = seconds(get(REFRESH_TOKEN_TTL_ENV), REFRESH_TOKEN_TTL_ENV, DEFAULT_REFRESH_TTL_SECS)?;
        let sweep_interval = seconds(
            get(REGISTRY_SWEEP_INTERVAL_ENV),
            REGISTRY_SWEEP_INTERVAL_ENV,
            DEFAULT_SWEEP_INTERVAL_SECS,
        )?;

        let port = match get(PORT_ENV) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            access_secret,
            refresh_secret,
            policy: LifecyclePolicy {
                access_ttl,
                refresh_ttl,
            },
            registry_path: get(REGISTRY_PATH_ENV).map(PathBuf::from),
            sweep_interval,
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            tls,
            log_format,
        })
    }
}

fn seconds(value: Option<String>, var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs = match value {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid { var, value })?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::Zero(var));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    const SECRETS: [(&str, &str); 2] = [
        (ACCESS_TOKEN_SECRET_ENV, "access"),
        (REFRESH_TOKEN_SECRET_ENV, "refresh"),
    ];

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let config = load(&SECRETS).unwrap();
        assert_eq!(config.policy.access_ttl, Duration::from_secs(900));
        assert_eq!(config.policy.refresh_ttl, Duration::from_secs(604_800));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.registry_path.is_none());
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn secrets_are_required() {
        assert_eq!(
            load(&[(REFRESH_TOKEN_SECRET_ENV, "refresh")]).unwrap_err(),
            ConfigError::Missing(ACCESS_TOKEN_SECRET_ENV)
        );
        assert_eq!(
            load(&[(ACCESS_TOKEN_SECRET_ENV, "access"), (REFRESH_TOKEN_SECRET_ENV, "  ")]).unwrap_err(),
            ConfigError::Missing(REFRESH_TOKEN_SECRET_ENV)
        );
    }

    #[test]
    fn secrets_must_differ() {
        assert_eq!(
            load(&[(ACCESS_TOKEN_SECRET_ENV, "same"), (REFRESH_TOKEN_SECRET_ENV, "same")]).unwrap_err(),
            ConfigError::SharedSecret
        );
    }

    #[test]
    fn ttls_are_parsed_and_validated() {
        let mut vars = SECRETS.to_vec();
        vars.push((ACCESS_TOKEN_TTL_ENV, "15"));
        vars.push((REFRESH_TOKEN_TTL_ENV, "86400"));
        let config = load(&vars).unwrap();
        assert_eq!(config.policy.access_ttl, Duration::from_secs(15));
        assert_eq!(config.policy.refresh_ttl, Duration::from_secs(86_400));

        let mut zero = SECRETS.to_vec();
        zero.push((ACCESS_TOKEN_TTL_ENV, "0"));
        assert_eq!(load(&zero).unwrap_err(), ConfigError::Zero(ACCESS_TOKEN_TTL_ENV));

        let mut junk = SECRETS.to_vec();
        junk.push((REFRESH_TOKEN_TTL_ENV, "a week"));
        assert!(matches!(
            load(&junk).unwrap_err(),
            ConfigError::Invalid { var: REFRESH_TOKEN_TTL_ENV, .. }
        ));
    }

    #[test]
    fn tls_paths_come_in_pairs() {
        let mut vars = SECRETS.to_vec();
        vars.push((TLS_CERT_PATH_ENV, "/certs/cert.pem"));
        assert_eq!(load(&vars).unwrap_err(), ConfigError::PartialTls);

        vars.push((TLS_KEY_PATH_ENV, "/certs/key.pem"));
        let config = load(&vars).unwrap();
        assert_eq!(
            config.tls,
            Some(TlsPaths {
                cert: PathBuf::from("/certs/cert.pem"),
                key: PathBuf::from("/certs/key.pem"),
            })
        );
    }

    #[test]
    fn log_format_is_validated() {
        let mut vars = SECRETS.to_vec();
        vars.push((LOG_FORMAT_ENV, "json"));
        assert_eq!(load(&vars).unwrap().log_format, LogFormat::Json);

        let mut bad = SECRETS.to_vec();
        bad.push((LOG_FORMAT_ENV, "xml"));
        assert!(load(&bad).is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&SECRETS).unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("\"access\""));
    }
}
